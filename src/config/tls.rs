//! TLS flags for the mail session.
//!
//! Nothing here negotiates TLS. The flags describe how the transport should
//! connect and end up as `mail.smtp.*` session properties.

use serde::{Deserialize, Serialize};

/// How the transport should secure its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TlsConfig {
    /// Connect with implicit TLS on the SSL port.
    ///
    /// Default: `false`
    #[serde(default)]
    pub ssl_on_connect: bool,

    /// Upgrade a plaintext connection with STARTTLS when offered.
    ///
    /// Default: `false`
    #[serde(default)]
    pub start_tls_enabled: bool,

    /// Refuse to send unless STARTTLS succeeds.
    ///
    /// Default: `false`
    #[serde(default)]
    pub start_tls_required: bool,

    /// Verify the server certificate matches the host name.
    ///
    /// Only meaningful when SSL-on-connect or STARTTLS is enabled.
    ///
    /// Default: `false`
    #[serde(default)]
    pub check_server_identity: bool,
}

impl TlsConfig {
    /// Plaintext, no STARTTLS.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ssl_on_connect: false,
            start_tls_enabled: false,
            start_tls_required: false,
            check_server_identity: false,
        }
    }

    /// Implicit TLS with server identity checks.
    #[must_use]
    pub const fn ssl_on_connect() -> Self {
        Self {
            ssl_on_connect: true,
            start_tls_enabled: false,
            start_tls_required: false,
            check_server_identity: true,
        }
    }

    /// Mandatory STARTTLS with server identity checks.
    #[must_use]
    pub const fn start_tls_required() -> Self {
        Self {
            ssl_on_connect: false,
            start_tls_enabled: true,
            start_tls_required: true,
            check_server_identity: true,
        }
    }

    /// Returns `true` if any form of TLS may be used.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.ssl_on_connect || self.start_tls_enabled
    }

    /// Returns `true` if server identity should be verified.
    #[must_use]
    pub const fn checks_server_identity(&self) -> bool {
        self.is_encrypted() && self.check_server_identity
    }
}
