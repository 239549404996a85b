//! Mail session configuration.
//!
//! A [`SessionConfig`] is what callers supply (in code, from TOML, or from a
//! `mail.smtp.*` property map). A [`Session`] is the resolved view handed to
//! the transport alongside a built message.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use super::{timeouts::SocketTimeouts, tls::TlsConfig};
use crate::error::{EmailError, Result};

/// Property names understood by [`SessionConfig::from_properties`] and
/// produced by [`Session::properties`].
pub mod keys {
    pub const MAIL_HOST: &str = "mail.smtp.host";
    pub const MAIL_PORT: &str = "mail.smtp.port";
    pub const MAIL_SMTP_FROM: &str = "mail.smtp.from";
    pub const MAIL_SMTP_AUTH: &str = "mail.smtp.auth";
    pub const MAIL_SMTP_USER: &str = "mail.smtp.user";
    pub const MAIL_DEBUG: &str = "mail.debug";
    pub const MAIL_TRANSPORT_PROTOCOL: &str = "mail.transport.protocol";
    pub const MAIL_TRANSPORT_STARTTLS_ENABLE: &str = "mail.smtp.starttls.enable";
    pub const MAIL_TRANSPORT_STARTTLS_REQUIRED: &str = "mail.smtp.starttls.required";
    pub const MAIL_SMTP_SSL_ENABLE: &str = "mail.smtp.ssl.enable";
    pub const MAIL_SMTP_SSL_CHECKSERVERIDENTITY: &str = "mail.smtp.ssl.checkserveridentity";
    pub const MAIL_SMTP_SOCKET_FACTORY_PORT: &str = "mail.smtp.socketFactory.port";
    pub const MAIL_SMTP_SOCKET_FACTORY_CLASS: &str = "mail.smtp.socketFactory.class";
    pub const MAIL_SMTP_SOCKET_FACTORY_FALLBACK: &str = "mail.smtp.socketFactory.fallback";
    pub const MAIL_SMTP_SEND_PARTIAL: &str = "mail.smtp.sendpartial";
    pub const MAIL_SMTP_CONNECTIONTIMEOUT: &str = "mail.smtp.connectiontimeout";
    pub const MAIL_SMTP_TIMEOUT: &str = "mail.smtp.timeout";

    pub const SSL_SOCKET_FACTORY: &str = "javax.net.ssl.SSLSocketFactory";
}

/// SMTP login credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection settings for a mail session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// SMTP server host name.
    #[serde(default)]
    pub host: Option<String>,

    /// Plaintext / STARTTLS port.
    ///
    /// Default: 25
    #[serde(default = "defaults::smtp_port")]
    pub port: u16,

    /// Implicit TLS port, used when `tls.ssl_on_connect` is set.
    ///
    /// Default: 465
    #[serde(default = "defaults::ssl_smtp_port")]
    pub ssl_port: u16,

    #[serde(default)]
    pub tls: TlsConfig,

    #[serde(default)]
    pub credentials: Option<Credentials>,

    #[serde(default)]
    pub timeouts: SocketTimeouts,

    /// Envelope sender that bounces are returned to.
    #[serde(default)]
    pub bounce_address: Option<String>,

    /// Send to the valid recipients even if some are rejected.
    #[serde(default)]
    pub send_partial: bool,

    #[serde(default)]
    pub debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: defaults::smtp_port(),
            ssl_port: defaults::ssl_smtp_port(),
            tls: TlsConfig::default(),
            credentials: None,
            timeouts: SocketTimeouts::default(),
            bounce_address: None,
            send_partial: false,
            debug: false,
        }
    }
}

impl SessionConfig {
    /// A configuration pointing at `host` with every other field defaulted.
    #[must_use]
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..Self::default()
        }
    }

    /// The configured host, ignoring blank values.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref().filter(|host| !host.trim().is_empty())
    }

    /// Reads a `mail.smtp.*` property map.
    ///
    /// Unknown keys are ignored. Credentials are never read from
    /// properties; only `mail.smtp.user` is consulted when a password is
    /// supplied separately.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::Configuration`] if a port or timeout is not a
    /// number.
    pub fn from_properties<K, V>(properties: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let properties: BTreeMap<String, String> = properties
            .into_iter()
            .map(|(key, value)| (key.as_ref().to_string(), value.as_ref().trim().to_string()))
            .collect();

        let flag = |key: &str| {
            properties
                .get(key)
                .is_some_and(|value| value.eq_ignore_ascii_case("true"))
        };

        let mut config = Self {
            host: properties.get(keys::MAIL_HOST).cloned(),
            bounce_address: properties.get(keys::MAIL_SMTP_FROM).cloned(),
            send_partial: flag(keys::MAIL_SMTP_SEND_PARTIAL),
            debug: flag(keys::MAIL_DEBUG),
            tls: TlsConfig {
                ssl_on_connect: flag(keys::MAIL_SMTP_SSL_ENABLE)
                    || properties.contains_key(keys::MAIL_SMTP_SOCKET_FACTORY_CLASS),
                start_tls_enabled: flag(keys::MAIL_TRANSPORT_STARTTLS_ENABLE),
                start_tls_required: flag(keys::MAIL_TRANSPORT_STARTTLS_REQUIRED),
                check_server_identity: flag(keys::MAIL_SMTP_SSL_CHECKSERVERIDENTITY),
            },
            ..Self::default()
        };

        if let Some(port) = parse_number::<u16>(&properties, keys::MAIL_PORT)? {
            if config.tls.ssl_on_connect {
                config.ssl_port = port;
            } else {
                config.port = port;
            }
        }

        if let Some(port) = parse_number::<u16>(&properties, keys::MAIL_SMTP_SOCKET_FACTORY_PORT)? {
            config.ssl_port = port;
        }

        if let Some(ms) = parse_number::<u64>(&properties, keys::MAIL_SMTP_CONNECTIONTIMEOUT)? {
            config.timeouts.connection_ms = ms;
        }

        if let Some(ms) = parse_number::<u64>(&properties, keys::MAIL_SMTP_TIMEOUT)? {
            config.timeouts.read_ms = ms;
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(
    properties: &BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>> {
    properties
        .get(key)
        .map(|value| {
            value.parse().map_err(|_| {
                EmailError::Configuration(format!("{key} must be a number, got {value:?}"))
            })
        })
        .transpose()
}

/// A resolved mail session, ready to be handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    config: SessionConfig,
}

impl Session {
    #[must_use]
    pub const fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.config.host()
    }

    /// The port the transport should connect to.
    #[must_use]
    pub const fn port(&self) -> u16 {
        if self.config.tls.ssl_on_connect {
            self.config.ssl_port
        } else {
            self.config.port
        }
    }

    #[must_use]
    pub const fn tls(&self) -> &TlsConfig {
        &self.config.tls
    }

    #[must_use]
    pub const fn credentials(&self) -> Option<&Credentials> {
        self.config.credentials.as_ref()
    }

    #[must_use]
    pub const fn timeouts(&self) -> &SocketTimeouts {
        &self.config.timeouts
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The session as `mail.smtp.*` properties.
    ///
    /// Passwords are never included.
    #[must_use]
    pub fn properties(&self) -> BTreeMap<String, String> {
        let config = &self.config;
        let mut properties = BTreeMap::new();
        let mut set = |key: &str, value: String| {
            properties.insert(key.to_string(), value);
        };

        set(keys::MAIL_TRANSPORT_PROTOCOL, "smtp".to_string());
        set(keys::MAIL_PORT, self.port().to_string());
        if let Some(host) = config.host() {
            set(keys::MAIL_HOST, host.to_string());
        }
        set(keys::MAIL_DEBUG, config.debug.to_string());

        set(
            keys::MAIL_TRANSPORT_STARTTLS_ENABLE,
            config.tls.start_tls_enabled.to_string(),
        );
        set(
            keys::MAIL_TRANSPORT_STARTTLS_REQUIRED,
            config.tls.start_tls_required.to_string(),
        );
        set(keys::MAIL_SMTP_SEND_PARTIAL, config.send_partial.to_string());

        if let Some(credentials) = &config.credentials {
            set(keys::MAIL_SMTP_AUTH, "true".to_string());
            set(keys::MAIL_SMTP_USER, credentials.username.clone());
        }

        if config.tls.ssl_on_connect {
            set(keys::MAIL_SMTP_SOCKET_FACTORY_PORT, config.ssl_port.to_string());
            set(
                keys::MAIL_SMTP_SOCKET_FACTORY_CLASS,
                keys::SSL_SOCKET_FACTORY.to_string(),
            );
            set(keys::MAIL_SMTP_SOCKET_FACTORY_FALLBACK, "false".to_string());
        }

        if config.tls.checks_server_identity() {
            set(keys::MAIL_SMTP_SSL_CHECKSERVERIDENTITY, "true".to_string());
        }

        if let Some(bounce) = &config.bounce_address {
            set(keys::MAIL_SMTP_FROM, bounce.clone());
        }

        if config.timeouts.read_ms > 0 {
            set(keys::MAIL_SMTP_TIMEOUT, config.timeouts.read_ms.to_string());
        }

        if config.timeouts.connection_ms > 0 {
            set(
                keys::MAIL_SMTP_CONNECTIONTIMEOUT,
                config.timeouts.connection_ms.to_string(),
            );
        }

        properties
    }
}

impl From<SessionConfig> for Session {
    fn from(config: SessionConfig) -> Self {
        Self::new(config)
    }
}

mod defaults {
    pub const fn smtp_port() -> u16 {
        25
    }
    pub const fn ssl_smtp_port() -> u16 {
        465
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.host(), None);
        assert_eq!(config.port, 25);
        assert_eq!(config.ssl_port, 465);
        assert_eq!(config.timeouts, SocketTimeouts::default());
    }

    #[test]
    fn test_blank_host_is_absent() {
        assert_eq!(SessionConfig::with_host("  ").host(), None);
        assert_eq!(SessionConfig::with_host("localhost").host(), Some("localhost"));
    }

    #[test]
    fn test_from_properties() {
        let config = SessionConfig::from_properties([
            (keys::MAIL_HOST, "localhost"),
            (keys::MAIL_PORT, "2525"),
            (keys::MAIL_TRANSPORT_STARTTLS_ENABLE, "TRUE"),
            (keys::MAIL_SMTP_TIMEOUT, "1000"),
            ("unrelated.key", "ignored"),
        ])
        .unwrap();

        assert_eq!(config.host(), Some("localhost"));
        assert_eq!(config.port, 2525);
        assert!(config.tls.start_tls_enabled);
        assert!(!config.tls.ssl_on_connect);
        assert_eq!(config.timeouts.read_ms, 1000);
        assert_eq!(config.timeouts.connection_ms, 60_000);
    }

    #[test]
    fn test_from_properties_ssl_port() {
        let config = SessionConfig::from_properties([
            (keys::MAIL_HOST, "smtp.example.com"),
            (keys::MAIL_SMTP_SOCKET_FACTORY_CLASS, keys::SSL_SOCKET_FACTORY),
            (keys::MAIL_PORT, "4650"),
        ])
        .unwrap();

        assert!(config.tls.ssl_on_connect);
        assert_eq!(config.ssl_port, 4650);
        assert_eq!(config.port, 25);
        assert_eq!(Session::new(config).port(), 4650);
    }

    #[test]
    fn test_from_properties_rejects_bad_numbers() {
        let err = SessionConfig::from_properties([(keys::MAIL_PORT, "twenty-five")]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_properties_plain() {
        let session = Session::new(SessionConfig::with_host("localhost"));
        let properties = session.properties();

        assert_eq!(properties[keys::MAIL_HOST], "localhost");
        assert_eq!(properties[keys::MAIL_PORT], "25");
        assert_eq!(properties[keys::MAIL_TRANSPORT_PROTOCOL], "smtp");
        assert_eq!(properties[keys::MAIL_SMTP_CONNECTIONTIMEOUT], "60000");
        assert!(!properties.contains_key(keys::MAIL_SMTP_AUTH));
        assert!(!properties.contains_key(keys::MAIL_SMTP_SOCKET_FACTORY_CLASS));
    }

    #[test]
    fn test_properties_ssl_and_auth() {
        let session = Session::new(SessionConfig {
            host: Some("hostname".to_string()),
            tls: TlsConfig::ssl_on_connect(),
            credentials: Some(Credentials::new("username", "password")),
            bounce_address: Some("bounce@example.com".to_string()),
            timeouts: SocketTimeouts {
                connection_ms: 0,
                read_ms: 0,
            },
            ..SessionConfig::default()
        });
        let properties = session.properties();

        assert_eq!(properties[keys::MAIL_PORT], "465");
        assert_eq!(properties[keys::MAIL_SMTP_AUTH], "true");
        assert_eq!(properties[keys::MAIL_SMTP_USER], "username");
        assert_eq!(properties[keys::MAIL_SMTP_SOCKET_FACTORY_PORT], "465");
        assert_eq!(properties[keys::MAIL_SMTP_SSL_CHECKSERVERIDENTITY], "true");
        assert_eq!(properties[keys::MAIL_SMTP_FROM], "bounce@example.com");
        assert!(!properties.contains_key(keys::MAIL_SMTP_TIMEOUT));
        assert!(!properties.contains_key(keys::MAIL_SMTP_CONNECTIONTIMEOUT));
        assert!(!properties.values().any(|value| value == "password"));
    }

    #[test]
    fn test_properties_round_trip() {
        let config = SessionConfig {
            host: Some("smtp.example.com".to_string()),
            port: 587,
            tls: TlsConfig::start_tls_required(),
            send_partial: true,
            ..SessionConfig::default()
        };

        let restored =
            SessionConfig::from_properties(Session::new(config.clone()).properties()).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let credentials = Credentials::new("user", "hunter2");
        assert!(!format!("{credentials:?}").contains("hunter2"));
    }

    #[test]
    fn test_session_config_from_toml() {
        let config: SessionConfig = toml::from_str(
            r#"
            host = "localhost"
            port = 2525

            [tls]
            start_tls_enabled = true

            [credentials]
            username = "user"
            password = "pass"
            "#,
        )
        .unwrap();

        assert_eq!(config.host(), Some("localhost"));
        assert_eq!(config.port, 2525);
        assert_eq!(config.ssl_port, 465);
        assert!(config.tls.start_tls_enabled);
        assert_eq!(config.credentials.unwrap().username, "user");
    }
}
