//! Socket timeouts forwarded to the transport.
//!
//! The builder never enforces these; they are stored and passed through.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketTimeouts {
    /// Timeout for establishing the connection, in milliseconds.
    ///
    /// Default: 60 000 (one minute). Zero means "transport default".
    #[serde(default = "defaults::connection_ms")]
    pub connection_ms: u64,

    /// Timeout for blocking socket reads, in milliseconds.
    ///
    /// Default: 60 000 (one minute). Zero means "transport default".
    #[serde(default = "defaults::read_ms")]
    pub read_ms: u64,
}

impl Default for SocketTimeouts {
    fn default() -> Self {
        Self {
            connection_ms: defaults::connection_ms(),
            read_ms: defaults::read_ms(),
        }
    }
}

impl SocketTimeouts {
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_ms)
    }

    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_ms)
    }
}

mod defaults {
    pub const fn connection_ms() -> u64 {
        60_000
    }
    pub const fn read_ms() -> u64 {
        60_000
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_timeouts_defaults() {
        let timeouts = SocketTimeouts::default();
        assert_eq!(timeouts.connection_ms, 60_000);
        assert_eq!(timeouts.read_ms, 60_000);
        assert_eq!(timeouts.connection_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_socket_timeouts_partial_toml() {
        let timeouts: SocketTimeouts = toml::from_str("connection_ms = 1000").unwrap();
        assert_eq!(timeouts.connection_ms, 1000);
        assert_eq!(timeouts.read_ms, 60_000);
        assert_eq!(timeouts.read_timeout(), Duration::from_secs(60));
    }
}
