//! Error types for message composition.
//!
//! Every fallible builder operation returns an [`EmailError`]. Failed
//! mutations never leave the builder half-updated, so callers can inspect
//! the error and carry on with the same builder.

use thiserror::Error;

use crate::address_parser::AddressError;

/// Errors raised while composing, building or handing off a message.
#[derive(Debug, Error)]
pub enum EmailError {
    /// An argument was rejected before any state was touched.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The builder is missing what it needs to produce a message.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A mail session was requested but could not be resolved.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An address failed syntactic parsing.
    #[error("Invalid address {input:?}: {source}")]
    AddressFormat {
        input: String,
        #[source]
        source: AddressError,
    },

    /// A TOML draft could not be deserialized.
    #[error("Invalid draft: {0}")]
    Draft(#[from] toml::de::Error),

    /// The transport collaborator failed to deliver the message.
    #[error("Transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl EmailError {
    pub(crate) fn address(input: &str, source: AddressError) -> Self {
        Self::AddressFormat {
            input: input.to_string(),
            source,
        }
    }

    /// Returns `true` if an argument was rejected.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Returns `true` if `build()` was attempted without the minimum fields.
    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    /// Returns `true` if no session could be resolved.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns `true` if an address could not be parsed.
    #[must_use]
    pub const fn is_address_format(&self) -> bool {
        matches!(self, Self::AddressFormat { .. })
    }
}

/// Specialized `Result` type for message composition.
pub type Result<T> = std::result::Result<T, EmailError>;
