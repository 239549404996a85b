//! The boundary to whatever actually delivers mail.
//!
//! This crate performs no network I/O. A [`Transport`] receives a resolved
//! [`Session`] and a finished [`MimeMessage`] and owns connection handling,
//! protocol negotiation and retries.

use crate::{config::Session, message::MimeMessage};

pub trait Transport {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Delivers `message` using `session`, returning the message id.
    ///
    /// # Errors
    ///
    /// Whatever the implementation considers a delivery failure.
    fn send(&self, session: &Session, message: &MimeMessage) -> Result<String, Self::Error>;
}
