//! Connection configuration handed to the transport collaborator.
//!
//! - [`session`]: host, port, credentials and the resolved [`Session`]
//! - [`tls`]: SSL-on-connect and STARTTLS flags
//! - [`timeouts`]: socket timeouts in milliseconds

pub mod session;
pub mod timeouts;
pub mod tls;

pub use session::{Credentials, Session, SessionConfig, keys};
pub use timeouts::SocketTimeouts;
pub use tls::TlsConfig;
