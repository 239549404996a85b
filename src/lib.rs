//! Email composition: collect addresses, headers and content in a
//! [`MessageBuilder`], freeze them into a [`MimeMessage`] and hand that to a
//! [`Transport`] together with a resolved mail [`Session`].

pub mod logging;

pub mod address;
pub mod address_parser;
pub mod builder;
pub mod config;
pub mod content;
pub mod draft;
pub mod encoding;
pub mod error;
pub mod message;
pub mod transport;

pub use address::{Address, AddressList, IntoAddresses};
pub use builder::{MessageBuilder, RecipientKind};
pub use config::{Credentials, Session, SessionConfig, SocketTimeouts, TlsConfig};
pub use content::{Attachment, Content, ContentType, Multipart, MultipartKind, Part, TextPart};
pub use draft::Draft;
pub use error::{EmailError, Result};
pub use message::{Envelope, MimeMessage};
pub use transport::Transport;
pub use tracing;
