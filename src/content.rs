//! Message bodies: single text parts, attachments and multipart trees.

use std::{fmt, str::FromStr};

use crate::error::{EmailError, Result};

/// A parsed `Content-Type` value, keeping only the charset parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    mime_type: String,
    charset: Option<String>,
}

impl ContentType {
    #[must_use]
    pub fn text_plain() -> Self {
        Self {
            mime_type: "text/plain".to_string(),
            charset: None,
        }
    }

    #[must_use]
    pub fn text_html() -> Self {
        Self {
            mime_type: "text/html".to_string(),
            charset: None,
        }
    }

    #[must_use]
    pub fn octet_stream() -> Self {
        Self {
            mime_type: "application/octet-stream".to_string(),
            charset: None,
        }
    }

    /// The lowercase `type/subtype`.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        self.mime_type.starts_with("text/")
    }
}

impl FromStr for ContentType {
    type Err = EmailError;

    fn from_str(input: &str) -> Result<Self> {
        let mut params = input.split(';');

        let mime_type = params
            .next()
            .map(|ty| ty.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match mime_type.split_once('/') {
            Some((ty, subtype)) if !ty.is_empty() && !subtype.is_empty() => {}
            _ => {
                return Err(EmailError::InvalidArgument(format!(
                    "invalid content type {input:?}"
                )));
            }
        }

        let charset = params
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"').to_string())
            .filter(|value| !value.is_empty());

        Ok(Self { mime_type, charset })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mime_type)?;
        if let Some(charset) = &self.charset {
            write!(f, "; charset={charset}")?;
        }
        Ok(())
    }
}

/// A text body and the content type it is sent as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPart {
    pub body: String,
    pub content_type: ContentType,
}

/// A file carried as base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: ContentType,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultipartKind {
    #[default]
    Mixed,
    Alternative,
    Related,
}

impl fmt::Display for MultipartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mixed => "multipart/mixed",
            Self::Alternative => "multipart/alternative",
            Self::Related => "multipart/related",
        })
    }
}

/// One entry of a [`Multipart`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Content(Content),
    Attachment(Attachment),
}

impl From<Content> for Part {
    fn from(content: Content) -> Self {
        Self::Content(content)
    }
}

impl From<Attachment> for Part {
    fn from(attachment: Attachment) -> Self {
        Self::Attachment(attachment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Multipart {
    kind: MultipartKind,
    parts: Vec<Part>,
}

impl Multipart {
    #[must_use]
    pub const fn new(kind: MultipartKind) -> Self {
        Self {
            kind,
            parts: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_part(mut self, part: impl Into<Part>) -> Self {
        self.parts.push(part.into());
        self
    }

    pub fn push(&mut self, part: impl Into<Part>) {
        self.parts.push(part.into());
    }

    #[must_use]
    pub const fn kind(&self) -> MultipartKind {
        self.kind
    }

    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// The body of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(TextPart),
    Multipart(Multipart),
}

impl Content {
    /// A `text/plain` body.
    #[must_use]
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(TextPart {
            body: body.into(),
            content_type: ContentType::text_plain(),
        })
    }

    /// A `text/html` body.
    #[must_use]
    pub fn html(body: impl Into<String>) -> Self {
        Self::Text(TextPart {
            body: body.into(),
            content_type: ContentType::text_html(),
        })
    }

    /// A `multipart/alternative` body offering plain text and HTML.
    #[must_use]
    pub fn alternative(text: impl Into<String>, html: impl Into<String>) -> Self {
        Self::Multipart(
            Multipart::new(MultipartKind::Alternative)
                .with_part(Self::text(text))
                .with_part(Self::html(html)),
        )
    }

    /// Number of multipart containers in this tree, including `self`.
    #[must_use]
    pub fn multipart_count(&self) -> usize {
        match self {
            Self::Text(_) => 0,
            Self::Multipart(multipart) => {
                1 + multipart
                    .parts()
                    .iter()
                    .map(|part| match part {
                        Part::Content(content) => content.multipart_count(),
                        Part::Attachment(_) => 0,
                    })
                    .sum::<usize>()
            }
        }
    }
}

/// Guesses a content type from a file name's extension.
#[must_use]
pub fn guess_content_type(filename: &str) -> ContentType {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let mime_type = match extension.as_str() {
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "zip" => "application/zip",
        "json" => "application/json",
        "xml" => "application/xml",
        _ => return ContentType::octet_stream(),
    };

    ContentType {
        mime_type: mime_type.to_string(),
        charset: None,
    }
}
