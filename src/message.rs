//! The immutable message snapshot produced by [`crate::MessageBuilder::build`].

use std::{
    collections::BTreeMap,
    fmt::{self, Write},
    sync::atomic::{AtomicU64, Ordering},
};

use chrono::{DateTime, Utc};

use crate::{
    address::{Address, AddressList},
    address_parser::Mailbox,
    content::{Attachment, Content, ContentType, Multipart, Part, TextPart},
    encoding::{Charset, base64_lines, encode_body, encode_header_value, encode_param, fold},
};

static BOUNDARY_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Everything a message was built from, frozen at build time.
///
/// Rendering a snapshot is deterministic: multipart boundaries are chosen
/// once, when the snapshot is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeMessage {
    pub(crate) subject: Option<String>,
    pub(crate) from: Option<Address>,
    pub(crate) bounce_address: Option<String>,
    pub(crate) to: AddressList,
    pub(crate) cc: AddressList,
    pub(crate) bcc: AddressList,
    pub(crate) reply_to: AddressList,
    pub(crate) headers: BTreeMap<String, String>,
    pub(crate) sent_date: DateTime<Utc>,
    pub(crate) content: Option<Content>,
    pub(crate) charset: Charset,
    pub(crate) boundary_seed: String,
}

/// SMTP envelope derived from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    sender: Option<String>,
    recipients: Vec<Mailbox>,
}

impl Envelope {
    /// The reverse-path: the bounce address if set, else the From mailbox.
    #[inline]
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// To, Cc and Bcc recipients, in that order.
    #[inline]
    #[must_use]
    pub fn recipients(&self) -> &[Mailbox] {
        &self.recipients
    }
}

impl MimeMessage {
    /// Unique per process: a timestamp plus a sequence number.
    pub(crate) fn next_boundary_seed(now: DateTime<Utc>) -> String {
        let sequence = BOUNDARY_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        format!("{sequence}.{}", now.timestamp_millis())
    }

    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    #[must_use]
    pub const fn from(&self) -> Option<&Address> {
        self.from.as_ref()
    }

    #[must_use]
    pub fn bounce_address(&self) -> Option<&str> {
        self.bounce_address.as_deref()
    }

    #[must_use]
    pub const fn to(&self) -> &AddressList {
        &self.to
    }

    #[must_use]
    pub const fn cc(&self) -> &AddressList {
        &self.cc
    }

    #[must_use]
    pub const fn bcc(&self) -> &AddressList {
        &self.bcc
    }

    #[must_use]
    pub const fn reply_to(&self) -> &AddressList {
        &self.reply_to
    }

    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub const fn sent_date(&self) -> DateTime<Utc> {
        self.sent_date
    }

    #[must_use]
    pub const fn content(&self) -> Option<&Content> {
        self.content.as_ref()
    }

    #[must_use]
    pub const fn charset(&self) -> Charset {
        self.charset
    }

    #[must_use]
    pub fn envelope(&self) -> Envelope {
        let sender = self
            .bounce_address
            .clone()
            .or_else(|| self.from.as_ref().map(|from| from.mailbox().to_string()));

        let recipients = self
            .to
            .iter()
            .chain(self.cc.iter())
            .chain(self.bcc.iter())
            .map(|address| address.mailbox().clone())
            .collect();

        Envelope { sender, recipients }
    }

    /// The RFC 5322 wire form with CRLF line endings.
    ///
    /// Bcc recipients are never written.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }

    fn boundary(&self, index: usize) -> String {
        format!("----=_Part_{index}_{}", self.boundary_seed)
    }

    fn write_header(f: &mut impl Write, name: &str, value: &str) -> fmt::Result {
        write!(f, "{name}: {}\r\n", fold(name.len() + 2, value))
    }

    fn write_text(&self, f: &mut impl Write, part: &TextPart) -> fmt::Result {
        let charset = part
            .content_type
            .charset()
            .and_then(|label| Charset::for_label(label).ok())
            .unwrap_or(self.charset);

        let content_type = part.content_type.clone().with_charset(charset.name());
        let (encoding, body) = encode_body(&part.body, charset);

        Self::write_header(f, "Content-Type", &content_type.to_string())?;
        Self::write_header(f, "Content-Transfer-Encoding", &encoding.to_string())?;
        f.write_str("\r\n")?;
        f.write_str(&body)
    }

    fn write_attachment(&self, f: &mut impl Write, attachment: &Attachment) -> fmt::Result {
        Self::write_header(
            f,
            "Content-Type",
            &format!(
                "{}; {}",
                attachment.content_type,
                encode_param("name", &attachment.filename)
            ),
        )?;
        Self::write_header(f, "Content-Transfer-Encoding", "base64")?;
        Self::write_header(
            f,
            "Content-Disposition",
            &format!("attachment; {}", encode_param("filename", &attachment.filename)),
        )?;
        f.write_str("\r\n")?;
        f.write_str(&base64_lines(&attachment.data))
    }

    fn write_multipart(
        &self,
        f: &mut impl Write,
        multipart: &Multipart,
        next: &mut usize,
    ) -> fmt::Result {
        let boundary = self.boundary(*next);
        *next += 1;

        Self::write_header(
            f,
            "Content-Type",
            &format!("{}; boundary=\"{boundary}\"", multipart.kind()),
        )?;
        f.write_str("\r\n")?;

        for part in multipart.parts() {
            write!(f, "--{boundary}\r\n")?;
            match part {
                Part::Content(content) => self.write_content(f, content, next)?,
                Part::Attachment(attachment) => self.write_attachment(f, attachment)?,
            }
        }

        write!(f, "--{boundary}--\r\n")
    }

    fn write_content(&self, f: &mut impl Write, content: &Content, next: &mut usize) -> fmt::Result {
        match content {
            Content::Text(part) => self.write_text(f, part),
            Content::Multipart(multipart) => self.write_multipart(f, multipart, next),
        }
    }
}

impl fmt::Display for MimeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Self::write_header(f, "Date", &self.sent_date.to_rfc2822())?;

        if let Some(from) = &self.from {
            Self::write_header(f, "From", &from.encode(self.charset))?;
        }

        for (name, list) in [("To", &self.to), ("Cc", &self.cc), ("Reply-To", &self.reply_to)] {
            if !list.is_empty() {
                Self::write_header(f, name, &list.encode(self.charset))?;
            }
        }

        if let Some(subject) = &self.subject {
            let subject = encode_header_value("Subject".len() + 2, subject, self.charset);
            Self::write_header(f, "Subject", &subject)?;
        }

        for (name, value) in &self.headers {
            let value = encode_header_value(name.len() + 2, value, self.charset);
            Self::write_header(f, name, &value)?;
        }

        Self::write_header(f, "MIME-Version", "1.0")?;

        let mut next = 0;
        match &self.content {
            Some(content) => self.write_content(f, content, &mut next),
            None => self.write_text(
                f,
                &TextPart {
                    body: String::new(),
                    content_type: ContentType::text_plain(),
                },
            ),
        }
    }
}
