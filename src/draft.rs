//! Messages described as TOML.
//!
//! ```toml
//! subject = "Quarterly report"
//! from = "Reports <reports@example.com>"
//! to = ["alice@example.com", "Bob <bob@example.com>"]
//! text = "See the attached numbers."
//!
//! [headers]
//! X-Priority = "1"
//!
//! [session]
//! host = "smtp.example.com"
//! port = 587
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    builder::{MessageBuilder, RecipientKind},
    config::SessionConfig,
    content::Content,
    error::Result,
};

/// A message as written in a draft file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Draft {
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub reply_to: Vec<String>,
    pub bounce_address: Option<String>,
    pub charset: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// RFC 3339, e.g. `"2024-05-01T09:30:00Z"`.
    pub sent_date: Option<DateTime<Utc>>,
    pub session: Option<SessionConfig>,
}

impl Draft {
    /// # Errors
    ///
    /// Returns [`crate::EmailError::Draft`] if `input` is not a valid draft.
    pub fn from_toml(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Loads the draft into a fresh builder.
    ///
    /// A draft with both `text` and `html` gets a `multipart/alternative`
    /// body.
    ///
    /// # Errors
    ///
    /// Fails on the first address, header or charset the builder rejects.
    pub fn into_builder(self) -> Result<MessageBuilder> {
        let mut builder = MessageBuilder::new();

        if let Some(subject) = self.subject {
            builder.set_subject(subject);
        }

        if let Some(from) = &self.from {
            builder.set_from(from)?;
        }

        builder
            .add_to(self.to)?
            .add_cc(self.cc)?
            .add_bcc(self.bcc)?
            .add_recipient(RecipientKind::ReplyTo, self.reply_to)?;

        if let Some(bounce) = self.bounce_address {
            builder.set_bounce_address(bounce);
        }

        if let Some(charset) = &self.charset {
            builder.set_charset(charset)?;
        }

        match (self.text, self.html) {
            (Some(text), Some(html)) => {
                builder.set_content(Content::alternative(text, html));
            }
            (Some(text), None) => {
                builder.set_text(text);
            }
            (None, Some(html)) => {
                builder.set_html(html);
            }
            (None, None) => {}
        }

        if !self.headers.is_empty() {
            builder.set_headers(self.headers)?;
        }

        if let Some(date) = self.sent_date {
            builder.set_sent_date(date);
        }

        if let Some(session) = self.session {
            builder.set_session(session);
        }

        Ok(builder)
    }
}
