//! Header and body transfer encodings.
//!
//! Everything that ends up on the wire is 7-bit ASCII: non-ASCII header text
//! becomes RFC 2047 encoded-words, non-ASCII bodies become base64 in the
//! message charset.

use std::{borrow::Cow, fmt};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use encoding_rs::{Encoding, UTF_8};

use crate::error::{EmailError, Result};

/// Maximum length of a header line before folding, excluding CRLF.
pub const LINE_LENGTH: usize = 76;

/// Hard limit on any line, excluding CRLF (RFC 5322 section 2.1.1).
const MAX_LINE: usize = 998;

/// Raw bytes carried by one encoded-word, keeping each word within 75
/// characters including the `=?UTF-8?B?` wrapper.
const WORD_BYTES: usize = 45;

/// A character set known to `encoding_rs`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Charset(&'static Encoding);

impl Charset {
    /// Looks up a charset by any WHATWG label (`utf-8`, `latin1`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::InvalidArgument`] for unknown labels.
    pub fn for_label(label: &str) -> Result<Self> {
        Encoding::for_label(label.trim().as_bytes())
            .map(Self)
            .ok_or_else(|| EmailError::InvalidArgument(format!("unknown charset {label:?}")))
    }

    /// Canonical name used in `charset=` parameters and encoded-words.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0.output_encoding().name()
    }

    /// Encodes `text` in this charset.
    ///
    /// Characters the charset cannot represent become numeric character
    /// references, as `encoding_rs` does.
    #[must_use]
    pub fn encode<'a>(&self, text: &'a str) -> Cow<'a, [u8]> {
        let (bytes, _, _) = self.0.encode(text);
        bytes
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self(UTF_8)
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset").field(&self.name()).finish()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The `Content-Transfer-Encoding` of a leaf entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    SevenBit,
    Base64,
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SevenBit => "7bit",
            Self::Base64 => "base64",
        })
    }
}

/// Returns `true` if `text` can not appear in a header verbatim.
#[must_use]
pub fn needs_encoding(text: &str) -> bool {
    text.chars()
        .any(|ch| !ch.is_ascii() || (ch.is_ascii_control() && ch != '\t'))
}

/// Encodes `text` as one or more base64 encoded-words separated by spaces.
#[must_use]
pub fn encode_words(text: &str, charset: Charset) -> String {
    let mut words = Vec::new();
    let mut chunk = String::new();
    let mut chunk_len = 0;

    for ch in text.chars() {
        let mut buf = [0u8; 4];
        let len = charset.encode(ch.encode_utf8(&mut buf)).len();

        if chunk_len + len > WORD_BYTES && !chunk.is_empty() {
            words.push(encode_word(&chunk, charset));
            chunk.clear();
            chunk_len = 0;
        }

        chunk.push(ch);
        chunk_len += len;
    }

    if !chunk.is_empty() {
        words.push(encode_word(&chunk, charset));
    }

    words.join(" ")
}

fn encode_word(text: &str, charset: Charset) -> String {
    format!(
        "=?{}?B?{}?=",
        charset.name(),
        STANDARD.encode(charset.encode(text))
    )
}

/// Encodes `text` only if it contains characters that need it.
#[must_use]
pub fn encode_text(text: &str, charset: Charset) -> Cow<'_, str> {
    if needs_encoding(text) {
        Cow::Owned(encode_words(text, charset))
    } else {
        Cow::Borrowed(text)
    }
}

/// Like [`encode_text`], but also encodes values holding a word too long
/// to fold under the hard line limit.
///
/// `used` is the number of columns taken before the value on its first
/// line.
#[must_use]
pub fn encode_header_value(used: usize, text: &str, charset: Charset) -> Cow<'_, str> {
    let overlong = text
        .split(' ')
        .enumerate()
        .any(|(i, word)| word.len() + if i == 0 { used } else { 1 } > MAX_LINE);

    if overlong {
        Cow::Owned(encode_words(text, charset))
    } else {
        encode_text(text, charset)
    }
}

/// Formats a MIME parameter such as `filename="report.pdf"`.
///
/// ASCII values become a quoted-string. Anything else uses the RFC 2231
/// extended form in UTF-8, `filename*=UTF-8''r%C3%A9sum%C3%A9.pdf`.
#[must_use]
pub fn encode_param(key: &str, value: &str) -> String {
    if value.chars().all(|ch| ch.is_ascii() && !ch.is_ascii_control()) {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        return format!("{key}=\"{escaped}\"");
    }

    let mut encoded = String::with_capacity(value.len() * 3);
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }

    format!("{key}*=UTF-8''{encoded}")
}

/// Folds a header value at spaces so that no line exceeds [`LINE_LENGTH`].
///
/// `used` is the number of columns already taken on the first line, usually
/// the header name plus `": "`. Words longer than a line are left intact.
#[must_use]
pub fn fold(used: usize, value: &str) -> String {
    let mut folded = String::with_capacity(value.len() + 8);
    let mut column = used;

    for (i, word) in value.split(' ').enumerate() {
        if i > 0 {
            if column + 1 + word.len() > LINE_LENGTH {
                folded.push_str("\r\n ");
                column = 1;
            } else {
                folded.push(' ');
                column += 1;
            }
        }

        folded.push_str(word);
        column += word.len();
    }

    folded
}

/// Base64 with CRLF line breaks every [`LINE_LENGTH`] characters.
#[must_use]
pub fn base64_lines(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut wrapped = String::with_capacity(encoded.len() + encoded.len() / LINE_LENGTH * 2 + 2);

    for (i, ch) in encoded.chars().enumerate() {
        if i > 0 && i % LINE_LENGTH == 0 {
            wrapped.push_str("\r\n");
        }
        wrapped.push(ch);
    }

    if !encoded.is_empty() {
        wrapped.push_str("\r\n");
    }

    wrapped
}

/// Picks the transfer encoding for a text body and produces its wire form.
#[must_use]
pub fn encode_body(text: &str, charset: Charset) -> (TransferEncoding, String) {
    let plain = text.is_ascii()
        && text
            .lines()
            .all(|line| line.len() <= MAX_LINE && !line.contains('\r'));

    if plain {
        let mut body = text.lines().collect::<Vec<_>>().join("\r\n");
        if !body.is_empty() {
            body.push_str("\r\n");
        }
        (TransferEncoding::SevenBit, body)
    } else {
        (
            TransferEncoding::Base64,
            base64_lines(&charset.encode(text)),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_lookup() {
        assert_eq!(Charset::default().name(), "UTF-8");
        assert_eq!(Charset::for_label("utf8").unwrap().name(), "UTF-8");
        assert_eq!(
            Charset::for_label(" ISO-8859-2 ").unwrap().name(),
            "ISO-8859-2"
        );
        assert!(
            Charset::for_label("charset")
                .unwrap_err()
                .is_invalid_argument()
        );
    }

    #[test]
    fn test_needs_encoding() {
        assert!(!needs_encoding("Plain subject\twith tab"));
        assert!(needs_encoding("Grüße"));
        assert!(needs_encoding("line\r\nbreak"));
    }

    #[test]
    fn test_encode_words() {
        assert_eq!(
            encode_words("Grüße", Charset::default()),
            "=?UTF-8?B?R3LDvMOfZQ==?="
        );

        let latin = Charset::for_label("iso-8859-2").unwrap();
        assert_eq!(encode_words("ü", latin), "=?ISO-8859-2?B?/A==?=");
    }

    #[test]
    fn test_long_text_splits_into_words() {
        let text = "ü".repeat(60);
        let encoded = encode_words(&text, Charset::default());

        let words: Vec<_> = encoded.split(' ').collect();
        assert!(words.len() > 1);
        assert!(words.iter().all(|word| word.len() <= 75));

        let decoded = mailparse::parse_header(format!("Subject: {encoded}").as_bytes())
            .unwrap()
            .0
            .get_value();
        assert_eq!(decoded, text);
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold(9, "short value"), "short value");

        let value = ["word"; 30].join(" ");
        let folded = fold(9, &value);
        assert!(folded.contains("\r\n "));
        assert!(folded.split("\r\n").all(|line| line.len() + 8 <= MAX_LINE));
        assert_eq!(folded.replace("\r\n ", " "), value);
    }

    #[test]
    fn test_encode_header_value_handles_overlong_words() {
        assert_eq!(
            encode_header_value(8, "short words", Charset::default()),
            "short words"
        );

        let long = "x".repeat(1200);
        let encoded = encode_header_value(8, &long, Charset::default());
        assert!(encoded.starts_with("=?UTF-8?B?"));

        let folded = fold(8, &encoded);
        assert!(folded.split("\r\n").all(|line| line.len() + 8 <= MAX_LINE));

        let decoded = mailparse::parse_header(format!("X-Long: {folded}").as_bytes())
            .unwrap()
            .0
            .get_value();
        assert_eq!(decoded, long);
    }

    #[test]
    fn test_encode_param() {
        assert_eq!(encode_param("filename", "report.pdf"), r#"filename="report.pdf""#);
        assert_eq!(
            encode_param("filename", r#"report "final" \ v2.pdf"#),
            r#"filename="report \"final\" \\ v2.pdf""#
        );
        assert_eq!(
            encode_param("filename", "résumé.pdf"),
            "filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
    }

    #[test]
    fn test_base64_lines() {
        assert_eq!(base64_lines(b"Hello World"), "SGVsbG8gV29ybGQ=\r\n");
        assert_eq!(base64_lines(b""), "");

        let wrapped = base64_lines(&[0u8; 120]);
        let lines: Vec<_> = wrapped.lines().collect();
        assert_eq!(lines[0].len(), LINE_LENGTH);
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_encode_body() {
        let (encoding, body) = encode_body("Hello\nWorld", Charset::default());
        assert_eq!(encoding, TransferEncoding::SevenBit);
        assert_eq!(body, "Hello\r\nWorld\r\n");

        let (encoding, body) = encode_body("Grüße", Charset::default());
        assert_eq!(encoding, TransferEncoding::Base64);
        assert_eq!(body, "R3LDvMOfZQ==\r\n");
    }
}
