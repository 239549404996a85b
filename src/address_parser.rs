//! Mailbox grammar for message addresses.
//!
//! Display names are split off by [`crate::address::Address`]; this module
//! only validates the addr-spec that remains, following the mailbox rules of
//! RFC 5321 Section 4.1.2:
//!
//! ```text
//! Mailbox        = Local-part "@" ( Domain / address-literal )
//! Local-part     = Dot-string / Quoted-string
//! Dot-string     = Atom *("." Atom)
//! Domain         = sub-domain *("." sub-domain)
//! sub-domain     = Let-dig [Ldh-str]
//! address-literal = "[" ( IPv4 / "IPv6:" IPv6 / tag ":" value ) "]"
//! ```
//!
//! An addr-spec may optionally be wrapped in angle brackets.

use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of a local part in octets.
pub const MAX_LOCAL_PART: usize = 64;
/// Maximum length of a domain in octets.
pub const MAX_DOMAIN: usize = 255;

pub type Result<T> = std::result::Result<T, AddressError>;

/// Reasons an addr-spec can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("Empty address")]
    Empty,
    #[error("Local-part exceeds 64 octets")]
    LocalPartTooLong,
    #[error("Domain exceeds 255 octets")]
    DomainTooLong,
    #[error("Unbalanced angle brackets")]
    UnbalancedBrackets,
    #[error("Missing '@' separator in mailbox")]
    MissingAtSign,
    #[error("Invalid local-part: {0}")]
    InvalidLocalPart(String),
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
    #[error("Invalid address literal: {0}")]
    InvalidAddressLiteral(String),
    #[error("Unclosed quoted string in local-part")]
    UnclosedQuotedString,
    #[error("Invalid quoted string: {0}")]
    InvalidQuotedString(String),
    #[error("Expected a single address, found {0}")]
    NotSingle(usize),
    #[error("Address groups are not allowed here")]
    Group,
    #[error("Malformed address: {0}")]
    Malformed(String),
}

/// A validated `local-part@domain` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Mailbox {
    pub local_part: String,
    pub domain: String,
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

/// Parses an addr-spec such as `user@example.com` or `<user@example.com>`.
///
/// # Errors
///
/// Returns an [`AddressError`] describing the first violation found.
pub fn parse_mailbox(input: &str) -> Result<Mailbox> {
    let trimmed = input.trim();

    let spec = match (trimmed.starts_with('<'), trimmed.ends_with('>')) {
        (true, true) if trimmed.len() >= 2 => &trimmed[1..trimmed.len() - 1],
        (false, false) => trimmed,
        _ => return Err(AddressError::UnbalancedBrackets),
    };

    if spec.is_empty() {
        return Err(AddressError::Empty);
    }

    let at = find_unquoted_at(spec)?;
    let (local, domain) = (&spec[..at], &spec[at + 1..]);

    if local.len() > MAX_LOCAL_PART {
        return Err(AddressError::LocalPartTooLong);
    }
    if domain.len() > MAX_DOMAIN {
        return Err(AddressError::DomainTooLong);
    }

    if local.starts_with('"') {
        validate_quoted_string(local)?;
    } else {
        validate_dot_string(local)?;
    }

    if domain.starts_with('[') {
        validate_address_literal(domain)?;
    } else {
        validate_domain(domain)?;
    }

    Ok(Mailbox {
        local_part: local.to_string(),
        domain: domain.to_string(),
    })
}

/// Byte offset of the last '@' outside quotes and brackets.
fn find_unquoted_at(input: &str) -> Result<usize> {
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;
    let mut at = None;

    for (i, ch) in input.char_indices() {
        match ch {
            '"' if !escaped && !in_brackets => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            '@' if !in_quotes && !in_brackets => at = Some(i),
            _ => {}
        }

        escaped = ch == '\\' && !escaped;
    }

    if in_quotes {
        return Err(AddressError::UnclosedQuotedString);
    }

    at.ok_or(AddressError::MissingAtSign)
}

fn validate_dot_string(input: &str) -> Result<()> {
    if input.is_empty() {
        return Err(AddressError::InvalidLocalPart(
            "Empty local-part".to_string(),
        ));
    }

    for atom in input.split('.') {
        if atom.is_empty() {
            return Err(AddressError::InvalidLocalPart(
                "Dot-string cannot start or end with '.' or contain '..'".to_string(),
            ));
        }

        if let Some(ch) = atom.chars().find(|&ch| !is_atext(ch)) {
            return Err(AddressError::InvalidLocalPart(format!(
                "Invalid character '{ch}' in atom"
            )));
        }
    }

    Ok(())
}

fn validate_quoted_string(input: &str) -> Result<()> {
    if input.len() < 2 || !input.ends_with('"') {
        return Err(AddressError::UnclosedQuotedString);
    }

    let mut chars = input[1..input.len() - 1].chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) if next.is_ascii_graphic() || next == ' ' => {}
                Some(next) => {
                    return Err(AddressError::InvalidQuotedString(format!(
                        "Invalid quoted-pair: \\{next}"
                    )));
                }
                None => {
                    return Err(AddressError::InvalidQuotedString(
                        "Backslash at end of quoted string".to_string(),
                    ));
                }
            }
        } else if !is_qtext(ch) {
            return Err(AddressError::InvalidQuotedString(format!(
                "Invalid character '{ch}' in quoted string"
            )));
        }
    }

    Ok(())
}

fn validate_domain(input: &str) -> Result<()> {
    if input.is_empty() {
        return Err(AddressError::InvalidDomain("Empty domain".to_string()));
    }

    for label in input.split('.') {
        let (Some(first), Some(last)) = (label.chars().next(), label.chars().last()) else {
            return Err(AddressError::InvalidDomain(
                "Domain cannot start or end with '.' or contain '..'".to_string(),
            ));
        };

        if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
            return Err(AddressError::InvalidDomain(format!(
                "Subdomain {label:?} must start and end with a letter or digit"
            )));
        }

        if let Some(ch) = label
            .chars()
            .find(|ch| !ch.is_ascii_alphanumeric() && *ch != '-')
        {
            return Err(AddressError::InvalidDomain(format!(
                "Invalid character '{ch}' in subdomain"
            )));
        }
    }

    Ok(())
}

fn validate_address_literal(input: &str) -> Result<()> {
    let Some(content) = input.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
        return Err(AddressError::InvalidAddressLiteral(
            "Address literal must be enclosed in brackets".to_string(),
        ));
    };

    if content.parse::<Ipv4Addr>().is_ok() {
        return Ok(());
    }

    let invalid = || AddressError::InvalidAddressLiteral(content.to_string());
    let (tag, value) = content.split_once(':').ok_or_else(invalid)?;

    if tag.eq_ignore_ascii_case("IPv6") {
        return value.parse::<Ipv6Addr>().map(|_| ()).map_err(|_| invalid());
    }

    // General-address-literal: Ldh-str ":" 1*dcontent
    let tag_ok = tag.chars().next().is_some_and(|ch| ch.is_ascii_alphanumeric())
        && tag.chars().last().is_some_and(|ch| ch.is_ascii_alphanumeric())
        && tag.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-');

    if tag_ok && !value.is_empty() && value.chars().all(is_dcontent) {
        Ok(())
    } else {
        Err(invalid())
    }
}

/// Printable ASCII except `[`, `\` and `]`.
#[inline]
const fn is_dcontent(ch: char) -> bool {
    matches!(ch as u32, 33..=90 | 94..=126)
}

#[inline]
const fn is_atext(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '/'
                | '='
                | '?'
                | '^'
                | '_'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
        )
}

/// Printable ASCII except backslash and double quote.
#[inline]
const fn is_qtext(ch: char) -> bool {
    matches!(ch as u32, 32..=33 | 35..=91 | 93..=126)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_mailbox() {
        let mailbox = parse_mailbox("test@email.com").unwrap();
        assert_eq!(mailbox.local_part, "test");
        assert_eq!(mailbox.domain, "email.com");
    }

    #[test]
    fn test_parse_bracketed_mailbox() {
        let mailbox = parse_mailbox(" <abc@d.com> ").unwrap();
        assert_eq!(mailbox.to_string(), "abc@d.com");
    }

    #[test]
    fn test_parse_quoted_local_part() {
        let mailbox = parse_mailbox(r#""user name"@example.com"#).unwrap();
        assert_eq!(mailbox.local_part, r#""user name""#);

        let mailbox = parse_mailbox(r#""a@b"@example.com"#).unwrap();
        assert_eq!(mailbox.local_part, r#""a@b""#);
        assert_eq!(mailbox.domain, "example.com");
    }

    #[test]
    fn test_parse_address_literals() {
        assert_eq!(
            parse_mailbox("user@[192.168.1.1]").unwrap().domain,
            "[192.168.1.1]"
        );
        assert_eq!(
            parse_mailbox("user@[IPv6:2001:db8::1]").unwrap().domain,
            "[IPv6:2001:db8::1]"
        );
        assert_eq!(
            parse_mailbox("user@[x-tag:some.value]").unwrap().domain,
            "[x-tag:some.value]"
        );
        assert!(parse_mailbox("user@[nonsense]").is_err());
    }

    #[test]
    fn test_reject_malformed_address_literals() {
        for input in [
            "user@[IPv6:garbage]",
            "user@[ipv6:1.2.3]",
            "user@[tag:two words]",
            "user@[-tag:value]",
            "user@[tag:]",
            "user@[:value]",
        ] {
            assert!(
                matches!(
                    parse_mailbox(input),
                    Err(AddressError::InvalidAddressLiteral(_))
                ),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_invalid_mailboxes() {
        assert_eq!(parse_mailbox(""), Err(AddressError::Empty));
        assert_eq!(parse_mailbox("<>"), Err(AddressError::Empty));
        assert_eq!(parse_mailbox("https"), Err(AddressError::MissingAtSign));
        assert_eq!(
            parse_mailbox("<user@example.com"),
            Err(AddressError::UnbalancedBrackets)
        );
        assert!(matches!(
            parse_mailbox(".@aaa.aa"),
            Err(AddressError::InvalidLocalPart(_))
        ));
        assert!(matches!(
            parse_mailbox("user..name@example.com"),
            Err(AddressError::InvalidLocalPart(_))
        ));
        assert!(matches!(
            parse_mailbox("user@example-.com"),
            Err(AddressError::InvalidDomain(_))
        ));
        assert!(matches!(
            parse_mailbox("user@.example.com"),
            Err(AddressError::InvalidDomain(_))
        ));
        assert_eq!(
            parse_mailbox(r#""open@example.com"#),
            Err(AddressError::UnclosedQuotedString)
        );
    }

    #[test]
    fn test_length_limits() {
        let long_local = format!("{}@example.com", "a".repeat(70));
        assert_eq!(
            parse_mailbox(&long_local),
            Err(AddressError::LocalPartTooLong)
        );

        let long_domain = format!("user@{}.com", "a".repeat(260));
        assert_eq!(parse_mailbox(&long_domain), Err(AddressError::DomainTooLong));
    }
}
