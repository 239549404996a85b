use std::{
    fmt::{self, Display},
    ops::Deref,
    str::FromStr,
};

use mailparse::MailAddr;
use serde::{Deserialize, Serialize};

use crate::{
    address_parser::{AddressError, Mailbox, parse_mailbox},
    encoding::{Charset, encode_text},
    error::{EmailError, Result},
};

/// A mailbox with an optional display name, e.g. `Jane <jane@example.com>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    name: Option<String>,
    mailbox: Mailbox,
}

impl Address {
    /// Parses `address` and attaches `name` as its display name.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::AddressFormat`] if `address` is not a valid
    /// single address.
    pub fn with_name(address: &str, name: impl Into<String>) -> Result<Self> {
        let mut parsed: Self = address.parse()?;
        let name = name.into();
        parsed.name = (!name.trim().is_empty()).then_some(name);
        Ok(parsed)
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub const fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    /// Two addresses are the same recipient when their addr-specs match
    /// ignoring ASCII case; display names do not take part.
    #[must_use]
    pub fn same_mailbox(&self, other: &Self) -> bool {
        self.mailbox.local_part.eq_ignore_ascii_case(&other.mailbox.local_part)
            && self.mailbox.domain.eq_ignore_ascii_case(&other.mailbox.domain)
    }

    /// Header form with the display name encoded for `charset` when needed.
    #[must_use]
    pub fn encode(&self, charset: Charset) -> String {
        match &self.name {
            Some(name) if crate::encoding::needs_encoding(name) => {
                format!("{} <{}>", encode_text(name, charset), self.mailbox)
            }
            Some(name) => format!("{} <{}>", quote_display_name(name), self.mailbox),
            None => self.mailbox.to_string(),
        }
    }
}

/// Quotes a display name if it contains RFC 5322 specials.
fn quote_display_name(name: &str) -> String {
    const SPECIALS: &[char] = &['(', ')', '<', '>', '[', ']', ':', ';', '@', '\\', ',', '.', '"'];

    if name.contains(SPECIALS) {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        name.to_string()
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} <{}>", quote_display_name(name), self.mailbox),
            None => Display::fmt(&self.mailbox, f),
        }
    }
}

impl From<Mailbox> for Address {
    fn from(mailbox: Mailbox) -> Self {
        Self {
            name: None,
            mailbox,
        }
    }
}

impl FromStr for Address {
    type Err = EmailError;

    fn from_str(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EmailError::address(input, AddressError::Empty));
        }

        // Bare addr-specs skip addrparse, which rejects quoted local parts
        // and address literals.
        if !trimmed.contains('<') {
            return parse_mailbox(trimmed)
                .map(Self::from)
                .map_err(|err| EmailError::address(input, err));
        }

        let parsed = mailparse::addrparse(trimmed).map_err(|err| {
            EmailError::address(input, AddressError::Malformed(err.to_string()))
        })?;

        match parsed.as_slice() {
            [MailAddr::Single(single)] => {
                let mailbox =
                    parse_mailbox(&single.addr).map_err(|err| EmailError::address(input, err))?;

                Ok(Self {
                    name: single
                        .display_name
                        .clone()
                        .filter(|name| !name.trim().is_empty()),
                    mailbox,
                })
            }
            [MailAddr::Group(_)] => Err(EmailError::address(input, AddressError::Group)),
            addrs => Err(EmailError::address(
                input,
                AddressError::NotSingle(addrs.len()),
            )),
        }
    }
}

impl TryFrom<&str> for Address {
    type Error = EmailError;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

/// An ordered list of addresses in which each mailbox appears once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressList(Vec<Address>);

impl AddressList {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends `address` unless its mailbox is already present.
    ///
    /// Returns `true` if the list grew.
    pub fn push(&mut self, address: Address) -> bool {
        if self.contains_mailbox(&address) {
            false
        } else {
            self.0.push(address);
            true
        }
    }

    #[must_use]
    pub fn contains_mailbox(&self, address: &Address) -> bool {
        self.0.iter().any(|existing| existing.same_mailbox(address))
    }

    /// Header form, comma separated.
    #[must_use]
    pub fn encode(&self, charset: Charset) -> String {
        self.0
            .iter()
            .map(|address| address.encode(charset))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Display for AddressList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, addr) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            Display::fmt(addr, f)?;
        }
        Ok(())
    }
}

impl FromIterator<Address> for AddressList {
    fn from_iter<T: IntoIterator<Item = Address>>(iter: T) -> Self {
        let mut list = Self::new();
        for address in iter {
            list.push(address);
        }
        list
    }
}

impl Deref for AddressList {
    type Target = [Address];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'a> IntoIterator for &'a AddressList {
    type Item = &'a Address;
    type IntoIter = std::slice::Iter<'a, Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Anything that can be turned into one or more addresses.
///
/// Implemented for single addresses (`&str`, `String`, [`Address`]) and for
/// slices, arrays and vectors of them, so recipient methods accept either.
pub trait IntoAddresses {
    /// Parses every address, failing on the first malformed one.
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::AddressFormat`] for the first invalid input.
    fn into_addresses(self) -> Result<Vec<Address>>;
}

impl IntoAddresses for Address {
    fn into_addresses(self) -> Result<Vec<Address>> {
        Ok(vec![self])
    }
}

impl IntoAddresses for &Address {
    fn into_addresses(self) -> Result<Vec<Address>> {
        Ok(vec![self.clone()])
    }
}

impl IntoAddresses for &str {
    fn into_addresses(self) -> Result<Vec<Address>> {
        Ok(vec![self.parse()?])
    }
}

impl IntoAddresses for String {
    fn into_addresses(self) -> Result<Vec<Address>> {
        self.as_str().into_addresses()
    }
}

impl IntoAddresses for &String {
    fn into_addresses(self) -> Result<Vec<Address>> {
        self.as_str().into_addresses()
    }
}

impl<T: IntoAddresses + Clone> IntoAddresses for &[T] {
    fn into_addresses(self) -> Result<Vec<Address>> {
        self.iter().cloned().into_addresses_flat()
    }
}

impl<T: IntoAddresses, const N: usize> IntoAddresses for [T; N] {
    fn into_addresses(self) -> Result<Vec<Address>> {
        self.into_iter().into_addresses_flat()
    }
}

impl<T: IntoAddresses> IntoAddresses for Vec<T> {
    fn into_addresses(self) -> Result<Vec<Address>> {
        self.into_iter().into_addresses_flat()
    }
}

trait FlattenAddresses {
    fn into_addresses_flat(self) -> Result<Vec<Address>>;
}

impl<I, T> FlattenAddresses for I
where
    I: Iterator<Item = T>,
    T: IntoAddresses,
{
    fn into_addresses_flat(self) -> Result<Vec<Address>> {
        let mut addresses = Vec::new();
        for item in self {
            addresses.extend(item.into_addresses()?);
        }
        Ok(addresses)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_bare_address() {
        let address: Address = "test@email.com".parse().unwrap();
        assert_eq!(address.name(), None);
        assert_eq!(address.mailbox().local_part, "test");
        assert_eq!(address.to_string(), "test@email.com");
    }

    #[test]
    fn test_parse_named_address() {
        let address: Address = "Jane Doe <jane@example.com>".parse().unwrap();
        assert_eq!(address.name(), Some("Jane Doe"));
        assert_eq!(address.mailbox().domain, "example.com");
        assert_eq!(address.to_string(), "Jane Doe <jane@example.com>");
    }

    #[test]
    fn test_parse_quoted_local_part_and_literals() {
        let address: Address = r#""user name"@example.com"#.parse().unwrap();
        assert_eq!(address.name(), None);
        assert_eq!(address.mailbox().local_part, r#""user name""#);

        let address: Address = "user@[IPv6:2001:db8::1]".parse().unwrap();
        assert_eq!(address.mailbox().domain, "[IPv6:2001:db8::1]");

        let address: Address = "user@[192.168.1.1]".parse().unwrap();
        assert_eq!(address.to_string(), "user@[192.168.1.1]");

        let address: Address = r#"Jane <"j d"@example.com>"#.parse().unwrap();
        assert_eq!(address.name(), Some("Jane"));
        assert_eq!(address.mailbox().local_part, r#""j d""#);

        assert!(
            "user@[IPv6:garbage]"
                .parse::<Address>()
                .unwrap_err()
                .is_address_format()
        );
    }

    #[test]
    fn test_with_name_quotes_specials() {
        let address = Address::with_name("test@email.com", "Doe, Jane").unwrap();
        assert_eq!(address.to_string(), "\"Doe, Jane\" <test@email.com>");

        let unnamed = Address::with_name("test@email.com", "  ").unwrap();
        assert_eq!(unnamed.name(), None);
    }

    #[test]
    fn test_encode_non_ascii_name() {
        let address = Address::with_name("jose@example.com", "José").unwrap();
        assert_eq!(
            address.encode(Charset::default()),
            "=?UTF-8?B?Sm9zw6k=?= <jose@example.com>"
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["", "https", "a@b.com, c@d.com", "user@-example.com"] {
            let err = input.parse::<Address>().unwrap_err();
            assert!(err.is_address_format(), "{input:?} gave {err}");
        }
    }

    #[test]
    fn test_list_is_unique_by_mailbox() {
        let mut list = AddressList::new();
        assert!(list.push("a@example.com".parse().unwrap()));
        assert!(!list.push("A <A@EXAMPLE.COM>".parse().unwrap()));
        assert!(list.push("b@example.com".parse().unwrap()));

        assert_eq!(list.len(), 2);
        assert_eq!(list.to_string(), "a@example.com, b@example.com");
    }

    #[test]
    fn test_into_addresses_variants() {
        assert_eq!("a@b.com".into_addresses().unwrap().len(), 1);
        assert_eq!(
            ["a@b.com", "c@d.com", "e@f.com"]
                .into_addresses()
                .unwrap()
                .len(),
            3
        );
        assert_eq!(
            vec!["a@b.com".to_string()].into_addresses().unwrap().len(),
            1
        );

        let slice: &[&str] = &["a@b.com", "oops"];
        assert!(slice.into_addresses().unwrap_err().is_address_format());
    }
}
