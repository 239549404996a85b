//! Property-based tests for header and recipient handling.

#![allow(clippy::unwrap_used)]

use mailparse::{MailHeaderMap, parse_mail};
use missive::MessageBuilder;
use proptest::prelude::*;

/// Strategy to generate RFC 5322 field names
#[allow(
    clippy::expect_used,
    reason = "compile-time constant regex should be valid"
)]
fn header_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("X-[A-Za-z0-9]{1,8}(-[A-Za-z0-9]{1,8}){0,2}")
        .expect("header name regex should be valid")
}

/// Strategy to generate header values made of words, long enough to fold
fn header_value_strategy() -> impl Strategy<Value = String> {
    #[allow(
        clippy::expect_used,
        reason = "compile-time constant regex should be valid"
    )]
    let word = prop::string::string_regex("[A-Za-z0-9!#$%&*+/^_{}~.-]{1,16}")
        .expect("word regex should be valid");
    prop::collection::vec(word, 1..=12).prop_map(|words| words.join(" "))
}

/// Strategy to generate valid email addresses
fn email_strategy() -> impl Strategy<Value = String> {
    #[allow(
        clippy::expect_used,
        reason = "compile-time constant regex should be valid"
    )]
    let local = prop::string::string_regex("[a-z0-9+_-]{1,10}(\\.[a-z0-9+_-]{1,10}){0,2}")
        .expect("local part regex should be valid");
    #[allow(
        clippy::expect_used,
        reason = "compile-time constant regex should be valid"
    )]
    let domain = prop::string::string_regex("[a-z]{3,10}\\.[a-z]{2,5}")
        .expect("domain regex should be valid");

    (local, domain).prop_map(|(local, domain)| format!("{local}@{domain}"))
}

proptest! {
    #[test]
    fn prop_header_lookup_returns_value(name in header_name_strategy(), value in ".{1,64}") {
        let mut builder = MessageBuilder::new();
        builder.add_header(&name, &value).unwrap();
        prop_assert_eq!(builder.header(&name), Some(value.as_str()));
    }

    #[test]
    fn prop_empty_header_parts_are_rejected(name in header_name_strategy(), value in ".{1,64}") {
        let mut builder = MessageBuilder::new();

        prop_assert!(builder.add_header("", &value).unwrap_err().is_invalid_argument());
        prop_assert!(builder.add_header(&name, "").unwrap_err().is_invalid_argument());
        prop_assert!(builder.headers().is_empty());
    }

    #[test]
    fn prop_rendered_header_survives_folding(
        name in header_name_strategy(),
        value in header_value_strategy(),
    ) {
        let mut builder = MessageBuilder::new();
        builder
            .add_to("to@example.com")
            .unwrap()
            .set_subject("subject")
            .add_header(&name, &value)
            .unwrap();

        let rendered = builder.build().unwrap().render();
        for line in rendered.split("\r\n") {
            prop_assert!(line.len() <= 76, "line too long: {:?}", line);
        }

        let parsed = parse_mail(rendered.as_bytes()).unwrap();
        prop_assert_eq!(parsed.headers.get_first_value(&name), Some(value));
    }

    #[test]
    fn prop_bcc_keeps_unique_addresses_in_order(emails in prop::collection::vec(email_strategy(), 0..16)) {
        let mut builder = MessageBuilder::new();
        builder.add_bcc(emails.clone()).unwrap();

        let mut expected: Vec<String> = Vec::new();
        for email in emails {
            if !expected.contains(&email) {
                expected.push(email);
            }
        }

        let actual: Vec<String> = builder.bcc_addresses().iter().map(ToString::to_string).collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_invalid_address_leaves_list_unchanged(
        emails in prop::collection::vec(email_strategy(), 1..8),
        position in any::<prop::sample::Index>(),
    ) {
        let mut emails = emails;
        let at = position.index(emails.len() + 1);
        emails.insert(at, "not-an-address".to_string());

        let mut builder = MessageBuilder::new();
        prop_assert!(builder.add_to(emails).unwrap_err().is_address_format());
        prop_assert!(builder.to_addresses().is_empty());
    }
}
