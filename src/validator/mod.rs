//! Syntax gate: a conservative address grammar, checked without any I/O.

use std::sync::LazyLock;

use regex::Regex;

const MAX_ADDRESS_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;

// local: atoms of [A-Za-z0-9_+-] joined by single dots
// domain: labels of 1..=63 alnum/hyphen, no edge hyphen, alphabetic TLD
static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<local>[A-Za-z0-9_+-]+(?:\.[A-Za-z0-9_+-]+)*)@(?P<domain>(?:[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z]{2,63})$",
    )
    .expect("address pattern compiles")
});

/// Returns `true` when `address` matches the accepted grammar.
///
/// The input is not trimmed: surrounding whitespace makes the address invalid.
pub fn check_syntax(address: &str) -> bool {
    if address.len() > MAX_ADDRESS_LEN {
        return false;
    }
    match ADDRESS_RE.captures(address) {
        Some(caps) => caps
            .name("local")
            .is_some_and(|local| local.as_str().len() <= MAX_LOCAL_LEN),
        None => false,
    }
}

/// Domain part of an address (everything after the last `@`).
pub fn domain_of(address: &str) -> Option<&str> {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|domain| !domain.is_empty())
}
