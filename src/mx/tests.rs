use std::time::Duration;

use super::{Error, LookupMx, MxRecord, resolve_mx, resolver};
use crate::deadline::Deadline;

type LookupResult = Result<Vec<MxRecord>, Error>;
type LookupFn = dyn Fn(&str) -> LookupResult + Send + Sync;

/// Resolver answering from a closure. Like [`SystemResolver`](super::SystemResolver),
/// it refuses to start once the deadline is spent.
pub(crate) struct StubResolver {
    pub on_lookup: Box<LookupFn>,
}

impl StubResolver {
    pub(crate) fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> LookupResult + Send + Sync + 'static,
    {
        Self {
            on_lookup: Box::new(f),
        }
    }

    /// Every domain resolves to `records`.
    pub(crate) fn with_records(records: Vec<MxRecord>) -> Self {
        Self::new(move |_| Ok(records.clone()))
    }

    /// Every domain is unknown.
    pub(crate) fn empty() -> Self {
        Self::new(|domain| {
            Err(Error::NoRecords {
                domain: domain.to_string(),
            })
        })
    }
}

impl LookupMx for StubResolver {
    fn lookup_mx(&self, domain: &str, deadline: &Deadline) -> LookupResult {
        deadline.check().map_err(Error::Expired)?;
        (self.on_lookup)(domain)
    }
}

fn deadline() -> Deadline {
    Deadline::after(Duration::from_secs(5))
}

#[test]
fn normalize_domain_rejects_empty() {
    let err = resolver::normalize_domain("  ").expect_err("empty domain should fail");
    assert!(matches!(err, Error::EmptyDomain));
}

#[test]
fn normalize_domain_lowercases_and_strips_root() {
    let ascii = resolver::normalize_domain("Example.COM.").expect("valid domain");
    assert_eq!(ascii, "example.com");
}

#[test]
fn resolve_sorts_and_dedups_records() {
    let stub = StubResolver::new(|domain| {
        assert_eq!(domain, "example.com");
        Ok(vec![
            MxRecord::new(20, "mx2.example.com"),
            MxRecord::new(10, "mx1.example.com"),
            MxRecord::new(10, "mx1.example.com"),
            MxRecord::new(30, "mx3.example.com"),
        ])
    });

    let records = resolve_mx(&stub, "Example.com", &deadline()).expect("lookup succeeds");
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].preference, 10);
    assert_eq!(records[0].exchange, "mx1.example.com");
    assert_eq!(records[2].preference, 30);
}

#[test]
fn resolve_reports_missing_records() {
    let stub = StubResolver::new(|_| Ok(Vec::new()));
    let err = resolve_mx(&stub, "example.com", &deadline()).expect_err("no records");
    assert!(matches!(err, Error::NoRecords { ref domain } if domain == "example.com"));
}

#[test]
fn resolve_rejects_null_mx() {
    let stub = StubResolver::new(|_| Ok(vec![MxRecord::new(0, "")]));
    let err = resolve_mx(&stub, "example.com", &deadline()).expect_err("null MX");
    assert!(matches!(err, Error::NullMx { .. }));
}

#[test]
fn resolve_propagates_lookup_errors() {
    let err = resolve_mx(&StubResolver::empty(), "nowhere.test", &deadline())
        .expect_err("stub has no records");
    assert!(matches!(err, Error::NoRecords { .. }));
}

#[test]
fn normalize_exchange_trims_dot_and_lowercases() {
    let out = resolver::normalize_exchange("Mail.EXAMPLE.com.".to_string());
    assert_eq!(out, "mail.example.com");
    assert!(MxRecord::new(0, resolver::normalize_exchange(".".to_string())).is_null());
}

#[test]
fn system_resolver_refuses_expired_deadline() {
    let expired = Deadline::after(Duration::ZERO);
    let err = super::SystemResolver
        .lookup_mx("example.com", &expired)
        .expect_err("deadline already expired");
    assert!(matches!(err, Error::Expired(_)));
}
