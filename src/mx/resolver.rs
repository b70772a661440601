use std::time::Duration;

use trust_dns_resolver::Resolver;
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::system_conf::read_system_conf;

use super::{Error, MxRecord};
use crate::deadline::Deadline;

/// Lookup timeout used when the caller's deadline has no expiry.
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of MX records. `domain` is already ASCII and lower-case.
///
/// An empty `Vec` means the domain exists but publishes no MX records.
pub trait LookupMx {
    fn lookup_mx(&self, domain: &str, deadline: &Deadline) -> Result<Vec<MxRecord>, Error>;
}

/// Resolver built from the host's resolver configuration on every lookup.
///
/// The lookup makes a single attempt whose timeout is the deadline's remaining
/// budget.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl LookupMx for SystemResolver {
    fn lookup_mx(&self, domain: &str, deadline: &Deadline) -> Result<Vec<MxRecord>, Error> {
        let timeout = deadline
            .budget_or(DEFAULT_DNS_TIMEOUT)
            .map_err(Error::Expired)?;
        let (config, mut opts) = read_system_conf().map_err(Error::resolver_init)?;
        opts.timeout = timeout;
        opts.attempts = 1;
        let resolver = Resolver::new(config, opts).map_err(Error::resolver_init)?;

        let lookup = match resolver.mx_lookup(domain) {
            Ok(lookup) => lookup,
            Err(err) => match err.kind() {
                ResolveErrorKind::NoRecordsFound { .. } => return Ok(Vec::new()),
                _ => return Err(Error::lookup(err)),
            },
        };
        Ok(lookup
            .iter()
            .map(|mx| MxRecord::new(mx.preference(), normalize_exchange(mx.exchange().to_utf8())))
            .collect())
    }
}

/// Resolve `domain` to its mail exchangers, most preferred first.
///
/// Null MX entries are dropped; a domain left with no usable exchanger is an error.
pub fn resolve_mx<R>(
    resolver: &R,
    domain: &str,
    deadline: &Deadline,
) -> Result<Vec<MxRecord>, Error>
where
    R: LookupMx + ?Sized,
{
    let ascii = normalize_domain(domain)?;
    let mut records = resolver.lookup_mx(&ascii, deadline)?;
    let published = !records.is_empty();

    records.retain(|record| !record.is_null());
    records.sort();
    records.dedup();

    if records.is_empty() {
        return Err(if published {
            Error::NullMx { domain: ascii }
        } else {
            Error::NoRecords { domain: ascii }
        });
    }
    tracing::debug!(domain = %ascii, count = records.len(), "resolved MX records");
    Ok(records)
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, Error> {
    let trimmed = domain.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return Err(Error::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(Error::idna)
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}
