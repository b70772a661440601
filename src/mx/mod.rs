//! Domain resolver: DNS MX lookup through the system resolver.
//!
//! [`resolve_mx`] normalises the domain, asks a [`LookupMx`] implementation for
//! records and returns them ordered by preference. [`SystemResolver`] is the
//! production implementation; tests and callers can plug in their own.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{DEFAULT_DNS_TIMEOUT, LookupMx, SystemResolver, resolve_mx};
pub use types::MxRecord;

#[cfg(test)]
pub(crate) mod tests;
