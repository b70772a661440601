//! Check orchestrator: gates first, then the resolver, then the mailbox probe.
//!
//! The order is fixed. Syntax costs nothing and always runs first, the
//! disposable-domain lookup is next, network work comes last.

use crate::deadline::Deadline;
use crate::disposable::is_disposable;
use crate::mx::{self, LookupMx, SystemResolver, resolve_mx};
use crate::options::CheckOptions;
use crate::probe::{ProbeError, Stage, check_mailbox};
use crate::result::{CheckOutcome, ResultCode};
use crate::validator::{check_syntax, domain_of};

/// Runs the local gates only. Never touches the network: a well-formed,
/// non-disposable address is `ValidWithoutTestConnect` even if its domain
/// does not resolve.
pub fn check_without_connect(address: &str) -> CheckOutcome {
    match gate(address) {
        Some(code) => CheckOutcome::clean(code),
        None => CheckOutcome::clean(ResultCode::ValidWithoutTestConnect),
    }
}

/// Full check with default options, bounded by [`CheckOptions::timeout`].
pub fn check(sender: &str, target: &str) -> CheckOutcome {
    let options = CheckOptions::default();
    let deadline = Deadline::after(options.timeout);
    check_with_options(&deadline, sender, target, &options)
}

/// Full check with default options under the caller's deadline.
pub fn check_with_deadline(deadline: &Deadline, sender: &str, target: &str) -> CheckOutcome {
    check_with_options(deadline, sender, target, &CheckOptions::default())
}

/// Full check using the system resolver.
pub fn check_with_options(
    deadline: &Deadline,
    sender: &str,
    target: &str,
    options: &CheckOptions,
) -> CheckOutcome {
    check_with_resolver(deadline, sender, target, options, &SystemResolver)
}

/// Full check with a caller-provided MX source.
///
/// Gate and resolver failures come back without an error value; the probe's
/// outcome is returned as is. Running out of time before or during the MX
/// lookup is a `TimeoutError`, not a verdict on the domain.
pub fn check_with_resolver<R>(
    deadline: &Deadline,
    sender: &str,
    target: &str,
    options: &CheckOptions,
    resolver: &R,
) -> CheckOutcome
where
    R: LookupMx + ?Sized,
{
    if let Some(code) = gate(target) {
        return CheckOutcome::clean(code);
    }

    // the syntax gate guarantees a domain
    let Some(domain) = domain_of(target) else {
        return CheckOutcome::clean(ResultCode::InvalidSyntax);
    };
    if let Err(expiry) = deadline.check() {
        return CheckOutcome::from_error(ProbeError::expired(Stage::Resolve, expiry));
    }
    let hosts = match resolve_mx(resolver, domain, deadline) {
        Ok(hosts) => hosts,
        Err(mx::Error::Expired(expiry)) => {
            return CheckOutcome::from_error(ProbeError::expired(Stage::Resolve, expiry));
        }
        Err(err) => {
            // a lookup cut short by the budget says nothing about the domain
            if let Err(expiry) = deadline.check() {
                tracing::debug!(%domain, error = %err, "MX lookup ran out of time");
                return CheckOutcome::from_error(ProbeError::expired(Stage::Resolve, expiry));
            }
            match &err {
                mx::Error::ResolverInit { .. } => {
                    tracing::warn!(%domain, error = %err, "resolver unavailable")
                }
                _ => tracing::debug!(%domain, error = %err, "domain has no usable MX"),
            }
            return CheckOutcome::clean(ResultCode::InvalidDomain);
        }
    };

    check_mailbox(deadline, sender, target, &hosts, options)
}

fn gate(address: &str) -> Option<ResultCode> {
    if !check_syntax(address) {
        tracing::debug!(%address, "syntax gate refused address");
        return Some(ResultCode::InvalidSyntax);
    }
    if is_disposable(address) {
        tracing::debug!(%address, "disposable domain");
        return Some(ResultCode::Disposable);
    }
    None
}
