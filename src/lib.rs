#![forbid(unsafe_code)]
//! mailprobe_lib: tells whether an email address is likely deliverable without
//! sending mail.
//!
//! Cheap local gates (syntax, disposable domains) run first; the full check then
//! resolves the domain's MX hosts and walks a partial SMTP dialogue up to
//! `RCPT TO`, all under a caller-supplied [`Deadline`].

pub mod check;
pub mod deadline;
pub mod disposable;
pub mod mx;
pub mod options;
pub mod probe;
pub mod result;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use check::{
    check, check_with_deadline, check_with_options, check_with_resolver, check_without_connect,
};
pub use deadline::{CANCEL_POLL_INTERVAL, CancelHandle, Deadline, Expiry};
pub use disposable::{is_disposable, is_disposable_domain};
pub use mx::{Error as MxError, LookupMx, MxRecord, SystemResolver, resolve_mx};
pub use options::{CheckOptions, DEFAULT_CHECK_TIMEOUT, DEFAULT_SMTP_PORT};
pub use probe::{ProbeError, SmtpReply, Stage, check_mailbox};
pub use result::{CheckOutcome, CheckResult, ResultCode, ResultState};
pub use validator::check_syntax;
