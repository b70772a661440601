//! Mailbox probe: a partial SMTP dialogue that never reaches `DATA`.
//!
//! [`check_mailbox`] walks the MX hosts in preference order. Each host gets one
//! [`SmtpSession`](session::SmtpSession): connect, greeting, `EHLO`/`HELO`,
//! `MAIL FROM`, `RCPT TO`, `QUIT`. Only the `RCPT TO` reply says anything about
//! the mailbox; failures earlier in the dialogue are blamed on the server.
//!
//! A network failure moves on to the next host. Every other classification ends
//! the walk, including a timeout: the remaining budget cannot fund another host.

mod error;
mod session;
mod types;

pub use error::ProbeError;
pub use session::DEFAULT_CONNECT_TIMEOUT;
pub use types::{SmtpReply, Stage};

use crate::deadline::Deadline;
use crate::mx::MxRecord;
use crate::options::CheckOptions;
use crate::result::{CheckOutcome, ResultCode};
use session::SmtpSession;

/// Probe `target` on `mx_hosts` (most preferred first), announcing `sender` as
/// the envelope sender. The whole walk is bounded by `deadline`.
pub fn check_mailbox(
    deadline: &Deadline,
    sender: &str,
    target: &str,
    mx_hosts: &[MxRecord],
    options: &CheckOptions,
) -> CheckOutcome {
    // both addresses are interpolated into command lines
    if !fits_command_line(target) {
        tracing::debug!(%target, "target address refused before connecting");
        return CheckOutcome::clean(ResultCode::InvalidSyntax);
    }
    if !fits_command_line(sender) {
        tracing::warn!(%sender, "sender address refused before connecting");
        return CheckOutcome::from_error(ProbeError::InvalidSender {
            sender: sender.to_string(),
        });
    }

    let mut last_network_failure = None;
    for host in mx_hosts {
        let outcome = probe_host(deadline, sender, target, &host.exchange, options);
        if outcome.code() != ResultCode::NetworkError {
            tracing::info!(
                exchange = %host.exchange,
                code = %outcome.code(),
                error = outcome.error().map(tracing::field::display),
                "mailbox probe finished"
            );
            return outcome;
        }
        tracing::debug!(
            exchange = %host.exchange,
            error = outcome.error().map(tracing::field::display),
            "mail exchanger unreachable"
        );
        last_network_failure = Some(outcome);
    }

    last_network_failure.unwrap_or_else(|| CheckOutcome::from_error(ProbeError::NoHosts))
}

fn fits_command_line(address: &str) -> bool {
    !address.contains(['\r', '\n', '<', '>'])
}

fn probe_host(
    deadline: &Deadline,
    sender: &str,
    target: &str,
    exchange: &str,
    options: &CheckOptions,
) -> CheckOutcome {
    match run_dialogue(deadline, sender, target, exchange, options) {
        Ok(code) => CheckOutcome::clean(code),
        Err(err) => CheckOutcome::from_error(err),
    }
}

fn run_dialogue(
    deadline: &Deadline,
    sender: &str,
    target: &str,
    exchange: &str,
    options: &CheckOptions,
) -> Result<ResultCode, ProbeError> {
    let mut session = SmtpSession::connect(exchange, options.port, deadline)?;
    session.greeting()?;
    session.hello(options.helo_name())?;

    let mail = session.command(Stage::MailFrom, &format!("MAIL FROM:<{sender}>"))?;
    if !mail.is_success() {
        return Err(ProbeError::Rejected {
            stage: Stage::MailFrom,
            reply: mail,
        });
    }

    let rcpt = session.command(Stage::RcptTo, &format!("RCPT TO:<{target}>"))?;
    if !rcpt.is_success() {
        tracing::debug!(
            %exchange,
            stage = %session.stage(),
            reply = session.last_reply().map(tracing::field::display),
            "recipient rejected"
        );
        session.abandon();
        return Ok(ResultCode::MailboxUnavailable);
    }

    session.quit()?;
    Ok(ResultCode::Valid)
}
