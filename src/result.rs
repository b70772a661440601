//! Classification model shared by every check entry point.

use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::probe::ProbeError;

/// Coarse verdict derived from a [`ResultCode`].
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultState {
    Valid,
    Invalid,
    Error,
}

impl ResultState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ResultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of check classifications. Each variant owns its state and detail text.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// The mail server accepted the recipient.
    Valid,
    /// Syntax and disposable gates passed; no connection was made.
    ValidWithoutTestConnect,
    InvalidSyntax,
    InvalidDomain,
    Disposable,
    /// The mail server rejected the recipient at `RCPT TO`.
    MailboxUnavailable,
    MailserverError,
    NetworkError,
    TimeoutError,
}

impl ResultCode {
    pub const ALL: [ResultCode; 9] = [
        Self::Valid,
        Self::ValidWithoutTestConnect,
        Self::InvalidSyntax,
        Self::InvalidDomain,
        Self::Disposable,
        Self::MailboxUnavailable,
        Self::MailserverError,
        Self::NetworkError,
        Self::TimeoutError,
    ];

    pub const fn state(self) -> ResultState {
        match self {
            Self::Valid | Self::ValidWithoutTestConnect => ResultState::Valid,
            Self::InvalidSyntax
            | Self::InvalidDomain
            | Self::Disposable
            | Self::MailboxUnavailable => ResultState::Invalid,
            Self::MailserverError | Self::NetworkError | Self::TimeoutError => ResultState::Error,
        }
    }

    pub const fn detail(self) -> &'static str {
        match self {
            Self::Valid => "The email address is valid.",
            Self::ValidWithoutTestConnect => {
                "The email address syntax is valid; the mailbox was not tested."
            }
            Self::InvalidSyntax => "The email format is invalid.",
            Self::InvalidDomain => "The email domain does not exist or has no mail server.",
            Self::Disposable => "The email is a throw-away address.",
            Self::MailboxUnavailable => "The email username does not exist.",
            Self::MailserverError => "The target mail server responded with an error.",
            Self::NetworkError => "The connection to the mail server failed.",
            Self::TimeoutError => "The connection to the mail server timed out.",
        }
    }

    /// Stable machine-readable identifier.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::ValidWithoutTestConnect => "validWithoutTestConnect",
            Self::InvalidSyntax => "invalidSyntax",
            Self::InvalidDomain => "invalidDomain",
            Self::Disposable => "disposable",
            Self::MailboxUnavailable => "mailboxUnavailable",
            Self::MailserverError => "mailserverError",
            Self::NetworkError => "networkError",
            Self::TimeoutError => "timeoutError",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable classification of one check. Only constructible from a [`ResultCode`],
/// so `state` and `detail` always agree with `code`.
#[cfg_attr(feature = "with-serde", derive(Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CheckResult {
    code: ResultCode,
    state: ResultState,
    detail: &'static str,
}

impl CheckResult {
    pub const fn new(code: ResultCode) -> Self {
        Self {
            code,
            state: code.state(),
            detail: code.detail(),
        }
    }

    pub fn code(&self) -> ResultCode {
        self.code
    }

    pub fn state(&self) -> ResultState {
        self.state
    }

    pub fn detail(&self) -> &'static str {
        self.detail
    }

    pub fn is_valid(&self) -> bool {
        self.state == ResultState::Valid
    }

    pub fn is_invalid(&self) -> bool {
        self.state == ResultState::Invalid
    }

    pub fn is_error(&self) -> bool {
        self.state == ResultState::Error
    }
}

impl From<ResultCode> for CheckResult {
    fn from(code: ResultCode) -> Self {
        Self::new(code)
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.code, self.state, self.detail)
    }
}

/// What every check returns: the classification plus, for error outcomes, the
/// underlying cause.
#[derive(Debug)]
pub struct CheckOutcome {
    result: CheckResult,
    error: Option<ProbeError>,
}

impl CheckOutcome {
    /// An outcome without an underlying cause (valid and invalid classifications).
    pub fn clean(code: ResultCode) -> Self {
        Self {
            result: CheckResult::new(code),
            error: None,
        }
    }

    pub fn failed(code: ResultCode, error: ProbeError) -> Self {
        Self {
            result: CheckResult::new(code),
            error: Some(error),
        }
    }

    /// Builds an outcome from a probe failure, using the code the error maps to.
    pub fn from_error(error: ProbeError) -> Self {
        Self::failed(error.result_code(), error)
    }

    pub fn result(&self) -> CheckResult {
        self.result
    }

    pub fn code(&self) -> ResultCode {
        self.result.code
    }

    pub fn state(&self) -> ResultState {
        self.result.state
    }

    pub fn error(&self) -> Option<&ProbeError> {
        self.error.as_ref()
    }

    pub fn into_parts(self) -> (CheckResult, Option<ProbeError>) {
        (self.result, self.error)
    }
}
