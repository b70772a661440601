use std::io;

use thiserror::Error;

use super::types::{SmtpReply, Stage};
use crate::deadline::Expiry;
use crate::result::ResultCode;

/// Underlying cause attached to every error-state outcome.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("no mail exchanger to probe")]
    NoHosts,
    /// The envelope sender cannot be put on a command line.
    #[error("sender address {sender:?} contains line breaks or angle brackets")]
    InvalidSender { sender: String },
    #[error("could not resolve mail exchanger {host}: {source}")]
    HostLookup {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("connection to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("deadline exceeded during {stage}")]
    DeadlineExceeded { stage: Stage },
    #[error("check cancelled during {stage}")]
    Cancelled { stage: Stage },
    #[error("I/O error during {stage}: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: io::Error,
    },
    #[error("connection closed by server during {stage}")]
    ConnectionClosed { stage: Stage },
    #[error("malformed reply during {stage}: {detail}")]
    Protocol { stage: Stage, detail: String },
    #[error("{stage} rejected: {reply}")]
    Rejected { stage: Stage, reply: SmtpReply },
}

impl ProbeError {
    pub(crate) fn expired(stage: Stage, expiry: Expiry) -> Self {
        match expiry {
            Expiry::Elapsed => Self::DeadlineExceeded { stage },
            Expiry::Cancelled => Self::Cancelled { stage },
        }
    }

    /// Classification reported alongside this error.
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::NoHosts | Self::HostLookup { .. } | Self::Connect { .. } => {
                ResultCode::NetworkError
            }
            Self::DeadlineExceeded { .. } | Self::Cancelled { .. } => ResultCode::TimeoutError,
            Self::Io { .. }
            | Self::ConnectionClosed { .. }
            | Self::Protocol { .. }
            | Self::Rejected { .. }
            | Self::InvalidSender { .. } => ResultCode::MailserverError,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. } | Self::Cancelled { .. })
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::NoHosts => None,
            Self::HostLookup { .. } | Self::Connect { .. } => Some(Stage::Connect),
            Self::InvalidSender { .. } => Some(Stage::MailFrom),
            Self::DeadlineExceeded { stage }
            | Self::Cancelled { stage }
            | Self::Io { stage, .. }
            | Self::ConnectionClosed { stage }
            | Self::Protocol { stage, .. }
            | Self::Rejected { stage, .. } => Some(*stage),
        }
    }
}
