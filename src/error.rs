//! Error types for jmap-probe

use crate::protocol::MethodError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} was cancelled")]
    Cancelled { url: String },

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Could not parse {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected arguments for {method}: {source}")]
    TypeMismatch {
        method: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("No session: call discover first")]
    NoSession,

    #[error("Session advertises no primary mail account")]
    NoPrimaryAccount,

    #[error("Method-level JMAP error: {0}")]
    Method(MethodError),

    #[error("Invalid session: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for network, timeout and cancellation failures.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Cancelled { .. })
    }

    /// True only when the caller's cancellation token fired.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// The HTTP status code, for [`Error::HttpStatus`].
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
