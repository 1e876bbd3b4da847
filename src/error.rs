//! Error taxonomy shared by every layer of the client.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced to callers of the client.
///
/// Lower layers never swallow faults: whatever an executor reports reaches the
/// caller unchanged, with the local path having already rolled back.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No usable connection target could be built, or the handle was closed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A statement failed on the backend.
    #[error("query failed: {message}")]
    Query {
        /// HTTP status when the remote endpoint rejected the call.
        status: Option<u16>,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A domain lookup found nothing.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// The remote endpoint answered with a body we cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ClientError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Non-2xx answer from the remote endpoint; the body is kept verbatim.
    pub(crate) fn http_status(status: u16, body: String) -> Self {
        Self::Query {
            status: Some(status),
            message: format!("{} - {}", status, body),
            source: None,
        }
    }

    pub(crate) fn transport(err: reqwest::Error) -> Self {
        Self::Query {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    pub(crate) fn engine(err: rusqlite::Error) -> Self {
        Self::Query {
            status: None,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// HTTP status attached to a remote query failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Query { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
