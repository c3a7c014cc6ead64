use thiserror::Error;

/// Failures that abort a lifecycle handler.
///
/// Every variant maps to a structured status for the gateway; none of them
/// is retried.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("connection {0} not found")]
    ConnectionNotFound(String),

    #[error("found duplicate directory entries for connection {0}")]
    DuplicateConnection(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("failed to persist message: {0:#}")]
    Persistence(anyhow::Error),

    #[error("connection directory unavailable: {0:#}")]
    TransportSession(anyhow::Error),
}

impl RelayError {
    pub fn status_code(&self) -> u16 {
        match self {
            RelayError::Unauthorized(_) => 401,
            RelayError::ConnectionNotFound(_)
            | RelayError::DuplicateConnection(_)
            | RelayError::MalformedMessage(_) => 400,
            RelayError::Persistence(_) | RelayError::TransportSession(_) => 500,
        }
    }
}

/// Per-recipient push failure. Logged by the relay, never propagated.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("connection {0} is gone")]
    Stale(String),

    #[error("push to {connection_id} failed: {reason}")]
    Delivery {
        connection_id: String,
        reason: String,
    },
}
