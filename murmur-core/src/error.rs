use crate::model::MessageType;
use thiserror::Error;

/// Failures turning wire text into signaling values and back.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed signaling message: {0}")]
    Message(#[source] serde_json::Error),

    #[error("malformed session description: {0}")]
    Description(#[source] serde_json::Error),

    #[error("malformed ice candidate: {0}")]
    Candidate(#[source] serde_json::Error),

    #[error("failed to encode signaling payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("expected a {expected} message, got {actual}")]
    UnexpectedType {
        expected: MessageType,
        actual: MessageType,
    },
}
