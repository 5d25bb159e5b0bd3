use crate::error::CodecError;
use crate::model::description::{IceCandidateInit, SessionDescription};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag carried in the `type` field of every signaling message.
///
/// There is no `Answer` tag: answers travel as `Offer` and the receiver tells
/// them apart by its own signaling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Offer,
    IceCandidate,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Offer => f.write_str("Offer"),
            MessageType::IceCandidate => f.write_str("IceCandidate"),
        }
    }
}

/// A signaling message as exchanged over the network messaging layer:
/// `{ "type": "Offer" | "IceCandidate", "args": "<serialized payload>" }`.
///
/// `args` is itself a JSON document (a session description or an ICE
/// candidate) carried as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalingMessage {
    #[serde(rename = "type")]
    kind: MessageType,
    args: String,
}

impl SignalingMessage {
    pub fn new(kind: MessageType, args: impl Into<String>) -> Self {
        Self {
            kind,
            args: args.into(),
        }
    }

    /// Wraps a local offer or answer.
    pub fn offer(description: &SessionDescription) -> Result<Self, CodecError> {
        let args = serde_json::to_string(description).map_err(CodecError::Encode)?;
        Ok(Self::new(MessageType::Offer, args))
    }

    pub fn ice_candidate(candidate: &IceCandidateInit) -> Result<Self, CodecError> {
        let args = serde_json::to_string(candidate).map_err(CodecError::Encode)?;
        Ok(Self::new(MessageType::IceCandidate, args))
    }

    pub fn decode(raw: &str) -> Result<Self, CodecError> {
        serde_json::from_str(raw).map_err(CodecError::Message)
    }

    pub fn encode(&self) -> Result<String, CodecError> {
        serde_json::to_string(self).map_err(CodecError::Encode)
    }

    pub fn kind(&self) -> MessageType {
        self.kind
    }

    pub fn args(&self) -> &str {
        &self.args
    }

    pub fn session_description(&self) -> Result<SessionDescription, CodecError> {
        self.expect(MessageType::Offer)?;
        serde_json::from_str(&self.args).map_err(CodecError::Description)
    }

    pub fn ice_candidate_init(&self) -> Result<IceCandidateInit, CodecError> {
        self.expect(MessageType::IceCandidate)?;
        serde_json::from_str(&self.args).map_err(CodecError::Candidate)
    }

    fn expect(&self, expected: MessageType) -> Result<(), CodecError> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(CodecError::UnexpectedType {
                expected,
                actual: self.kind,
            })
        }
    }
}
