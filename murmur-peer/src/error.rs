use murmur_core::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("webrtc: {0}")]
    WebRtc(#[from] webrtc::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("remote description rejected: {0}")]
    RemoteDescriptionRejected(String),

    #[error("audio source declared no formats")]
    NoAudioFormats,

    #[error("transport is closed")]
    TransportClosed,

    #[error("transport setup task did not complete: {0}")]
    SetupAborted(String),
}

pub type Result<T> = std::result::Result<T, Error>;
