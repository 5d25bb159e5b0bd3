mod audio;
mod description;
mod peer;
mod signaling;
mod state;
mod statistics;

pub use audio::{AudioFormat, EncodedSample, RtpPacket};
pub use description::{IceCandidateInit, SdpType, SessionDescription};
pub use peer::{PeerUuid, SessionId};
pub use signaling::{MessageType, SignalingMessage};
pub use state::{IceConnectionState, PeerConnectionState, Role, SignalingState};
pub use statistics::{MediaKind, MediaSessionStats, StatisticsSnapshot};
