use crate::error::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use murmur_core::{
    AudioFormat, EncodedSample, IceCandidateInit, IceConnectionState, MediaKind,
    MediaSessionStats, PeerConnectionState, RtpPacket, SessionDescription, SignalingState,
};
use std::sync::Arc;

pub type ConnectionStateHandler = Box<dyn Fn(PeerConnectionState) + Send + Sync>;
pub type IceConnectionStateHandler = Box<dyn Fn(IceConnectionState) + Send + Sync>;
pub type IceCandidateHandler = Box<dyn Fn(IceCandidateInit) + Send + Sync>;
pub type AudioFormatsHandler = Box<dyn Fn(&[AudioFormat]) + Send + Sync>;
pub type RtpPacketHandler = Box<dyn Fn(MediaKind, RtpPacket) + Send + Sync>;

/// The pending result of an external transport factory. The session awaits it
/// once, on its background runtime.
pub type TransportTask = BoxFuture<'static, Result<Arc<dyn Transport>>>;

/// A media transport between two peers.
///
/// Sessions never construct transports themselves; they receive one from a
/// [`TransportTask`]. Handlers registered with the `on_*` methods are invoked
/// from the transport's own threads and must not block.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Adds an outbound audio track able to carry any of `formats`, in
    /// preference order.
    async fn add_audio_track(&self, formats: &[AudioFormat]) -> Result<()>;

    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;

    /// Fails with [`crate::Error::RemoteDescriptionRejected`] when the
    /// description cannot be applied.
    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<()>;

    async fn close(&self, reason: &str) -> Result<()>;

    fn signaling_state(&self) -> SignalingState;

    /// Hot path: called from the audio pipeline's thread for every encoded frame.
    fn send_audio(&self, sample: EncodedSample);

    /// Live counters for one media kind, or `None` when the transport has no
    /// session of that kind.
    fn session_stats(&self, kind: MediaKind) -> Option<MediaSessionStats>;

    fn on_connection_state_change(&self, handler: ConnectionStateHandler);

    fn on_ice_connection_state_change(&self, handler: IceConnectionStateHandler);

    fn on_ice_candidate(&self, handler: IceCandidateHandler);

    fn on_audio_formats_negotiated(&self, handler: AudioFormatsHandler);

    fn on_rtp_packet(&self, handler: RtpPacketHandler);
}
