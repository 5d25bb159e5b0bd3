use murmur_core::SessionId;

/// Outbound half of the network messaging layer.
///
/// Implemented by the host's networking code. Sessions call it only from
/// [`crate::PeerSession::poll`], on the host thread.
pub trait SignalingChannel: Send + Sync {
    /// Sends one serialized signaling message to the remote end of `session_id`.
    fn send(&self, session_id: &SessionId, message: String);
}
