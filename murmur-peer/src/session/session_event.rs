use murmur_core::{IceConnectionState, PeerConnectionState, SignalingMessage};
use tokio::sync::mpsc;
use tracing::debug;

/// A side effect produced off the host thread, applied by the next
/// [`crate::PeerSession::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ConnectionStateChanged(PeerConnectionState),
    IceConnectionStateChanged(IceConnectionState),
    /// A message to hand to the network messaging layer.
    Outbound(SignalingMessage),
}

/// Producer side of a session's event queue. Cheap to clone into transport
/// callbacks; pushing never blocks.
#[derive(Clone)]
pub(crate) struct EventBridge {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventBridge {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub(crate) fn push(&self, event: SessionEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!("session is gone, discarding {:?}", e.0);
        }
    }
}
