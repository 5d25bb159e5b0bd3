use crate::signaling::SignalingChannel;
use dashmap::DashMap;
use murmur_core::{PeerUuid, SessionId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A signaling message in flight between two peers of a [`LoopbackNetwork`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub session_id: SessionId,
    pub from: PeerUuid,
    pub message: String,
}

struct LoopbackInner {
    peers: DashMap<PeerUuid, mpsc::UnboundedSender<Envelope>>,
}

/// In-process network messaging layer. Every joined peer gets an inbox;
/// [`LoopbackChannel`]s deliver into the remote peer's inbox.
#[derive(Clone)]
pub struct LoopbackNetwork {
    inner: Arc<LoopbackInner>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(LoopbackInner {
                peers: DashMap::new(),
            }),
        }
    }

    /// Registers `peer` and returns its inbox. Joining again replaces the
    /// previous inbox.
    pub fn join(&self, peer: PeerUuid) -> mpsc::UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        debug!(%peer, "peer joined loopback network");
        self.inner.peers.insert(peer, tx);
        rx
    }

    pub fn leave(&self, peer: &PeerUuid) {
        if self.inner.peers.remove(peer).is_some() {
            debug!(%peer, "peer left loopback network");
        }
    }

    pub fn is_joined(&self, peer: &PeerUuid) -> bool {
        self.inner.peers.contains_key(peer)
    }

    pub fn deliver(&self, from: &PeerUuid, to: &PeerUuid, session_id: SessionId, message: String) {
        let Some(inbox) = self.inner.peers.get(to) else {
            warn!(%from, %to, %session_id, "dropping message for unknown peer");
            return;
        };

        let envelope = Envelope {
            session_id,
            from: from.clone(),
            message,
        };
        if inbox.send(envelope).is_err() {
            warn!(%to, "inbox of peer is closed");
        }
    }

    /// The channel `local` uses to reach `remote`.
    pub fn channel(&self, local: PeerUuid, remote: PeerUuid) -> LoopbackChannel {
        LoopbackChannel {
            network: self.clone(),
            local,
            remote,
        }
    }
}

impl Default for LoopbackNetwork {
    fn default() -> Self {
        Self::new()
    }
}

pub struct LoopbackChannel {
    network: LoopbackNetwork,
    local: PeerUuid,
    remote: PeerUuid,
}

impl SignalingChannel for LoopbackChannel {
    fn send(&self, session_id: &SessionId, message: String) {
        self.network
            .deliver(&self.local, &self.remote, *session_id, message);
    }
}
