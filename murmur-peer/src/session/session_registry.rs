use crate::session::peer_session::PeerSession;
use murmur_core::{PeerUuid, SessionId};
use std::collections::HashMap;
use tracing::{debug, info};

/// All sessions of one host, at most one per remote peer. Lives on the host
/// thread alongside the sessions it owns.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: HashMap<PeerUuid, PeerSession>,
    by_session: HashMap<SessionId, PeerUuid>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for `peer`, registering the one built by `create` if there
    /// is none yet.
    pub fn session_for(
        &mut self,
        peer: PeerUuid,
        create: impl FnOnce() -> PeerSession,
    ) -> &mut PeerSession {
        self.sessions.entry(peer).or_insert_with_key(|peer| {
            let session = create();
            info!(%peer, session = %session.session_id(), "registering session");
            self.by_session.insert(session.session_id(), peer.clone());
            session
        })
    }

    pub fn get(&self, peer: &PeerUuid) -> Option<&PeerSession> {
        self.sessions.get(peer)
    }

    pub fn by_session_id(&mut self, session_id: &SessionId) -> Option<&mut PeerSession> {
        let peer = self.by_session.get(session_id)?;
        self.sessions.get_mut(peer)
    }

    /// Routes one inbound message. Returns `false` if no session has that id.
    pub fn handle_incoming(&mut self, session_id: &SessionId, raw: &str) -> bool {
        match self.by_session_id(session_id) {
            Some(session) => {
                session.handle_incoming(raw);
                true
            }
            None => {
                debug!(%session_id, "no session for incoming message");
                false
            }
        }
    }

    pub fn poll_all(&mut self) {
        for session in self.sessions.values_mut() {
            session.poll();
        }
    }

    /// Unregisters and tears down the session for `peer`.
    pub async fn remove(&mut self, peer: &PeerUuid) -> bool {
        let Some(session) = self.sessions.remove(peer) else {
            return false;
        };
        self.by_session.remove(&session.session_id());
        session.teardown().await;
        true
    }

    pub async fn teardown_all(&mut self) {
        self.by_session.clear();
        for (_, session) in self.sessions.drain() {
            session.teardown().await;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
