use colored::*;
use murmur::model::{IceConnectionState, PeerConnectionState, PeerUuid, SessionId};
use murmur::peer::{Envelope, LoopbackNetwork, SessionListener, SessionRegistry};
use tokio::sync::mpsc;

/// One simulated application: a session registry, the inbox it reads from the
/// network, and nothing else. Ticked from the main thread.
pub struct Host {
    pub name: &'static str,
    pub peer: PeerUuid,
    pub registry: SessionRegistry,
    inbox: mpsc::UnboundedReceiver<Envelope>,
}

impl Host {
    pub fn join(name: &'static str, network: &LoopbackNetwork) -> Self {
        let peer = PeerUuid::from(name);
        Self {
            name,
            inbox: network.join(peer.clone()),
            peer,
            registry: SessionRegistry::new(),
        }
    }

    pub fn tick(&mut self) {
        self.registry.poll_all();
        while let Ok(envelope) = self.inbox.try_recv() {
            if !self
                .registry
                .handle_incoming(&envelope.session_id, &envelope.message)
            {
                tracing::warn!(host = self.name, session = %envelope.session_id, "message for unknown session");
            }
        }
    }
}

/// Prints every state transition of a session.
pub struct PrintingListener {
    host: &'static str,
}

impl PrintingListener {
    pub fn new(host: &'static str) -> Self {
        Self { host }
    }
}

impl SessionListener for PrintingListener {
    fn on_connection_state_change(&mut self, session_id: &SessionId, state: PeerConnectionState) {
        let state = match state {
            PeerConnectionState::Connected => state.to_string().green().bold(),
            PeerConnectionState::Failed | PeerConnectionState::Closed => {
                state.to_string().red().bold()
            }
            _ => state.to_string().yellow(),
        };
        println!(
            "{} {} connection {}",
            format!("[{}]", self.host).cyan(),
            session_id.to_string().dimmed(),
            state
        );
    }

    fn on_ice_connection_state_change(&mut self, session_id: &SessionId, state: IceConnectionState) {
        println!(
            "{} {} ice {}",
            format!("[{}]", self.host).cyan(),
            session_id.to_string().dimmed(),
            state.to_string().blue()
        );
    }
}
