use crate::audio::{AudioSink, AudioSource};
use crate::error::{Error, Result};
use crate::session::handshake::{Handshake, HandshakeContext};
use crate::session::inbound_buffer::InboundBuffer;
use crate::session::session_config::SessionConfig;
use crate::session::session_event::{EventBridge, SessionEvent};
use crate::session::session_listener::{ListenerId, SessionListener};
use crate::session::setup::{SetupContext, run_setup};
use crate::signaling::SignalingChannel;
use crate::transport::{Transport, TransportTask};
use futures::FutureExt;
use murmur_core::{
    IceConnectionState, MediaKind, PeerConnectionState, PeerUuid, Role, SessionId,
    SignalingMessage, StatisticsSnapshot,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const TEARDOWN_REASON: &str = "Session torn down";

enum SetupState {
    NotStarted,
    Pending(JoinHandle<Result<Arc<dyn Transport>>>),
    Ready(Arc<dyn Transport>),
    Failed,
}

/// One peer-to-peer voice relationship, driven from a single host thread.
///
/// Transport work happens on the tokio runtime behind `runtime`; everything
/// the host can observe (state fields, listener notifications, outbound
/// signaling) changes only inside [`PeerSession::poll`].
///
/// ```ignore
/// let mut session = PeerSession::new(session_id, network, runtime.handle().clone());
/// session.setup(peer, Role::Impolite, source, sink, factory.create());
/// loop {
///     session.poll();
///     // ... one frame of host work ...
/// }
/// ```
pub struct PeerSession {
    session_id: SessionId,
    peer_uuid: Option<PeerUuid>,
    role: Option<Role>,
    config: SessionConfig,
    network: Arc<dyn SignalingChannel>,
    runtime: Handle,
    bridge: EventBridge,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    setup: SetupState,
    handshake: Option<Handshake>,
    inbound: InboundBuffer,
    listeners: Vec<(ListenerId, Box<dyn SessionListener>)>,
    next_listener_id: u64,
    ice_connection_state: IceConnectionState,
    connection_state: PeerConnectionState,
}

impl PeerSession {
    /// Creates an idle session. It already accepts incoming messages and
    /// buffers them until [`PeerSession::setup`] has produced a transport.
    pub fn new(session_id: SessionId, network: Arc<dyn SignalingChannel>, runtime: Handle) -> Self {
        let (bridge, events) = EventBridge::channel();
        Self {
            session_id,
            peer_uuid: None,
            role: None,
            config: SessionConfig::default(),
            network,
            runtime,
            bridge,
            events,
            setup: SetupState::NotStarted,
            handshake: None,
            inbound: InboundBuffer::default(),
            listeners: Vec::new(),
            next_listener_id: 0,
            ice_connection_state: IceConnectionState::default(),
            connection_state: PeerConnectionState::default(),
        }
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Starts the one-time setup on the runtime. Returns immediately; calls
    /// after the first are ignored.
    pub fn setup(
        &mut self,
        peer_uuid: PeerUuid,
        role: Role,
        audio_source: Arc<dyn AudioSource>,
        audio_sink: Arc<dyn AudioSink>,
        transport: TransportTask,
    ) {
        if !matches!(self.setup, SetupState::NotStarted) {
            debug!(session = %self.session_id, "setup already started");
            return;
        }

        info!(session = %self.session_id, peer = %peer_uuid, %role, "starting session setup");

        let ctx = SetupContext {
            session_id: self.session_id,
            peer_uuid: peer_uuid.clone(),
            role,
            audio_source,
            audio_sink,
            bridge: self.bridge.clone(),
        };
        self.peer_uuid = Some(peer_uuid);
        self.role = Some(role);
        self.setup = SetupState::Pending(self.runtime.spawn(run_setup(ctx, transport)));
    }

    /// Inbound entry point for one serialized signaling message.
    pub fn handle_incoming(&mut self, raw: &str) {
        match SignalingMessage::decode(raw) {
            Ok(message) => self.dispatch(message),
            Err(e) => warn!(session = %self.session_id, "dropping malformed signaling message: {e}"),
        }
    }

    fn dispatch(&mut self, message: SignalingMessage) {
        if let Some(handshake) = &self.handshake {
            handshake.dispatch(message);
        } else if matches!(self.setup, SetupState::Failed) {
            debug!(session = %self.session_id, "setup failed, dropping {} message", message.kind());
        } else {
            self.inbound.push(message);
        }
    }

    /// One host tick: applies queued events, picks up a finished setup, then
    /// replays buffered messages.
    pub fn poll(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.apply(event);
        }
        self.observe_setup();
        self.drain_inbound();
    }

    fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::ConnectionStateChanged(state) => {
                debug!(session = %self.session_id, %state, "connection state changed");
                self.connection_state = state;
                for (_, listener) in &mut self.listeners {
                    listener.on_connection_state_change(&self.session_id, state);
                }
            }
            SessionEvent::IceConnectionStateChanged(state) => {
                debug!(session = %self.session_id, %state, "ICE connection state changed");
                self.ice_connection_state = state;
                for (_, listener) in &mut self.listeners {
                    listener.on_ice_connection_state_change(&self.session_id, state);
                }
            }
            SessionEvent::Outbound(message) => match message.encode() {
                Ok(raw) => self.network.send(&self.session_id, raw),
                Err(e) => error!(session = %self.session_id, "failed to encode {} message: {e}", message.kind()),
            },
        }
    }

    fn observe_setup(&mut self) {
        let SetupState::Pending(task) = &mut self.setup else {
            return;
        };
        if !task.is_finished() {
            return;
        }
        let outcome = match task.now_or_never() {
            Some(Ok(outcome)) => outcome,
            Some(Err(e)) => Err(Error::SetupAborted(e.to_string())),
            None => return,
        };

        match outcome {
            Ok(transport) => {
                info!(session = %self.session_id, "session setup complete");
                self.handshake = Some(Handshake::spawn(
                    &self.runtime,
                    HandshakeContext {
                        session_id: self.session_id,
                        transport: transport.clone(),
                        bridge: self.bridge.clone(),
                        close_reason: self.config.close_reason.clone(),
                    },
                ));
                self.setup = SetupState::Ready(transport);
            }
            Err(e) => {
                let dropped = self.inbound.clear();
                error!(session = %self.session_id, dropped, "session setup failed: {e}");
                self.setup = SetupState::Failed;
            }
        }
    }

    fn drain_inbound(&mut self) {
        let Some(handshake) = &self.handshake else {
            return;
        };
        for message in self.inbound.drain() {
            handshake.dispatch(message);
        }
    }

    /// Live counters of the transport's media sessions; zeros for anything
    /// that does not exist yet.
    pub fn statistics(&self) -> StatisticsSnapshot {
        let SetupState::Ready(transport) = &self.setup else {
            return StatisticsSnapshot::default();
        };
        StatisticsSnapshot {
            audio: transport.session_stats(MediaKind::Audio).unwrap_or_default(),
            video: transport.session_stats(MediaKind::Video).unwrap_or_default(),
        }
    }

    /// True once a poll has observed the setup task complete.
    pub fn is_setup(&self) -> bool {
        matches!(self.setup, SetupState::Ready(_))
    }

    pub fn ice_connection_state(&self) -> IceConnectionState {
        self.ice_connection_state
    }

    pub fn connection_state(&self) -> PeerConnectionState {
        self.connection_state
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn peer_uuid(&self) -> Option<&PeerUuid> {
        self.peer_uuid.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    pub fn add_listener(&mut self, listener: impl SessionListener + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Waits for a pending setup (at most [`SessionConfig::teardown_timeout`])
    /// and closes the transport.
    pub async fn teardown(mut self) {
        let setup = std::mem::replace(&mut self.setup, SetupState::NotStarted);
        self.handshake = None;
        close_transport(setup, self.session_id, self.config.teardown_timeout).await;
    }
}

impl Drop for PeerSession {
    fn drop(&mut self) {
        let setup = std::mem::replace(&mut self.setup, SetupState::NotStarted);
        if matches!(setup, SetupState::NotStarted | SetupState::Failed) {
            return;
        }
        self.handshake = None;
        self.runtime.spawn(close_transport(
            setup,
            self.session_id,
            self.config.teardown_timeout,
        ));
    }
}

async fn close_transport(setup: SetupState, session_id: SessionId, timeout: Duration) {
    let transport = match setup {
        SetupState::NotStarted | SetupState::Failed => return,
        SetupState::Ready(transport) => transport,
        SetupState::Pending(task) => {
            let abort = task.abort_handle();
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(Ok(transport))) => transport,
                Ok(Ok(Err(e))) => {
                    debug!(%session_id, "setup had failed: {e}");
                    return;
                }
                Ok(Err(e)) => {
                    warn!(%session_id, "setup task aborted: {e}");
                    return;
                }
                Err(_) => {
                    warn!(%session_id, ?timeout, "setup still pending at teardown, abandoning it");
                    abort.abort();
                    return;
                }
            }
        }
    };

    if let Err(e) = transport.close(TEARDOWN_REASON).await {
        warn!(%session_id, "failed to close transport: {e}");
    }
    info!(%session_id, "session torn down");
}
