use crate::error::Result;
use crate::session::session_event::{EventBridge, SessionEvent};
use crate::transport::Transport;
use murmur_core::{
    MessageType, SessionDescription, SessionId, SignalingMessage, SignalingState,
};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub(crate) struct HandshakeContext {
    pub(crate) session_id: SessionId,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) bridge: EventBridge,
    pub(crate) close_reason: String,
}

/// Host-side handle of a session's offer/answer state machine.
///
/// Messages are applied one at a time, in dispatch order, by a worker on the
/// session's runtime. The worker stops once this handle is dropped.
pub(crate) struct Handshake {
    tx: mpsc::UnboundedSender<SignalingMessage>,
}

impl Handshake {
    pub(crate) fn spawn(runtime: &Handle, ctx: HandshakeContext) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = HandshakeWorker {
            ctx,
            terminated: false,
        };
        runtime.spawn(worker.run(rx));
        Self { tx }
    }

    pub(crate) fn dispatch(&self, message: SignalingMessage) {
        if let Err(e) = self.tx.send(message) {
            debug!("handshake worker stopped, dropping {} message", e.0.kind());
        }
    }
}

struct HandshakeWorker {
    ctx: HandshakeContext,
    terminated: bool,
}

impl HandshakeWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<SignalingMessage>) {
        while let Some(message) = rx.recv().await {
            self.handle(message).await;
        }
        debug!(session = %self.ctx.session_id, "handshake worker finished");
    }

    async fn handle(&mut self, message: SignalingMessage) {
        if self.terminated {
            debug!(
                session = %self.ctx.session_id,
                "session failed, ignoring {} message",
                message.kind()
            );
            return;
        }

        match message.kind() {
            MessageType::Offer => self.handle_offer(&message).await,
            MessageType::IceCandidate => self.handle_ice_candidate(&message).await,
        }
    }

    async fn handle_offer(&mut self, message: &SignalingMessage) {
        let description = match message.session_description() {
            Ok(description) => description,
            Err(e) => {
                warn!(session = %self.ctx.session_id, "dropping malformed offer: {e}");
                return;
            }
        };

        if let Err(e) = self.ctx.transport.set_remote_description(description).await {
            error!(session = %self.ctx.session_id, "{e}");
            self.terminated = true;
            if let Err(e) = self.ctx.transport.close(&self.ctx.close_reason).await {
                warn!(session = %self.ctx.session_id, "failed to close transport: {e}");
            }
            return;
        }

        // An answer applied to our own offer lands back in stable.
        if self.ctx.transport.signaling_state() != SignalingState::HaveRemoteOffer {
            return;
        }

        match self.answer().await {
            Ok(message) => {
                info!(session = %self.ctx.session_id, "answer queued");
                self.ctx.bridge.push(SessionEvent::Outbound(message));
            }
            Err(e) => error!(session = %self.ctx.session_id, "failed to answer remote offer: {e}"),
        }
    }

    async fn answer(&self) -> Result<SignalingMessage> {
        let answer: SessionDescription = self.ctx.transport.create_answer().await?;
        self.ctx
            .transport
            .set_local_description(answer.clone())
            .await?;
        Ok(SignalingMessage::offer(&answer)?)
    }

    async fn handle_ice_candidate(&self, message: &SignalingMessage) {
        let candidate = match message.ice_candidate_init() {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(session = %self.ctx.session_id, "dropping malformed ICE candidate: {e}");
                return;
            }
        };

        if let Err(e) = self.ctx.transport.add_ice_candidate(candidate).await {
            warn!(session = %self.ctx.session_id, "failed to add remote ICE candidate: {e}");
        }
    }
}
