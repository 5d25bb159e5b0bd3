use crate::audio::{AudioSink, AudioSource};
use crate::error::Result;
use crate::session::session_event::{EventBridge, SessionEvent};
use crate::transport::{Transport, TransportTask};
use murmur_core::{MediaKind, PeerUuid, Role, SessionId, SignalingMessage};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SETUP_FAILED_REASON: &str = "Session setup failed";

pub(crate) struct SetupContext {
    pub(crate) session_id: SessionId,
    pub(crate) peer_uuid: PeerUuid,
    pub(crate) role: Role,
    pub(crate) audio_source: Arc<dyn AudioSource>,
    pub(crate) audio_sink: Arc<dyn AudioSink>,
    pub(crate) bridge: EventBridge,
}

/// One-time wiring of a freshly built transport. Runs on the session's
/// runtime; the host only ever sees the transport once this has returned.
pub(crate) async fn run_setup(
    ctx: SetupContext,
    transport: TransportTask,
) -> Result<Arc<dyn Transport>> {
    let transport = transport.await?;
    debug!(session = %ctx.session_id, peer = %ctx.peer_uuid, "transport ready, wiring");

    // Past this point the transport is ours: close it on any failure.
    if let Err(e) = wire_transport(&ctx, &transport).await {
        if let Err(close_err) = transport.close(SETUP_FAILED_REASON).await {
            warn!(session = %ctx.session_id, "failed to close transport after setup error: {close_err}");
        }
        return Err(e);
    }

    Ok(transport)
}

async fn wire_transport(ctx: &SetupContext, transport: &Arc<dyn Transport>) -> Result<()> {
    transport.add_audio_track(&ctx.audio_source.formats()).await?;

    let source = ctx.audio_source.clone();
    transport.on_audio_formats_negotiated(Box::new(move |formats| {
        if let Some(format) = formats.first() {
            source.set_format(format.clone());
        }
    }));

    // Straight to the transport: encoded frames must not wait for a poll tick.
    let sender = Arc::downgrade(transport);
    ctx.audio_source.on_encoded_sample(Box::new(move |sample| {
        if let Some(transport) = sender.upgrade() {
            transport.send_audio(sample);
        }
    }));

    let sink = ctx.audio_sink.clone();
    transport.on_rtp_packet(Box::new(move |kind, packet| {
        if kind == MediaKind::Audio {
            sink.receive_rtp(packet);
        }
    }));

    let bridge = ctx.bridge.clone();
    transport.on_connection_state_change(Box::new(move |state| {
        bridge.push(SessionEvent::ConnectionStateChanged(state));
    }));

    let bridge = ctx.bridge.clone();
    transport.on_ice_connection_state_change(Box::new(move |state| {
        bridge.push(SessionEvent::IceConnectionStateChanged(state));
    }));

    let bridge = ctx.bridge.clone();
    let observed = Arc::downgrade(transport);
    let session_id = ctx.session_id;
    transport.on_ice_candidate(Box::new(move |candidate| {
        let Some(transport) = observed.upgrade() else {
            return;
        };
        let state = transport.signaling_state();
        if !state.allows_candidate_forwarding() {
            debug!(session = %session_id, %state, "not forwarding local ICE candidate");
            return;
        }
        match SignalingMessage::ice_candidate(&candidate) {
            Ok(message) => bridge.push(SessionEvent::Outbound(message)),
            Err(e) => warn!(session = %session_id, "failed to encode local ICE candidate: {e}"),
        }
    }));

    if ctx.role == Role::Impolite {
        let offer = transport.create_offer().await?;
        transport.set_local_description(offer.clone()).await?;
        ctx.bridge
            .push(SessionEvent::Outbound(SignalingMessage::offer(&offer)?));
        info!(session = %ctx.session_id, peer = %ctx.peer_uuid, "local offer queued");
    }

    Ok(())
}
