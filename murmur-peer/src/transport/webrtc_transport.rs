use crate::error::{Error, Result};
use crate::transport::transport::{
    AudioFormatsHandler, ConnectionStateHandler, IceCandidateHandler, IceConnectionStateHandler,
    RtpPacketHandler, Transport,
};
use crate::transport::transport_config::TransportConfig;
use async_trait::async_trait;
use murmur_core::{
    AudioFormat, EncodedSample, IceCandidateInit, IceConnectionState, MediaKind,
    MediaSessionStats, PeerConnectionState, RtpPacket, SdpType, SessionDescription,
    SignalingState,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::media::Sample;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_remote::TrackRemote;

const AUDIO_TRACK_ID: &str = "audio";
const STREAM_ID: &str = "murmur";
const RTCP_BUFFER_SIZE: usize = 1500;
// About one second of 20 ms frames.
const SAMPLE_QUEUE_DEPTH: usize = 50;

#[derive(Default)]
struct MediaCounters {
    active: AtomicBool,
    packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
    packets_received: AtomicU64,
    bytes_received: AtomicU64,
}

impl MediaCounters {
    fn snapshot(&self) -> Option<MediaSessionStats> {
        if !self.active.load(Ordering::Acquire) {
            return None;
        }
        Some(MediaSessionStats {
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        })
    }
}

#[derive(Default)]
struct SessionCounters {
    audio: MediaCounters,
    video: MediaCounters,
}

impl SessionCounters {
    fn for_kind(&self, kind: MediaKind) -> &MediaCounters {
        match kind {
            MediaKind::Audio => &self.audio,
            MediaKind::Video => &self.video,
        }
    }
}

/// [`Transport`] backed by a webrtc-rs peer connection.
///
/// Sends one Opus-class audio track and reads every remote track, counting
/// RTP packets per media kind.
pub struct WebRtcTransport {
    peer_connection: Arc<RTCPeerConnection>,
    audio_sender: OnceLock<Arc<RTCRtpSender>>,
    audio_samples: OnceLock<mpsc::Sender<EncodedSample>>,
    counters: Arc<SessionCounters>,
    rtp_handler: Arc<OnceLock<RtpPacketHandler>>,
    formats_handler: OnceLock<AudioFormatsHandler>,
    pending_candidates: Mutex<Vec<RTCIceCandidateInit>>,
    closed: AtomicBool,
}

impl WebRtcTransport {
    /// Builds a fresh, unconnected peer connection. Must be called from
    /// within a tokio runtime.
    pub async fn new(config: TransportConfig) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = if config.ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: config.ice_servers,
                username: config.username.unwrap_or_default(),
                credential: config.credential.unwrap_or_default(),
                ..Default::default()
            }]
        };

        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let counters = Arc::new(SessionCounters::default());
        let rtp_handler: Arc<OnceLock<RtpPacketHandler>> = Arc::new(OnceLock::new());

        let track_counters = counters.clone();
        let track_handler = rtp_handler.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let counters = track_counters.clone();
                let handler = track_handler.clone();

                Box::pin(async move {
                    let kind = match track.kind() {
                        RTPCodecType::Audio => MediaKind::Audio,
                        RTPCodecType::Video => MediaKind::Video,
                        _ => return,
                    };
                    debug!(
                        %kind,
                        ssrc = track.ssrc(),
                        codec = %track.codec().capability.mime_type,
                        "remote track started"
                    );
                    tokio::spawn(read_remote_track(track, kind, counters, handler));
                })
            },
        ));

        Ok(Self {
            peer_connection,
            audio_sender: OnceLock::new(),
            audio_samples: OnceLock::new(),
            counters,
            rtp_handler,
            formats_handler: OnceLock::new(),
            pending_candidates: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::TransportClosed);
        }
        Ok(())
    }

    async fn notify_negotiated_formats(&self) {
        let Some(handler) = self.formats_handler.get() else {
            return;
        };
        let Some(sender) = self.audio_sender.get() else {
            return;
        };

        let formats: Vec<AudioFormat> = sender
            .get_parameters()
            .await
            .rtp_parameters
            .codecs
            .into_iter()
            .filter_map(|codec| {
                let capability = codec.capability;
                let encoding = AudioFormat::encoding_from_mime(&capability.mime_type)?;
                Some(AudioFormat {
                    encoding: encoding.to_lowercase(),
                    clock_rate: capability.clock_rate,
                    channels: capability.channels,
                    fmtp: (!capability.sdp_fmtp_line.is_empty())
                        .then_some(capability.sdp_fmtp_line),
                })
            })
            .collect();

        if formats.is_empty() {
            debug!("no audio codec negotiated");
            return;
        }
        handler(&formats);
    }
}

#[async_trait]
impl Transport for WebRtcTransport {
    async fn add_audio_track(&self, formats: &[AudioFormat]) -> Result<()> {
        self.ensure_open()?;
        let format = formats.first().ok_or(Error::NoAudioFormats)?;

        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: format.mime_type(),
                clock_rate: format.clock_rate,
                channels: format.channels,
                sdp_fmtp_line: format.fmtp.clone().unwrap_or_default(),
                rtcp_feedback: vec![],
            },
            AUDIO_TRACK_ID.to_owned(),
            STREAM_ID.to_owned(),
        ));

        let sender = self
            .peer_connection
            .add_track(Arc::clone(&track) as Arc<dyn TrackLocal + Send + Sync>)
            .await?;

        // RTCP has to be read for the interceptors to run.
        let rtcp_sender = sender.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; RTCP_BUFFER_SIZE];
            while rtcp_sender.read(&mut buf).await.is_ok() {}
        });

        let (samples_tx, samples_rx) = mpsc::channel(SAMPLE_QUEUE_DEPTH);
        tokio::spawn(write_local_samples(track, samples_rx, self.counters.clone()));

        if self.audio_sender.set(sender).is_err() || self.audio_samples.set(samples_tx).is_err() {
            warn!("audio track added twice; keeping the first one");
        }
        self.counters.audio.active.store(true, Ordering::Release);
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription> {
        self.ensure_open()?;
        let offer = self.peer_connection.create_offer(None).await?;
        Ok(SessionDescription::offer(offer.sdp))
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        self.ensure_open()?;
        let answer = self.peer_connection.create_answer(None).await?;
        Ok(SessionDescription::answer(answer.sdp))
    }

    async fn set_local_description(&self, description: SessionDescription) -> Result<()> {
        self.ensure_open()?;
        let description = to_rtc_description(description)?;
        self.peer_connection
            .set_local_description(description)
            .await?;
        Ok(())
    }

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()> {
        self.ensure_open()?;
        let description = to_rtc_description(description)
            .map_err(|e| Error::RemoteDescriptionRejected(e.to_string()))?;
        self.peer_connection
            .set_remote_description(description)
            .await
            .map_err(|e| Error::RemoteDescriptionRejected(e.to_string()))?;

        let pending = std::mem::take(&mut *self.pending_candidates.lock().await);
        for candidate in pending {
            if let Err(e) = self.peer_connection.add_ice_candidate(candidate).await {
                warn!("failed to add queued ICE candidate: {e}");
            }
        }

        self.notify_negotiated_formats().await;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidateInit) -> Result<()> {
        self.ensure_open()?;
        let candidate = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: candidate.username_fragment,
        };

        // Candidates may overtake the description they belong to.
        if self.peer_connection.remote_description().await.is_none() {
            debug!("no remote description yet, queueing ICE candidate");
            self.pending_candidates.lock().await.push(candidate);
            return Ok(());
        }
        self.peer_connection.add_ice_candidate(candidate).await?;
        Ok(())
    }

    async fn close(&self, reason: &str) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!(reason, "closing peer connection");
        self.peer_connection.close().await?;
        Ok(())
    }

    fn signaling_state(&self) -> SignalingState {
        match self.peer_connection.signaling_state() {
            RTCSignalingState::Unspecified | RTCSignalingState::Stable => SignalingState::Stable,
            RTCSignalingState::HaveLocalOffer => SignalingState::HaveLocalOffer,
            RTCSignalingState::HaveRemoteOffer => SignalingState::HaveRemoteOffer,
            RTCSignalingState::HaveLocalPranswer => SignalingState::HaveLocalPranswer,
            RTCSignalingState::HaveRemotePranswer => SignalingState::HaveRemotePranswer,
            RTCSignalingState::Closed => SignalingState::Closed,
        }
    }

    fn send_audio(&self, sample: EncodedSample) {
        if self.peer_connection.connection_state() != RTCPeerConnectionState::Connected {
            return;
        }
        let Some(samples) = self.audio_samples.get() else {
            return;
        };
        queue_sample(samples, sample);
    }

    fn session_stats(&self, kind: MediaKind) -> Option<MediaSessionStats> {
        self.counters.for_kind(kind).snapshot()
    }

    fn on_connection_state_change(&self, handler: ConnectionStateHandler) {
        self.peer_connection
            .on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
                if let Some(state) = connection_state(state) {
                    handler(state);
                }
                Box::pin(async {})
            }));
    }

    fn on_ice_connection_state_change(&self, handler: IceConnectionStateHandler) {
        self.peer_connection
            .on_ice_connection_state_change(Box::new(move |state: RTCIceConnectionState| {
                if let Some(state) = ice_connection_state(state) {
                    handler(state);
                }
                Box::pin(async {})
            }));
    }

    fn on_ice_candidate(&self, handler: IceCandidateHandler) {
        self.peer_connection
            .on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
                let Some(candidate) = candidate else {
                    return Box::pin(async {});
                };
                match candidate.to_json() {
                    Ok(init) => handler(IceCandidateInit {
                        candidate: init.candidate,
                        sdp_mid: init.sdp_mid,
                        sdp_mline_index: init.sdp_mline_index,
                        username_fragment: init.username_fragment,
                    }),
                    Err(e) => warn!("failed to serialize local ICE candidate: {e}"),
                }
                Box::pin(async {})
            }));
    }

    fn on_audio_formats_negotiated(&self, handler: AudioFormatsHandler) {
        if self.formats_handler.set(handler).is_err() {
            warn!("audio format handler already registered");
        }
    }

    fn on_rtp_packet(&self, handler: RtpPacketHandler) {
        if self.rtp_handler.set(handler).is_err() {
            warn!("RTP packet handler already registered");
        }
    }
}

async fn read_remote_track(
    track: Arc<TrackRemote>,
    kind: MediaKind,
    counters: Arc<SessionCounters>,
    handler: Arc<OnceLock<RtpPacketHandler>>,
) {
    let media = counters.for_kind(kind);
    media.active.store(true, Ordering::Release);

    loop {
        match track.read_rtp().await {
            Ok((packet, _attributes)) => {
                media.packets_received.fetch_add(1, Ordering::Relaxed);
                media
                    .bytes_received
                    .fetch_add(packet.payload.len() as u64, Ordering::Relaxed);

                if let Some(handler) = handler.get() {
                    handler(
                        kind,
                        RtpPacket {
                            ssrc: packet.header.ssrc,
                            sequence_number: packet.header.sequence_number,
                            timestamp: packet.header.timestamp,
                            payload_type: packet.header.payload_type,
                            marker: packet.header.marker,
                            payload: packet.payload,
                        },
                    );
                }
            }
            Err(e) => {
                debug!(%kind, "remote track ended: {e}");
                break;
            }
        }
    }
}

/// Never waits: a full or closed queue drops the sample.
fn queue_sample(samples: &mpsc::Sender<EncodedSample>, sample: EncodedSample) -> bool {
    match samples.try_send(sample) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            debug!("sample queue full, dropping audio sample");
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!("sample writer stopped, dropping audio sample");
            false
        }
    }
}

async fn write_local_samples(
    track: Arc<TrackLocalStaticSample>,
    mut samples: mpsc::Receiver<EncodedSample>,
    counters: Arc<SessionCounters>,
) {
    while let Some(sample) = samples.recv().await {
        let len = sample.data.len() as u64;
        let sample = Sample {
            data: sample.data,
            duration: sample.duration,
            ..Default::default()
        };

        match track.write_sample(&sample).await {
            Ok(()) => {
                counters.audio.packets_sent.fetch_add(1, Ordering::Relaxed);
                counters.audio.bytes_sent.fetch_add(len, Ordering::Relaxed);
            }
            Err(e) => debug!("dropping audio sample: {e}"),
        }
    }
}

fn to_rtc_description(description: SessionDescription) -> Result<RTCSessionDescription> {
    let rtc = match description.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(description.sdp)?,
        SdpType::Answer => RTCSessionDescription::answer(description.sdp)?,
        SdpType::Pranswer => RTCSessionDescription::pranswer(description.sdp)?,
        SdpType::Rollback => {
            let mut rollback = RTCSessionDescription::default();
            rollback.sdp_type = RTCSdpType::Rollback;
            rollback.sdp = description.sdp;
            rollback
        }
    };
    Ok(rtc)
}

fn connection_state(state: RTCPeerConnectionState) -> Option<PeerConnectionState> {
    match state {
        RTCPeerConnectionState::Unspecified => None,
        RTCPeerConnectionState::New => Some(PeerConnectionState::New),
        RTCPeerConnectionState::Connecting => Some(PeerConnectionState::Connecting),
        RTCPeerConnectionState::Connected => Some(PeerConnectionState::Connected),
        RTCPeerConnectionState::Disconnected => Some(PeerConnectionState::Disconnected),
        RTCPeerConnectionState::Failed => Some(PeerConnectionState::Failed),
        RTCPeerConnectionState::Closed => Some(PeerConnectionState::Closed),
    }
}

fn ice_connection_state(state: RTCIceConnectionState) -> Option<IceConnectionState> {
    match state {
        RTCIceConnectionState::Unspecified => None,
        RTCIceConnectionState::New => Some(IceConnectionState::New),
        RTCIceConnectionState::Checking => Some(IceConnectionState::Checking),
        RTCIceConnectionState::Connected => Some(IceConnectionState::Connected),
        RTCIceConnectionState::Completed => Some(IceConnectionState::Completed),
        RTCIceConnectionState::Disconnected => Some(IceConnectionState::Disconnected),
        RTCIceConnectionState::Failed => Some(IceConnectionState::Failed),
        RTCIceConnectionState::Closed => Some(IceConnectionState::Closed),
    }
}
