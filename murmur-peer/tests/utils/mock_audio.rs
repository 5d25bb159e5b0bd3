use bytes::Bytes;
use murmur_core::{AudioFormat, EncodedSample, RtpPacket};
use murmur_peer::{AudioSink, AudioSource, EncodedSampleHandler};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Opus frame of silence.
pub const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];

#[derive(Default)]
pub struct MockAudioSource {
    negotiated: Mutex<Option<AudioFormat>>,
    handler: Mutex<Option<EncodedSampleHandler>>,
}

impl MockAudioSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn negotiated(&self) -> Option<AudioFormat> {
        self.negotiated.lock().unwrap().clone()
    }

    pub fn is_wired(&self) -> bool {
        self.handler.lock().unwrap().is_some()
    }

    /// Pushes one 20 ms frame of silence through the registered handler.
    pub fn emit_silence(&self) {
        if let Some(handler) = &*self.handler.lock().unwrap() {
            handler(EncodedSample {
                duration: Duration::from_millis(20),
                data: Bytes::from_static(&OPUS_SILENCE),
            });
        }
    }
}

impl AudioSource for MockAudioSource {
    fn formats(&self) -> Vec<AudioFormat> {
        vec![AudioFormat::opus()]
    }

    fn set_format(&self, format: AudioFormat) {
        *self.negotiated.lock().unwrap() = Some(format);
    }

    fn on_encoded_sample(&self, handler: EncodedSampleHandler) {
        *self.handler.lock().unwrap() = Some(handler);
    }
}

#[derive(Default)]
pub struct MockAudioSink {
    packets: Mutex<Vec<RtpPacket>>,
}

impl MockAudioSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn packets(&self) -> Vec<RtpPacket> {
        self.packets.lock().unwrap().clone()
    }

    pub fn received(&self) -> usize {
        self.packets.lock().unwrap().len()
    }
}

impl AudioSink for MockAudioSink {
    fn receive_rtp(&self, packet: RtpPacket) {
        self.packets.lock().unwrap().push(packet);
    }
}

pub fn rtp_packet(sequence_number: u16) -> RtpPacket {
    RtpPacket {
        ssrc: 1234,
        sequence_number,
        timestamp: u32::from(sequence_number) * 960,
        payload_type: 111,
        marker: false,
        payload: Bytes::from_static(&OPUS_SILENCE),
    }
}
