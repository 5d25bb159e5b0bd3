use bytes::Bytes;
use murmur::model::{AudioFormat, EncodedSample, RtpPacket};
use murmur::peer::{AudioSink, AudioSource, EncodedSampleHandler};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

const FRAME: Duration = Duration::from_millis(20);
const OPUS_SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];

/// Emits one Opus frame of silence every 20 ms from its own thread, standing
/// in for a microphone pipeline.
pub struct SilenceSource {
    name: &'static str,
    handler: OnceLock<EncodedSampleHandler>,
    format: Mutex<Option<AudioFormat>>,
    running: AtomicBool,
}

impl SilenceSource {
    pub fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            handler: OnceLock::new(),
            format: Mutex::new(None),
            running: AtomicBool::new(false),
        })
    }

    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::AcqRel) {
            return;
        }
        let source = Arc::clone(self);
        thread::spawn(move || {
            while source.running.load(Ordering::Acquire) {
                if let Some(handler) = source.handler.get() {
                    handler(EncodedSample {
                        duration: FRAME,
                        data: Bytes::from_static(&OPUS_SILENCE),
                    });
                }
                thread::sleep(FRAME);
            }
            debug!(source = source.name, "audio source stopped");
        });
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn negotiated(&self) -> Option<AudioFormat> {
        self.format.lock().ok().and_then(|format| format.clone())
    }
}

impl AudioSource for SilenceSource {
    fn formats(&self) -> Vec<AudioFormat> {
        vec![AudioFormat::opus()]
    }

    fn set_format(&self, format: AudioFormat) {
        info!(source = self.name, encoding = %format.encoding, clock_rate = format.clock_rate, "audio format negotiated");
        if let Ok(mut current) = self.format.lock() {
            *current = Some(format);
        }
    }

    fn on_encoded_sample(&self, handler: EncodedSampleHandler) {
        if self.handler.set(handler).is_err() {
            debug!(source = self.name, "encoded sample handler already set");
        }
    }
}

/// Counts received RTP instead of playing it.
#[derive(Default)]
pub struct CountingSink {
    packets: AtomicU64,
    bytes: AtomicU64,
}

impl CountingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

impl AudioSink for CountingSink {
    fn receive_rtp(&self, packet: RtpPacket) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        self.bytes
            .fetch_add(packet.payload.len() as u64, Ordering::Relaxed);
    }
}
