//! Seams to the host's audio pipeline. Sessions wire these to the transport
//! but never encode or decode audio themselves.

use murmur_core::{AudioFormat, EncodedSample, RtpPacket};

pub type EncodedSampleHandler = Box<dyn Fn(EncodedSample) + Send + Sync>;

/// Produces encoded audio frames to send to the remote peer.
pub trait AudioSource: Send + Sync {
    /// Formats the source can encode to, most preferred first.
    fn formats(&self) -> Vec<AudioFormat>;

    /// Called once the transport has settled on a format.
    fn set_format(&self, format: AudioFormat);

    /// Registers the consumer of encoded frames. The handler is called from
    /// the audio pipeline's own thread.
    fn on_encoded_sample(&self, handler: EncodedSampleHandler);
}

/// Consumes RTP packets received on the audio media session. Called from the
/// transport's threads.
pub trait AudioSink: Send + Sync {
    fn receive_rtp(&self, packet: RtpPacket);
}
