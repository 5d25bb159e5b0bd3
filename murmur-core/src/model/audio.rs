use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An audio encoding an audio source can produce, or the one a transport
/// settled on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Encoding name as it appears in SDP, e.g. `opus`.
    pub encoding: String,
    pub clock_rate: u32,
    pub channels: u16,
    pub fmtp: Option<String>,
}

impl AudioFormat {
    pub fn opus() -> Self {
        Self {
            encoding: "opus".to_owned(),
            clock_rate: 48_000,
            channels: 2,
            fmtp: Some("minptime=10;useinbandfec=1".to_owned()),
        }
    }

    pub fn mime_type(&self) -> String {
        format!("audio/{}", self.encoding)
    }

    /// Parses the `audio/<encoding>` mime form back into an encoding name.
    pub fn encoding_from_mime(mime_type: &str) -> Option<&str> {
        let (kind, encoding) = mime_type.split_once('/')?;
        kind.eq_ignore_ascii_case("audio").then_some(encoding)
    }
}

/// One encoded frame handed over by an audio source for sending.
#[derive(Debug, Clone)]
pub struct EncodedSample {
    pub duration: Duration,
    pub data: Bytes,
}

/// An RTP packet received on the audio media session.
#[derive(Debug, Clone)]
pub struct RtpPacket {
    pub ssrc: u32,
    pub sequence_number: u16,
    pub timestamp: u32,
    pub payload_type: u8,
    pub marker: bool,
    pub payload: Bytes,
}
