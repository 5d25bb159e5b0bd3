/// ICE configuration for transports built by [`crate::WebRtcTransportFactory`].
#[derive(Clone, Debug)]
pub struct TransportConfig {
    pub ice_servers: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl TransportConfig {
    /// No ICE servers: host candidates only, enough for peers on one machine
    /// or one LAN.
    pub fn local() -> Self {
        Self {
            ice_servers: Vec::new(),
            username: None,
            credential: None,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec!["stun:stun.l.google.com:19302".to_owned()],
            username: None,
            credential: None,
        }
    }
}
