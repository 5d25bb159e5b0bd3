use crate::transport::transport::{Transport, TransportTask};
use crate::transport::transport_config::TransportConfig;
use crate::transport::webrtc_transport::WebRtcTransport;
use std::sync::Arc;
use tracing::debug;

/// Produces [`WebRtcTransport`]s as pending tasks, ready to hand to
/// [`crate::PeerSession::setup`].
#[derive(Clone, Debug, Default)]
pub struct WebRtcTransportFactory {
    config: TransportConfig,
}

impl WebRtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// The returned task does nothing until it is polled, so it can be built
    /// on the host thread and awaited on the runtime.
    pub fn create(&self) -> TransportTask {
        let config = self.config.clone();
        Box::pin(async move {
            debug!(ice_servers = config.ice_servers.len(), "creating webrtc transport");
            let transport = WebRtcTransport::new(config).await?;
            Ok(Arc::new(transport) as Arc<dyn Transport>)
        })
    }
}
