//! Integration tests for murmur-peer.
//!
//! Tests are organized by functionality:
//! - `setup_tests` - one-time transport wiring and the initial offer
//! - `handshake_tests` - offer/answer and ICE candidate handling
//! - `buffering_tests` - messages arriving before the transport is ready
//! - `bridge_tests` - host-thread delivery of state changes and sends
//! - `lifecycle_tests` - statistics and teardown
//! - `e2e_tests` - two real webrtc peers over the loopback network


use std::sync::Arc;

use murmur_core::{PeerUuid, Role, SessionId};
use murmur_peer::{PeerSession, SessionConfig};
use tracing::Level;

use crate::utils::{
    MOCK_TIMEOUT_MS, MockAudioSink, MockAudioSource, MockTransport, MockTransportFactory,
    RecordingChannel, poll_until,
};

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A session wired to mocks, plus handles on every mock.
pub struct TestSession {
    pub session: PeerSession,
    pub network: RecordingChannel,
    pub transport: Arc<MockTransport>,
    pub factory: MockTransportFactory,
    pub source: Arc<MockAudioSource>,
    pub sink: Arc<MockAudioSink>,
}

impl TestSession {
    /// A session that has not been set up yet.
    pub fn idle() -> Self {
        Self::idle_with_config(SessionConfig::default())
    }

    pub fn idle_with_config(config: SessionConfig) -> Self {
        let network = RecordingChannel::new();
        let transport = MockTransport::new();
        let session = PeerSession::new(
            SessionId::new(),
            Arc::new(network.clone()),
            tokio::runtime::Handle::current(),
        )
        .with_config(config);

        Self {
            session,
            network,
            factory: MockTransportFactory::new(transport.clone()),
            transport,
            source: MockAudioSource::new(),
            sink: MockAudioSink::new(),
        }
    }

    /// Calls `setup` with a task from the mock factory.
    pub fn start(&mut self, role: Role) {
        let task = self.factory.create();
        self.session.setup(
            PeerUuid::from("remote"),
            role,
            self.source.clone(),
            self.sink.clone(),
            task,
        );
    }

    /// A session whose setup has completed and been observed by a poll.
    pub async fn ready(role: Role) -> Self {
        let mut test = Self::idle();
        test.start(role);
        assert!(
            poll_until(&mut test.session, MOCK_TIMEOUT_MS, |s| s.is_setup()).await,
            "setup did not complete"
        );
        test
    }
}
