use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, ensure};
use murmur_core::{PeerConnectionState, PeerUuid, Role, SessionId};
use murmur_peer::{
    Envelope, LoopbackNetwork, PeerSession, TransportConfig, WebRtcTransportFactory,
};
use tokio::sync::mpsc;

use crate::integration::init_tracing;
use crate::utils::{CONNECTION_TIMEOUT_MS, MockAudioSink, MockAudioSource, TICK};

struct Host {
    session: PeerSession,
    inbox: mpsc::UnboundedReceiver<Envelope>,
    received: Vec<String>,
}

impl Host {
    /// One host tick: poll, then deliver whatever arrived.
    fn tick(&mut self) {
        self.session.poll();
        while let Ok(envelope) = self.inbox.try_recv() {
            self.received.push(envelope.message.clone());
            self.session.handle_incoming(&envelope.message);
        }
    }
}

async fn drive_until_connected(alice: &mut Host, bob: &mut Host) -> Result<()> {
    let start = Instant::now();
    let timeout = Duration::from_millis(CONNECTION_TIMEOUT_MS);

    loop {
        alice.tick();
        bob.tick();

        if alice.session.connection_state() == PeerConnectionState::Connected
            && bob.session.connection_state() == PeerConnectionState::Connected
        {
            return Ok(());
        }
        ensure!(
            start.elapsed() < timeout,
            "peers did not connect: alice={} bob={}",
            alice.session.connection_state(),
            bob.session.connection_state()
        );
        tokio::time::sleep(TICK).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_impolite_and_polite_peers_connect_over_loopback() -> Result<()> {
    init_tracing();

    let network = LoopbackNetwork::new();
    let alice_id = PeerUuid::from("alice");
    let bob_id = PeerUuid::from("bob");

    // Both ends address the connection with the same id.
    let session_id = SessionId::new();
    let runtime = tokio::runtime::Handle::current();
    let factory = WebRtcTransportFactory::new(TransportConfig::local());

    let alice_source = MockAudioSource::new();
    let bob_sink = MockAudioSink::new();

    let mut alice = Host {
        session: PeerSession::new(
            session_id,
            Arc::new(network.channel(alice_id.clone(), bob_id.clone())),
            runtime.clone(),
        ),
        inbox: network.join(alice_id.clone()),
        received: Vec::new(),
    };
    let mut bob = Host {
        session: PeerSession::new(
            session_id,
            Arc::new(network.channel(bob_id.clone(), alice_id.clone())),
            runtime,
        ),
        inbox: network.join(bob_id.clone()),
        received: Vec::new(),
    };

    alice.session.setup(
        bob_id.clone(),
        Role::Impolite,
        alice_source.clone(),
        MockAudioSink::new(),
        factory.create(),
    );
    bob.session.setup(
        alice_id.clone(),
        Role::Polite,
        MockAudioSource::new(),
        bob_sink.clone(),
        factory.create(),
    );

    drive_until_connected(&mut alice, &mut bob).await?;

    let first: serde_json::Value =
        serde_json::from_str(bob.received.first().context("bob received nothing")?)?;
    assert_eq!(first["type"], "Offer");
    // The answer travels with the Offer tag too.
    let offers_to_alice = alice
        .received
        .iter()
        .filter_map(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
        .filter(|message| message["type"] == "Offer")
        .count();
    assert_eq!(offers_to_alice, 1);

    // Audio flows from the impolite side's source to the polite side's sink.
    let start = Instant::now();
    while bob_sink.received() == 0 {
        ensure!(
            start.elapsed() < Duration::from_millis(CONNECTION_TIMEOUT_MS),
            "no audio reached bob"
        );
        alice_source.emit_silence();
        alice.tick();
        bob.tick();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(alice.session.statistics().audio.packets_sent > 0);
    assert!(bob.session.statistics().audio.packets_received > 0);

    alice.session.teardown().await;
    bob.session.teardown().await;
    network.leave(&alice_id);
    network.leave(&bob_id);
    Ok(())
}
