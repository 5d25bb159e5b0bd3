mod audio;
mod host;

use crate::audio::{CountingSink, SilenceSource};
use crate::host::{Host, PrintingListener};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use murmur::model::{MessageType, PeerConnectionState, PeerUuid, Role, SessionId, SignalingMessage};
use murmur::peer::{
    LoopbackNetwork, PeerSession, SessionConfig, TransportConfig, WebRtcTransportFactory,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "murmur-cli", version, about = "Peer-to-peer voice signaling playground")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connects an impolite and a polite peer inside this process and streams
    /// silence between them.
    Demo {
        /// Host poll interval.
        #[arg(long, default_value_t = 16)]
        tick_ms: u64,

        #[arg(long, default_value_t = 10)]
        duration_secs: u64,

        /// ICE server URL, repeatable. Host candidates only when omitted.
        #[arg(long = "ice-server")]
        ice_servers: Vec<String>,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        credential: Option<String>,

        #[arg(long, default_value_t = 5)]
        teardown_timeout_secs: u64,
    },
    /// Decodes one wire-format signaling message.
    Inspect { raw: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,webrtc=warn")),
        )
        .init();

    match Cli::parse().command {
        Commands::Demo {
            tick_ms,
            duration_secs,
            ice_servers,
            username,
            credential,
            teardown_timeout_secs,
        } => {
            let transport = if ice_servers.is_empty() {
                TransportConfig::local()
            } else {
                TransportConfig {
                    ice_servers,
                    username,
                    credential,
                }
            };
            let session = SessionConfig {
                teardown_timeout: Duration::from_secs(teardown_timeout_secs),
                ..SessionConfig::default()
            };
            run_demo(
                transport,
                session,
                Duration::from_millis(tick_ms),
                Duration::from_secs(duration_secs),
            )
        }
        Commands::Inspect { raw } => inspect(&raw),
    }
}

struct Demo {
    runtime: Runtime,
    network: LoopbackNetwork,
    factory: WebRtcTransportFactory,
    config: SessionConfig,
    session_id: SessionId,
}

impl Demo {
    fn open_session(
        &self,
        host: &mut Host,
        remote: &PeerUuid,
        role: Role,
        source: Arc<SilenceSource>,
        sink: Arc<CountingSink>,
    ) {
        let channel = Arc::new(self.network.channel(host.peer.clone(), remote.clone()));
        let runtime = self.runtime.handle().clone();
        let session = host.registry.session_for(remote.clone(), || {
            PeerSession::new(self.session_id, channel, runtime).with_config(self.config.clone())
        });
        session.add_listener(PrintingListener::new(host.name));
        session.setup(remote.clone(), role, source, sink, self.factory.create());
    }
}

fn is_connected(host: &Host, remote: &PeerUuid) -> bool {
    host.registry
        .get(remote)
        .is_some_and(|session| session.connection_state() == PeerConnectionState::Connected)
}

fn run_demo(
    transport: TransportConfig,
    config: SessionConfig,
    tick: Duration,
    duration: Duration,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("murmur-rt")
        .build()
        .context("Failed to build tokio runtime")?;

    let demo = Demo {
        runtime,
        network: LoopbackNetwork::new(),
        factory: WebRtcTransportFactory::new(transport),
        config,
        session_id: SessionId::new(),
    };

    println!("{}", "Starting murmur demo...".green().bold());
    println!("   session {}", demo.session_id.to_string().dimmed());
    let ice_servers = &demo.factory.config().ice_servers;
    if ice_servers.is_empty() {
        println!("   ice servers {}", "none (host candidates only)".dimmed());
    } else {
        println!("   ice servers {}", ice_servers.join(", ").dimmed());
    }

    let mut alice = Host::join("alice", &demo.network);
    let mut bob = Host::join("bob", &demo.network);
    let alice_source = SilenceSource::new("alice");
    let bob_source = SilenceSource::new("bob");
    let alice_sink = CountingSink::new();
    let bob_sink = CountingSink::new();

    let (alice_peer, bob_peer) = (alice.peer.clone(), bob.peer.clone());
    let alice_role = Role::Impolite;
    demo.open_session(
        &mut alice,
        &bob_peer,
        alice_role,
        alice_source.clone(),
        alice_sink.clone(),
    );
    demo.open_session(
        &mut bob,
        &alice_peer,
        alice_role.opposite(),
        bob_source.clone(),
        bob_sink.clone(),
    );

    let started = Instant::now();
    let deadline = started + duration;
    let mut connected = false;
    while Instant::now() < deadline {
        alice.tick();
        bob.tick();

        if !connected && is_connected(&alice, &bob_peer) && is_connected(&bob, &alice_peer) {
            connected = true;
            println!(
                "{} {}",
                "Both peers connected after".green().bold(),
                format!("{:?}", started.elapsed()).green()
            );
            alice_source.start();
            bob_source.start();
        }
        std::thread::sleep(tick);
    }
    alice_source.stop();
    bob_source.stop();

    println!("{}", "Statistics:".cyan().bold());
    for (host, remote, source, sink) in [
        (&alice, &bob_peer, &alice_source, &alice_sink),
        (&bob, &alice_peer, &bob_source, &bob_sink),
    ] {
        let stats = host
            .registry
            .get(remote)
            .map(|session| session.statistics())
            .unwrap_or_default();
        let format = source
            .negotiated()
            .map(|f| format!("{}/{}/{}", f.encoding, f.clock_rate, f.channels))
            .unwrap_or_else(|| "none".to_owned());
        println!(
            "   {:<6} format {:<14} sent {:>5} pkts {:>7} B   received {:>5} pkts {:>7} B   sink {:>5} pkts {:>7} B",
            host.name,
            format,
            stats.audio.packets_sent,
            stats.audio.bytes_sent,
            stats.audio.packets_received,
            stats.audio.bytes_received,
            sink.packets(),
            sink.bytes(),
        );
    }

    demo.runtime.block_on(async {
        alice.registry.teardown_all().await;
        bob.registry.teardown_all().await;
    });
    demo.network.leave(&alice_peer);
    demo.network.leave(&bob_peer);

    if !connected {
        anyhow::bail!("Peers did not connect within {:?}", duration);
    }
    println!("{}", "Demo finished.".green().bold());
    Ok(())
}

fn inspect(raw: &str) -> Result<()> {
    let message = SignalingMessage::decode(raw).context("Not a signaling message")?;
    println!("{} {}", "type:".bold(), message.kind());

    match message.kind() {
        MessageType::Offer => {
            let description = message
                .session_description()
                .context("Malformed session description")?;
            println!("{} {:?}", "sdp type:".bold(), description.sdp_type);
            println!("{}", description.sdp);
        }
        MessageType::IceCandidate => {
            let candidate = message
                .ice_candidate_init()
                .context("Malformed ICE candidate")?;
            println!("{} {}", "candidate:".bold(), candidate.candidate);
            println!(
                "{} {}",
                "sdp mid:".bold(),
                candidate.sdp_mid.as_deref().unwrap_or("-")
            );
            if let Some(index) = candidate.sdp_mline_index {
                println!("{} {}", "m-line:".bold(), index);
            }
        }
    }
    Ok(())
}
