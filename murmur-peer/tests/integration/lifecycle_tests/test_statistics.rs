use murmur_core::{MediaKind, MediaSessionStats, PeerUuid, Role, StatisticsSnapshot};

use crate::integration::{TestSession, init_tracing};
use crate::utils::{MOCK_TIMEOUT_MS, poll_until};

#[tokio::test]
async fn test_statistics_are_zero_without_a_transport() {
    init_tracing();

    let mut test = TestSession::idle();
    assert_eq!(test.session.statistics(), StatisticsSnapshot::default());

    let (task, release) = test.factory.create_gated();
    test.session.setup(
        PeerUuid::from("remote"),
        Role::Polite,
        test.source.clone(),
        test.sink.clone(),
        task,
    );
    test.session.poll();
    assert!(test.session.statistics().is_zero());

    test.transport.set_audio_stats(MediaSessionStats {
        packets_sent: 10,
        bytes_sent: 30,
        packets_received: 0,
        bytes_received: 0,
    });
    // Ready but not yet observed by a poll: still zeros.
    release.send(()).unwrap();
    assert!(test.session.statistics().is_zero());

    assert!(poll_until(&mut test.session, MOCK_TIMEOUT_MS, |s| s.is_setup()).await);
}

#[tokio::test]
async fn test_statistics_read_live_counters() {
    init_tracing();

    let test = TestSession::ready(Role::Impolite).await;
    assert!(test.session.statistics().is_zero());

    let stats = MediaSessionStats {
        packets_sent: 50,
        bytes_sent: 150,
        packets_received: 48,
        bytes_received: 144,
    };
    test.transport.set_audio_stats(stats);

    let snapshot = test.session.statistics();
    assert_eq!(*snapshot.get(MediaKind::Audio), stats);
    // The mock has no video session.
    assert_eq!(*snapshot.get(MediaKind::Video), MediaSessionStats::default());

    test.transport.set_audio_stats(MediaSessionStats {
        packets_sent: 51,
        ..stats
    });
    assert_eq!(test.session.statistics().audio.packets_sent, 51);
}
