use std::time::Duration;

use murmur_core::{IceConnectionState, PeerConnectionState, Role};

use crate::integration::{TestSession, init_tracing};
use crate::utils::{
    ListenerEvent, MOCK_TIMEOUT_MS, RecordingListener, TransportCall, logged, new_log,
    offer_message, wait_until,
};

#[tokio::test]
async fn test_state_changes_apply_on_the_next_poll() {
    init_tracing();

    let mut test = TestSession::ready(Role::Polite).await;
    let log = new_log();
    test.session
        .add_listener(RecordingListener::new("host", log.clone()));

    test.transport
        .emit_connection_state(PeerConnectionState::Connecting);
    test.transport
        .emit_ice_connection_state(IceConnectionState::Checking);
    test.transport
        .emit_ice_connection_state(IceConnectionState::Connected);
    test.transport
        .emit_connection_state(PeerConnectionState::Connected);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(test.session.connection_state(), PeerConnectionState::New);
    assert_eq!(test.session.ice_connection_state(), IceConnectionState::New);
    assert!(logged(&log).is_empty());

    test.session.poll();

    assert_eq!(
        test.session.connection_state(),
        PeerConnectionState::Connected
    );
    assert_eq!(
        test.session.ice_connection_state(),
        IceConnectionState::Connected
    );
    let events: Vec<ListenerEvent> = logged(&log).into_iter().map(|(_, e)| e).collect();
    assert_eq!(
        events,
        [
            ListenerEvent::Connection(PeerConnectionState::Connecting),
            ListenerEvent::Ice(IceConnectionState::Checking),
            ListenerEvent::Ice(IceConnectionState::Connected),
            ListenerEvent::Connection(PeerConnectionState::Connected),
        ]
    );
}

#[tokio::test]
async fn test_answer_is_sent_on_the_next_poll() {
    init_tracing();

    let mut test = TestSession::ready(Role::Polite).await;
    test.session.handle_incoming(&offer_message("remote offer"));

    // The answer is ready on the transport but not sent yet.
    assert!(
        wait_until(MOCK_TIMEOUT_MS, || test
            .transport
            .has_call(&TransportCall::SetLocal(murmur_core::SdpType::Answer)))
        .await
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(test.network.is_empty());

    test.session.poll();
    assert_eq!(test.network.messages().len(), 1);
}
