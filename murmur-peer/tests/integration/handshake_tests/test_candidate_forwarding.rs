use std::time::Duration;

use murmur_core::{MessageType, Role, SignalingState};
use murmur_peer::Transport;

use crate::integration::{TestSession, init_tracing};
use crate::utils::{
    MOCK_TIMEOUT_MS, answer_message, candidate, poll_for, poll_until, wait_until,
};

#[tokio::test]
async fn test_candidates_held_back_while_local_offer_is_pending() {
    init_tracing();

    let mut test = TestSession::ready(Role::Impolite).await;
    assert!(
        poll_until(&mut test.session, MOCK_TIMEOUT_MS, |_| test.network.count(MessageType::Offer) == 1)
            .await
    );
    assert_eq!(
        test.transport.signaling_state(),
        SignalingState::HaveLocalOffer
    );

    test.transport.emit_ice_candidate(candidate(1));
    poll_for(&mut test.session, Duration::from_millis(100)).await;
    assert_eq!(test.network.count(MessageType::IceCandidate), 0);

    test.session.handle_incoming(&answer_message("remote answer"));
    assert!(
        wait_until(MOCK_TIMEOUT_MS, || test.transport.signaling_state()
            == SignalingState::Stable)
        .await
    );

    test.transport.emit_ice_candidate(candidate(2));
    assert!(
        poll_until(&mut test.session, MOCK_TIMEOUT_MS, |_| test
            .network
            .count(MessageType::IceCandidate)
            == 1)
        .await
    );

    let forwarded = test
        .network
        .messages()
        .into_iter()
        .find(|m| m.kind() == MessageType::IceCandidate)
        .unwrap()
        .ice_candidate_init()
        .unwrap();
    assert_eq!(forwarded, candidate(2));
}

#[tokio::test]
async fn test_polite_side_forwards_candidates_when_stable() {
    init_tracing();

    let mut test = TestSession::ready(Role::Polite).await;

    test.transport.emit_ice_candidate(candidate(3));
    assert!(
        poll_until(&mut test.session, MOCK_TIMEOUT_MS, |_| test
            .network
            .count(MessageType::IceCandidate)
            == 1)
        .await
    );
}
