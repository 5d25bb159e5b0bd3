use std::time::Duration;

use murmur_core::{MessageType, Role};
use murmur_peer::SessionConfig;

use crate::integration::{TestSession, init_tracing};
use crate::utils::{
    MOCK_TIMEOUT_MS, TransportCall, answer_message, candidate_message, offer_message, poll_for,
    poll_until, wait_until,
};

#[tokio::test]
async fn test_rejected_offer_closes_transport_without_answering() {
    init_tracing();

    let mut test = TestSession::ready(Role::Polite).await;
    test.transport.reject_remote_descriptions();

    test.session.handle_incoming(&offer_message("bad offer"));
    assert!(
        wait_until(MOCK_TIMEOUT_MS, || test.transport.has_call(&TransportCall::Close(
            SessionConfig::default().close_reason
        )))
        .await,
        "transport was not closed"
    );

    // Nothing after the failure is applied.
    test.session.handle_incoming(&offer_message("second offer"));
    test.session.handle_incoming(&candidate_message(1));
    poll_for(&mut test.session, Duration::from_millis(200)).await;

    assert!(test.network.is_empty());
    let calls = test.transport.calls();
    assert!(matches!(calls.last(), Some(TransportCall::Close(_))));
    assert_eq!(
        test.transport
            .count_calls(|c| matches!(c, TransportCall::SetRemote(..))),
        1
    );
    assert!(!test.transport.has_call(&TransportCall::CreateAnswer));
}

#[tokio::test]
async fn test_rejected_answer_stops_the_impolite_side() {
    init_tracing();

    let mut test = TestSession::ready(Role::Impolite).await;
    assert!(
        poll_until(&mut test.session, MOCK_TIMEOUT_MS, |_| test.network.count(MessageType::Offer) == 1)
            .await
    );

    test.transport.reject_remote_descriptions();
    test.session.handle_incoming(&answer_message("bad answer"));
    assert!(
        wait_until(MOCK_TIMEOUT_MS, || test
            .transport
            .count_calls(|c| matches!(c, TransportCall::Close(_)))
            == 1)
        .await
    );

    poll_for(&mut test.session, Duration::from_millis(200)).await;
    assert_eq!(test.network.count(MessageType::Offer), 1);
}

#[tokio::test]
async fn test_close_reason_is_configurable() {
    init_tracing();

    let config = SessionConfig {
        close_reason: "offer refused".to_owned(),
        ..SessionConfig::default()
    };
    let mut test = TestSession::idle_with_config(config);
    test.start(Role::Polite);
    assert!(poll_until(&mut test.session, MOCK_TIMEOUT_MS, |s| s.is_setup()).await);

    test.transport.reject_remote_descriptions();
    test.session.handle_incoming(&offer_message("bad offer"));

    assert!(
        wait_until(MOCK_TIMEOUT_MS, || test
            .transport
            .has_call(&TransportCall::Close("offer refused".to_owned())))
        .await
    );
}
