//! End-to-end flows against the in-memory relay and simulated wallet.

use std::time::Duration;

use tonx_connector::{
    ConnectorConfig, ConnectorError, MockRelayTransport, RelayTransport, RetryPolicy,
    TonhubConnector, DEFAULT_RELAY_HOST,
};
use tonx_crypto::SessionKeypair;
use tonx_relay_mock::{CommandPolicy, MockRelay};
use tonx_types::wire::SessionNewRequest;
use tonx_types::{
    Address, AppPublicKey, AwaitedSessionState, Network, SessionState, SignRequest, SignResponse,
    TransactionRequest, TransactionResponse,
};

fn fast_config(network: Network) -> ConnectorConfig {
    ConnectorConfig {
        network,
        endpoint: DEFAULT_RELAY_HOST.to_string(),
        request_timeout_ms: 1_000,
        retry_policy: RetryPolicy::default(),
        job_poll_delay_ms: 10,
        session_poll_delay_ms: 10,
    }
}

async fn ready_session(
    connector: &TonhubConnector<MockRelayTransport>,
    transport: &MockRelayTransport,
) -> tonx_types::SessionCreated {
    let created = connector
        .create_new_session("Example App", "https://app.example")
        .await
        .expect("session creation succeeds against the mock relay");
    transport
        .relay()
        .lock()
        .unwrap()
        .approve_session(&created.id.to_url_safe(), DEFAULT_RELAY_HOST);
    created
}

fn transaction_request(created: &tonx_types::SessionCreated) -> TransactionRequest {
    TransactionRequest {
        seed: created.seed,
        app_public_key: created.id,
        to: Address::new(0, [0x0a; 32]),
        value: 1_500_000_000,
        timeout_sec: 30,
        text: Some("two coffees".to_string()),
        payload: None,
        state_init: None,
    }
}

fn sign_request(created: &tonx_types::SessionCreated) -> SignRequest {
    SignRequest {
        seed: created.seed,
        app_public_key: created.id,
        timeout_sec: 30,
        text: Some("approve login".to_string()),
        payload: None,
    }
}

#[tokio::test]
async fn create_new_session_yields_link_and_deterministic_id() {
    let transport = MockRelayTransport::new(MockRelay::new(Network::Mainnet));
    let connector = TonhubConnector::new(transport.clone(), fast_config(Network::Mainnet));

    let created = connector
        .create_new_session("Example App", "https://app.example")
        .await
        .unwrap();
    assert_eq!(
        created.link,
        format!(
            "ton://connect/{}?endpoint={}",
            created.id.to_url_safe(),
            DEFAULT_RELAY_HOST
        )
    );
    assert_eq!(
        SessionKeypair::from_seed(&created.seed).public_key(),
        created.id,
        "the session id is a pure function of the seed"
    );

    let state = connector.get_session_state(&created.id).await.unwrap();
    assert!(matches!(state, SessionState::Initing { .. }));
}

#[tokio::test]
async fn await_session_ready_returns_wallet_after_approval() {
    let transport = MockRelayTransport::new(MockRelay::new(Network::Mainnet));
    let connector = TonhubConnector::new(transport.clone(), fast_config(Network::Mainnet));

    let created = connector
        .create_new_session("Example App", "https://app.example")
        .await
        .unwrap();

    let relay = transport.relay();
    let id = created.id.to_url_safe();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        relay.lock().unwrap().approve_session(&id, DEFAULT_RELAY_HOST);
    });

    let awaited = connector
        .await_session_ready(&created.id, 5_000, 0)
        .await
        .unwrap();
    let AwaitedSessionState::Ready { wallet } = awaited else {
        panic!("expected ready, got {awaited:?}");
    };
    assert_eq!(wallet.app_public_key, created.id.to_url_safe());
    assert!(wallet.address.parse::<Address>().is_ok());
}

#[tokio::test]
async fn await_session_ready_expires_on_budget() {
    let transport = MockRelayTransport::new(MockRelay::new(Network::Mainnet));
    let connector = TonhubConnector::new(transport, fast_config(Network::Mainnet));

    let created = connector
        .create_new_session("Example App", "https://app.example")
        .await
        .unwrap();
    let awaited = connector
        .await_session_ready(&created.id, 150, 0)
        .await
        .unwrap();
    assert_eq!(awaited, AwaitedSessionState::Expired);
}

#[tokio::test]
async fn await_session_ready_seeds_the_long_poll_cursor() {
    let transport = MockRelayTransport::new(MockRelay::new(Network::Mainnet));
    let connector = TonhubConnector::new(transport.clone(), fast_config(Network::Mainnet));

    let created = ready_session(&connector, &transport).await;
    let awaited = connector
        .await_session_ready(&created.id, 1_000, 42)
        .await
        .unwrap();
    assert!(matches!(awaited, AwaitedSessionState::Ready { .. }));

    // A resumed watch starts long-polling from the caller's cursor, not 0.
    let first_cursor = transport.relay().lock().unwrap().wait_cursors.first().copied();
    assert_eq!(first_cursor, Some(42));
}

#[tokio::test]
async fn revoked_session_is_terminal() {
    let transport = MockRelayTransport::new(MockRelay::new(Network::Mainnet));
    let connector = TonhubConnector::new(transport.clone(), fast_config(Network::Mainnet));

    let created = ready_session(&connector, &transport).await;
    transport
        .relay()
        .lock()
        .unwrap()
        .revoke_session(&created.id.to_url_safe());

    let state = connector.get_session_state(&created.id).await.unwrap();
    assert_eq!(state, SessionState::Revoked);
    let awaited = connector
        .await_session_ready(&created.id, 1_000, 0)
        .await
        .unwrap();
    assert_eq!(awaited, AwaitedSessionState::Revoked);
}

#[tokio::test]
async fn network_mismatch_reads_as_revoked() {
    let transport = MockRelayTransport::new(MockRelay::new(Network::Testnet));
    let connector = TonhubConnector::new(transport.clone(), fast_config(Network::Mainnet));

    // A session registered by a testnet client, observed by a mainnet one.
    let id = AppPublicKey::new([0x33; 32]);
    transport
        .session_new(SessionNewRequest {
            key: id.to_url_safe(),
            testnet: true,
            name: "Example App".to_string(),
            url: "https://app.example".to_string(),
        })
        .await
        .unwrap();

    let state = connector.get_session_state(&id).await.unwrap();
    assert_eq!(state, SessionState::Revoked);
}

#[tokio::test]
async fn tampered_wallet_config_is_an_integrity_error() {
    let transport = MockRelayTransport::new(MockRelay::new(Network::Mainnet));
    let connector = TonhubConnector::new(transport.clone(), fast_config(Network::Mainnet));

    let created = ready_session(&connector, &transport).await;
    transport
        .relay()
        .lock()
        .unwrap()
        .tamper_wallet_sig(&created.id.to_url_safe());

    let result = connector.get_session_state(&created.id).await;
    assert!(matches!(result, Err(ConnectorError::Integrity(_))));
}

#[tokio::test]
async fn transaction_flow_succeeds_end_to_end() {
    let transport = MockRelayTransport::new(MockRelay::new(Network::Mainnet));
    let connector = TonhubConnector::new(transport.clone(), fast_config(Network::Mainnet));

    let created = ready_session(&connector, &transport).await;
    let response = connector
        .request_transaction(&transaction_request(&created))
        .await
        .unwrap();
    assert!(matches!(response, TransactionResponse::Success { .. }));
}

#[tokio::test]
async fn unapproved_session_cannot_submit_jobs() {
    let transport = MockRelayTransport::new(MockRelay::new(Network::Mainnet));
    let connector = TonhubConnector::new(transport, fast_config(Network::Mainnet));

    let created = connector
        .create_new_session("Example App", "https://app.example")
        .await
        .unwrap();
    let response = connector
        .request_transaction(&transaction_request(&created))
        .await
        .unwrap();
    assert_eq!(response, TransactionResponse::InvalidSession);
}

#[tokio::test]
async fn mismatched_app_key_is_an_invalid_session() {
    let transport = MockRelayTransport::new(MockRelay::new(Network::Mainnet));
    let connector = TonhubConnector::new(transport.clone(), fast_config(Network::Mainnet));

    let created = ready_session(&connector, &transport).await;
    let mut request = transaction_request(&created);
    request.app_public_key = AppPublicKey::new([0x77; 32]);
    let response = connector.request_transaction(&request).await.unwrap();
    assert_eq!(response, TransactionResponse::InvalidSession);
}

#[tokio::test]
async fn rejected_and_expired_jobs_surface_as_values() {
    for (policy, expected) in [
        (CommandPolicy::Reject, TransactionResponse::Rejected),
        (CommandPolicy::Expire, TransactionResponse::Expired),
    ] {
        let transport = MockRelayTransport::new(MockRelay::with_policy(Network::Mainnet, policy));
        let connector = TonhubConnector::new(transport.clone(), fast_config(Network::Mainnet));
        let created = ready_session(&connector, &transport).await;
        let response = connector
            .request_transaction(&transaction_request(&created))
            .await
            .unwrap();
        assert_eq!(response, expected);
    }
}

#[tokio::test]
async fn sign_flow_verifies_the_wallet_signature() {
    let transport = MockRelayTransport::new(MockRelay::new(Network::Mainnet));
    let connector = TonhubConnector::new(transport.clone(), fast_config(Network::Mainnet));

    let created = ready_session(&connector, &transport).await;
    let response = connector.request_sign(&sign_request(&created)).await.unwrap();
    let SignResponse::Success { signature, result } = response else {
        panic!("expected verified success, got {response:?}");
    };
    assert_eq!(signature.len(), 64);
    assert!(!result.is_empty());
}

#[tokio::test]
async fn unverifiable_sign_success_reads_as_rejected() {
    let transport = MockRelayTransport::new(MockRelay::with_policy(
        Network::Mainnet,
        CommandPolicy::CompleteTampered,
    ));
    let connector = TonhubConnector::new(transport.clone(), fast_config(Network::Mainnet));

    let created = ready_session(&connector, &transport).await;
    let response = connector.request_sign(&sign_request(&created)).await.unwrap();
    assert_eq!(response, SignResponse::Rejected);
}
