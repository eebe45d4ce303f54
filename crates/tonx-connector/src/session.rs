//! Session normalization: raw relay records become the client-observable
//! state machine, with network and integrity checks applied on every read.

use thiserror::Error;
use tonx_crypto::{verify_wallet_config, WalletCodecRegistry};
use tonx_types::wire::SessionRecord;
use tonx_types::{AppPublicKey, Network, SessionState};
use tracing::warn;

pub const DEFAULT_RELAY_HOST: &str = "connect.tonhubapi.com";

/// Trust violation in server-relayed data. Fatal: never downgraded to a
/// retryable condition or an ordinary state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("wallet config failed verification for session {session}")]
    WalletConfig { session: String },
    #[error("local wallet config failed verification")]
    LocalConfig,
}

/// Deep link the user opens to approve a session.
pub fn session_link(network: Network, session_id: &AppPublicKey, endpoint: &str) -> String {
    format!(
        "{}://connect/{}?endpoint={}",
        network.scheme(),
        session_id.to_url_safe(),
        endpoint
    )
}

/// Collapses a raw relay record into the observable state.
///
/// A record bound to the opposite network is never trusted and reads as
/// revoked. A ready record whose wallet config does not verify is a trust
/// violation, not a state.
pub fn normalize_session(
    network: Network,
    session_id: &AppPublicKey,
    record: SessionRecord,
    codecs: &WalletCodecRegistry,
) -> Result<SessionState, IntegrityError> {
    match record {
        SessionRecord::NotFound => Ok(SessionState::NotFound),
        SessionRecord::Initing {
            testnet,
            name,
            url,
            created,
            updated,
        } => {
            if testnet != network.is_testnet() {
                return Ok(SessionState::Revoked);
            }
            Ok(SessionState::Initing {
                name,
                url,
                created,
                updated,
            })
        }
        SessionRecord::Ready {
            testnet,
            name,
            url,
            created,
            updated,
            revoked,
            wallet,
        } => {
            if revoked || testnet != network.is_testnet() {
                return Ok(SessionState::Revoked);
            }
            if !verify_wallet_config(session_id, &wallet, codecs) {
                warn!(session = %session_id.to_url_safe(), "wallet config failed verification");
                return Err(IntegrityError::WalletConfig {
                    session: session_id.to_url_safe(),
                });
            }
            Ok(SessionState::Ready {
                name,
                url,
                created,
                updated,
                wallet,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use tonx_crypto::WalletCodecRegistry;
    use tonx_relay_mock::SimulatedWallet;
    use tonx_types::wire::SessionRecord;
    use tonx_types::{AppPublicKey, Network, SessionState};

    use super::{normalize_session, session_link, IntegrityError, DEFAULT_RELAY_HOST};

    fn ready_record(session_id: &AppPublicKey, testnet: bool) -> SessionRecord {
        let wallet = SimulatedWallet::from_seed([0x61; 32])
            .wallet_config_for(session_id, DEFAULT_RELAY_HOST)
            .unwrap();
        SessionRecord::Ready {
            testnet,
            name: "App".to_string(),
            url: "https://app.example".to_string(),
            created: 1,
            updated: 2,
            revoked: false,
            wallet,
        }
    }

    #[test]
    fn link_uses_network_scheme() {
        let id = AppPublicKey::new([0x01; 32]);
        let mainnet = session_link(Network::Mainnet, &id, DEFAULT_RELAY_HOST);
        let testnet = session_link(Network::Testnet, &id, DEFAULT_RELAY_HOST);
        assert_eq!(
            mainnet,
            format!("ton://connect/{}?endpoint={}", id.to_url_safe(), DEFAULT_RELAY_HOST)
        );
        assert!(testnet.starts_with("ton-test://connect/"));
    }

    #[test]
    fn network_mismatch_reads_as_revoked() {
        let id = AppPublicKey::new([0x02; 32]);
        let codecs = WalletCodecRegistry::default();
        let state =
            normalize_session(Network::Mainnet, &id, ready_record(&id, true), &codecs).unwrap();
        assert_eq!(state, SessionState::Revoked);

        let initing = SessionRecord::Initing {
            testnet: true,
            name: "App".to_string(),
            url: "https://app.example".to_string(),
            created: 1,
            updated: 1,
        };
        let state = normalize_session(Network::Mainnet, &id, initing, &codecs).unwrap();
        assert_eq!(state, SessionState::Revoked);
    }

    #[test]
    fn valid_ready_record_passes_through() {
        let id = AppPublicKey::new([0x03; 32]);
        let codecs = WalletCodecRegistry::default();
        let state =
            normalize_session(Network::Mainnet, &id, ready_record(&id, false), &codecs).unwrap();
        assert!(matches!(state, SessionState::Ready { .. }));
    }

    #[test]
    fn tampered_wallet_config_is_fatal() {
        let id = AppPublicKey::new([0x04; 32]);
        let codecs = WalletCodecRegistry::default();
        let mut record = ready_record(&id, false);
        if let SessionRecord::Ready { wallet, .. } = &mut record {
            wallet.endpoint.push('x');
        }
        let result = normalize_session(Network::Mainnet, &id, record, &codecs);
        assert!(matches!(result, Err(IntegrityError::WalletConfig { .. })));
    }
}
