//! Session lifecycle model: network binding, wallet configuration, and the
//! client-observable state machine (not_found -> initing -> ready/revoked).

use serde::{Deserialize, Serialize};

use crate::ids::{AppPublicKey, SessionSeed};

/// Network a session is bound to. A session observed with the opposite
/// network flag is never trusted and normalizes to revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn is_testnet(self) -> bool {
        matches!(self, Network::Testnet)
    }

    /// Deep-link scheme for this network.
    pub fn scheme(self) -> &'static str {
        match self {
            Network::Mainnet => "ton",
            Network::Testnet => "ton-test",
        }
    }
}

/// Server-relayed proof binding a wallet address and public key to a session.
/// Shared read-only once a session is ready; replaced, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConfig {
    pub address: String,
    pub endpoint: String,
    pub wallet_type: String,
    pub wallet_config: String,
    pub wallet_sig: String,
    pub app_public_key: String,
}

/// Normalized session state as observed by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NotFound,
    Initing {
        name: String,
        url: String,
        created: u64,
        updated: u64,
    },
    Ready {
        name: String,
        url: String,
        created: u64,
        updated: u64,
        wallet: WalletConfig,
    },
    Revoked,
}

/// Terminal outcome of awaiting a session; `Expired` is synthesized by the
/// await operation when its wall-clock budget runs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwaitedSessionState {
    Ready { wallet: WalletConfig },
    Revoked,
    Expired,
}

/// Result of creating a new session. The seed is the only secret; storing it
/// is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCreated {
    pub id: AppPublicKey,
    pub seed: SessionSeed,
    pub link: String,
}
