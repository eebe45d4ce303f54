//! Signing job requests and their discriminated-union outcomes.

use crate::address::Address;
use crate::ids::{AppPublicKey, SessionSeed};

/// Request to have the wallet sign and send a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub seed: SessionSeed,
    pub app_public_key: AppPublicKey,
    pub to: Address,
    /// Transfer amount in nanotons.
    pub value: u64,
    /// Job validity budget in seconds; the encoded expiry is now + timeout.
    pub timeout_sec: u32,
    pub text: Option<String>,
    /// Serialized payload cell, if any.
    pub payload: Option<Vec<u8>>,
    /// Serialized contract-init cell, if any.
    pub state_init: Option<Vec<u8>>,
}

/// Request to have the wallet sign an arbitrary message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    pub seed: SessionSeed,
    pub app_public_key: AppPublicKey,
    pub timeout_sec: u32,
    pub text: Option<String>,
    pub payload: Option<Vec<u8>>,
}

/// Outcome of a transaction job. Everything except a trust violation is a
/// value, not an error: callers branch on this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionResponse {
    /// Opaque confirmation blob from the wallet, passed through unverified.
    Success { response: String },
    Rejected,
    Expired,
    InvalidSession,
}

/// Outcome of a sign job. `Success` is only reported after the embedded
/// signature verified against the reconstructed sign-response payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignResponse {
    Success { signature: Vec<u8>, result: String },
    Rejected,
    Expired,
    InvalidSession,
}
