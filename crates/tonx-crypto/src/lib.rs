//! Cryptographic core of the Tonhub connector.
//!
//! This crate exposes:
//! - ephemeral session keypairs derived from a secret seed (`SessionKeypair`),
//! - the canonical message encoder for every signed payload (`proofs`),
//! - wallet-type decoding keyed by wallet-type string (`wallet`),
//! - wallet config and sign-response verification (`verifier`).

pub mod error;
pub mod keypair;
pub mod proofs;
pub mod verifier;
pub mod wallet;

pub use error::CryptoError;
pub use keypair::{verify_hash, SessionKeypair};
pub use proofs::{
    comment_cell, open_job, open_sign_result, read_comment_cell, seal_job, seal_sign_result,
    sign_job_cell, sign_response_payload, subkey_binding_proof, transaction_job_cell,
    wallet_binding_proof, JobEnvelope, SignJob, TransactionJob,
};
pub use verifier::{verify_sign_response, verify_wallet_config};
pub use wallet::{
    derive_wallet_v4_address, encode_wallet_v4_config, WalletCodec, WalletCodecRegistry,
    WalletV4Codec, WALLET_V4_SUBWALLET_ID, WALLET_V4_TYPE,
};
