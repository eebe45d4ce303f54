//! Shared domain types for the Tonhub connector protocol.
//!
//! This crate exposes:
//! - fixed-size identifiers (`AppPublicKey`, `WalletPublicKey`, `SessionSeed`),
//! - TON account addresses with the friendly and raw codecs,
//! - session lifecycle types (`Network`, `SessionState`, `WalletConfig`),
//! - signing job requests and their typed outcomes,
//! - relay wire shapes shared by transports and the relay mock.

pub mod address;
pub mod error;
pub mod ids;
pub mod job;
pub mod session;
pub mod wire;

pub use address::Address;
pub use error::ValidationError;
pub use ids::{AppPublicKey, SessionSeed, WalletPublicKey};
pub use job::{SignRequest, SignResponse, TransactionRequest, TransactionResponse};
pub use session::{AwaitedSessionState, Network, SessionCreated, SessionState, WalletConfig};
