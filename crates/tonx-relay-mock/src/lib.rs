//! In-memory relay plus a simulated wallet for end-to-end connector tests.
//!
//! The relay stores session and command records keyed the way the real
//! service keys them, and the wallet side produces real ed25519 signatures,
//! so every verification path in the connector runs against authentic data.

pub mod mock_relay;
pub mod wallet_sim;

pub use mock_relay::{CommandPolicy, MockRelay};
pub use wallet_sim::SimulatedWallet;
