//! Tonhub wallet connector.
//!
//! A third-party app authorizes itself against a user's wallet without ever
//! holding wallet keys: it binds an ephemeral ed25519 session keypair to the
//! wallet through a polling relay, verifies the relayed wallet config, and
//! submits signed jobs whose responses are verified against canonically
//! encoded payloads.
//!
//! - [`TonhubConnector`] is the relay-backed facade.
//! - [`LocalConnector`] talks to an injected [`WalletProvider`] instead.
//! - [`RelayTransport`] is the seam between the connector and the wire;
//!   [`HttpRelayTransport`] and [`MockRelayTransport`] implement it.

pub mod connector;
pub mod job;
pub mod local;
pub mod session;
pub mod transport;

pub use connector::{ConnectorConfig, ConnectorError, TonhubConnector};
pub use job::{await_job_state, JobOutcome};
pub use local::{
    verify_local_config, LocalConnector, LocalSignRequest, LocalSubkey, LocalTransactionRequest,
    LocalWalletConfig, ProviderError, WalletProvider, LOCAL_CONFIG_VERSION,
};
pub use session::{normalize_session, session_link, IntegrityError, DEFAULT_RELAY_HOST};
pub use transport::{
    retry_with_backoff, HttpRelayTransport, MockRelayTransport, RelayTransport, RequestMeta,
    RetryPolicy, TransportError,
};
