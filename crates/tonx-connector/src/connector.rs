//! TonhubConnector: high-level facade for the session handshake and signed
//! job submission over a relay transport.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use tonx_cell::{boc, CellError};
use tonx_crypto::{
    seal_job, sign_job_cell, transaction_job_cell, verify_sign_response, CryptoError,
    SessionKeypair, SignJob, TransactionJob, WalletCodecRegistry,
};
use tonx_types::wire::{CommandNewRequest, SessionGetRequest, SessionNewRequest, SessionWaitRequest};
use tonx_types::{
    AppPublicKey, AwaitedSessionState, Network, SessionCreated, SessionState, SignRequest,
    SignResponse, TransactionRequest, TransactionResponse, ValidationError, WalletConfig,
};
use tracing::{info, warn};

use crate::job::{await_job_state, JobOutcome};
use crate::local::ProviderError;
use crate::session::{normalize_session, session_link, IntegrityError, DEFAULT_RELAY_HOST};
use crate::transport::{
    retry_with_backoff, sleep_millis, RelayTransport, RequestMeta, RetryPolicy, TransportError,
};

/// High-level connector errors. Job rejection, expiry, and invalid sessions
/// are not errors; they are values on the response enums.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Cell(#[from] CellError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub network: Network,
    /// Relay host the connector talks to and embeds in deep links.
    pub endpoint: String,
    pub request_timeout_ms: u64,
    pub retry_policy: RetryPolicy,
    /// Delay between `command_get` rounds while a job is still submitted.
    pub job_poll_delay_ms: u64,
    /// Delay between rounds while a session is still initing.
    pub session_poll_delay_ms: u64,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            endpoint: DEFAULT_RELAY_HOST.to_string(),
            request_timeout_ms: 5_000,
            retry_policy: RetryPolicy::default(),
            job_poll_delay_ms: 1_000,
            session_poll_delay_ms: 1_000,
        }
    }
}

/// Connector facade. Network and relay endpoint are fixed at construction;
/// the wallet codec registry defaults to the v4 decoder.
pub struct TonhubConnector<T: RelayTransport> {
    transport: T,
    config: ConnectorConfig,
    codecs: WalletCodecRegistry,
}

impl<T: RelayTransport> TonhubConnector<T> {
    pub fn new(transport: T, config: ConnectorConfig) -> Self {
        Self {
            transport,
            config,
            codecs: WalletCodecRegistry::default(),
        }
    }

    pub fn with_codecs(mut self, codecs: WalletCodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    fn meta(&self) -> RequestMeta {
        RequestMeta {
            timeout_ms: self.config.request_timeout_ms,
            retry_policy: self.config.retry_policy.clone(),
        }
    }

    /// Creates a fresh session: new seed, id derived from its public key,
    /// registered with the relay under retry. The returned seed is the only
    /// secret; the link is what the user opens to approve.
    pub async fn create_new_session(
        &self,
        name: &str,
        url: &str,
    ) -> Result<SessionCreated, ConnectorError> {
        let (seed, keypair) = SessionKeypair::generate();
        let id = keypair.public_key();
        let request = SessionNewRequest {
            key: id.to_url_safe(),
            testnet: self.config.network.is_testnet(),
            name: name.to_string(),
            url: url.to_string(),
        };
        let response = retry_with_backoff(self.meta(), || async {
            self.transport.session_new(request.clone()).await
        })
        .await?;
        if !response.ok {
            return Err(TransportError::Internal("relay refused new session".to_string()).into());
        }
        info!(session = %request.key, "session created");
        Ok(SessionCreated {
            link: session_link(self.config.network, &id, &self.config.endpoint),
            id,
            seed,
        })
    }

    pub async fn get_session_state(
        &self,
        session_id: &AppPublicKey,
    ) -> Result<SessionState, ConnectorError> {
        let request = SessionGetRequest {
            id: session_id.to_url_safe(),
        };
        let record = retry_with_backoff(self.meta(), || async {
            self.transport.session_get(request.clone()).await
        })
        .await?;
        Ok(normalize_session(
            self.config.network,
            session_id,
            record,
            &self.codecs,
        )?)
    }

    /// Long-poll variant of `get_session_state`; returns once the relay
    /// reports a change past `last_updated` or its hold interval elapses.
    pub async fn wait_for_session_state(
        &self,
        session_id: &AppPublicKey,
        last_updated: u64,
    ) -> Result<SessionState, ConnectorError> {
        let request = SessionWaitRequest {
            id: session_id.to_url_safe(),
            last_updated,
        };
        let record = retry_with_backoff(self.meta(), || async {
            self.transport.session_wait(request.clone()).await
        })
        .await?;
        Ok(normalize_session(
            self.config.network,
            session_id,
            record,
            &self.codecs,
        )?)
    }

    /// Polls until the session is ready or revoked, or the wall-clock budget
    /// runs out, in which case the synthetic `Expired` terminal is returned.
    /// `last_updated` seeds the long-poll cursor; pass the value from an
    /// earlier observation to resume a watch, or 0 to start fresh.
    pub async fn await_session_ready(
        &self,
        session_id: &AppPublicKey,
        timeout_ms: u64,
        last_updated: u64,
    ) -> Result<AwaitedSessionState, ConnectorError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let mut last_updated = last_updated;
        loop {
            if Instant::now() >= deadline {
                return Ok(AwaitedSessionState::Expired);
            }
            let state = self.wait_for_session_state(session_id, last_updated).await?;
            match state {
                SessionState::Ready { wallet, .. } => {
                    return Ok(AwaitedSessionState::Ready { wallet });
                }
                SessionState::Revoked => return Ok(AwaitedSessionState::Revoked),
                SessionState::Initing { updated, .. } => {
                    last_updated = updated;
                    sleep_millis(self.config.session_poll_delay_ms).await;
                }
                SessionState::NotFound => {
                    sleep_millis(self.config.session_poll_delay_ms).await;
                }
            }
        }
    }

    /// Submits a transaction job and polls it to a terminal outcome. The
    /// wallet's confirmation blob passes through opaque.
    pub async fn request_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<TransactionResponse, ConnectorError> {
        let keypair = SessionKeypair::from_seed(&request.seed);
        let session_id = keypair.public_key();
        if self.bound_wallet(&session_id, &request.app_public_key).await?.is_none() {
            return Ok(TransactionResponse::InvalidSession);
        }

        let payload = request.payload.as_deref().map(boc::parse).transpose()?;
        let state_init = request.state_init.as_deref().map(boc::parse).transpose()?;
        let job = transaction_job_cell(&TransactionJob {
            app_public_key: &request.app_public_key,
            expires: expiry_after(request.timeout_sec),
            to: &request.to,
            value: request.value,
            text: request.text.as_deref(),
            payload,
            state_init,
        })?;
        let job_b64 = self.submit_job(&keypair, &job).await?;

        let outcome = self.poll_job(&keypair, &job_b64).await?;
        Ok(match outcome {
            JobOutcome::Completed { result } => TransactionResponse::Success { response: result },
            JobOutcome::Rejected => TransactionResponse::Rejected,
            JobOutcome::Expired => TransactionResponse::Expired,
        })
    }

    /// Submits a sign job, polls it to a terminal outcome, and verifies the
    /// wallet's signature over the reconstructed sign-response payload. A
    /// completion that does not verify reads as rejected.
    pub async fn request_sign(
        &self,
        request: &SignRequest,
    ) -> Result<SignResponse, ConnectorError> {
        let keypair = SessionKeypair::from_seed(&request.seed);
        let session_id = keypair.public_key();
        let Some(wallet) = self.bound_wallet(&session_id, &request.app_public_key).await? else {
            return Ok(SignResponse::InvalidSession);
        };

        let payload = request.payload.as_deref().map(boc::parse).transpose()?;
        let job = sign_job_cell(&SignJob {
            app_public_key: &request.app_public_key,
            expires: expiry_after(request.timeout_sec),
            text: request.text.as_deref(),
            payload: payload.clone(),
        })?;
        let job_b64 = self.submit_job(&keypair, &job).await?;

        let outcome = self.poll_job(&keypair, &job_b64).await?;
        Ok(match outcome {
            JobOutcome::Completed { result } => {
                match verified_signature(
                    &wallet,
                    &self.codecs,
                    request.text.as_deref(),
                    payload.as_ref(),
                    &result,
                ) {
                    Some(signature) => SignResponse::Success { signature, result },
                    None => {
                        warn!(session = %session_id.to_url_safe(), "sign result failed verification");
                        SignResponse::Rejected
                    }
                }
            }
            JobOutcome::Rejected => SignResponse::Rejected,
            JobOutcome::Expired => SignResponse::Expired,
        })
    }

    /// The wallet config bound to a ready session, provided its bound app
    /// key matches the request's. Anything else means no job goes out.
    async fn bound_wallet(
        &self,
        session_id: &AppPublicKey,
        app_public_key: &AppPublicKey,
    ) -> Result<Option<WalletConfig>, ConnectorError> {
        let state = self.get_session_state(session_id).await?;
        Ok(match state {
            SessionState::Ready { wallet, .. }
                if wallet.app_public_key == app_public_key.to_url_safe() =>
            {
                Some(wallet)
            }
            _ => None,
        })
    }

    async fn submit_job(
        &self,
        keypair: &SessionKeypair,
        job: &tonx_cell::Cell,
    ) -> Result<String, ConnectorError> {
        let blob = seal_job(keypair, job)?;
        let job_b64 = STANDARD.encode(blob);
        let request = CommandNewRequest {
            job: job_b64.clone(),
        };
        let response = retry_with_backoff(self.meta(), || async {
            self.transport.command_new(request.clone()).await
        })
        .await?;
        if !response.ok {
            return Err(TransportError::Internal("relay refused job".to_string()).into());
        }
        Ok(job_b64)
    }

    /// Polls a submitted job until the relay reports a terminal state. The
    /// job's encoded expiry is enforced relay-side; no client deadline
    /// applies here.
    async fn poll_job(
        &self,
        keypair: &SessionKeypair,
        job_b64: &str,
    ) -> Result<JobOutcome, ConnectorError> {
        Ok(await_job_state(
            &self.transport,
            &keypair.session_id(),
            job_b64,
            self.meta(),
            self.config.job_poll_delay_ms,
        )
        .await?)
    }
}

/// Decodes a completed sign result and checks the embedded signature against
/// the sign-response payload rebuilt from the original request. Returns the
/// signature bytes only when it verifies under the session's wallet key.
fn verified_signature(
    wallet: &WalletConfig,
    codecs: &WalletCodecRegistry,
    text: Option<&str>,
    payload: Option<&tonx_cell::Cell>,
    result_b64: &str,
) -> Option<Vec<u8>> {
    let blob = STANDARD.decode(result_b64).ok()?;
    let (signature, _) = tonx_crypto::open_sign_result(&blob).ok()?;
    if verify_sign_response(wallet, codecs, text, payload, &signature) {
        Some(signature.to_vec())
    } else {
        None
    }
}

fn expiry_after(timeout_sec: u32) -> u32 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    now.saturating_add(timeout_sec as u64).min(u32::MAX as u64) as u32
}
