use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tonx_relay_mock::MockRelay;
use tonx_types::wire::{
    CommandGetRequest, CommandNewRequest, CommandRecord, OkResponse, SessionGetRequest,
    SessionNewRequest, SessionRecord, SessionWaitRequest,
};

/// Per-request metadata used for deadline control and retries.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    pub timeout_ms: u64,
    pub retry_policy: RetryPolicy,
}

/// Retry behavior for transport operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 2_000,
            jitter_ms: 50,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based): doubles from
    /// `initial_backoff_ms`, caps at `max_backoff_ms`, then adds jitter so
    /// concurrent pollers do not fall into lockstep.
    pub fn delay_for(&self, attempt: u32) -> u64 {
        let doubled = self
            .initial_backoff_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let capped = doubled.min(self.max_backoff_ms);
        if self.jitter_ms == 0 {
            return capped;
        }
        capped.saturating_add(rand::thread_rng().gen_range(0..=self.jitter_ms))
    }
}

/// Error model for transport operations. Only `Timeout` and `Unavailable`
/// are retryable; a malformed response body is a protocol violation and
/// fails immediately.
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("relay unavailable: {0}")]
    Unavailable(String),
    #[error("relay returned status {0}")]
    Status(u16),
    #[error("protocol violation: {0}")]
    Protocol(String),
    #[error("internal transport error: {0}")]
    Internal(String),
}

impl TransportError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Unavailable(_)) || matches!(self, Self::Status(code) if *code >= 500)
    }
}

/// Relay transport interface. Implementations may use in-memory mocks or
/// HTTP; every method is a single JSON request/response exchange.
#[async_trait(?Send)]
pub trait RelayTransport {
    async fn session_new(&self, request: SessionNewRequest) -> Result<OkResponse, TransportError>;

    async fn session_get(&self, request: SessionGetRequest)
        -> Result<SessionRecord, TransportError>;

    /// Long-poll variant of `session_get`; the server holds the request for
    /// up to ~30 seconds waiting for a change past `last_updated`.
    async fn session_wait(
        &self,
        request: SessionWaitRequest,
    ) -> Result<SessionRecord, TransportError>;

    async fn command_new(&self, request: CommandNewRequest) -> Result<OkResponse, TransportError>;

    async fn command_get(&self, request: CommandGetRequest)
        -> Result<CommandRecord, TransportError>;
}

/// HTTP transport against a real relay endpoint.
pub struct HttpRelayTransport {
    client: reqwest::Client,
    base: String,
}

impl HttpRelayTransport {
    pub fn new(endpoint: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| TransportError::Internal(err.to_string()))?;
        Ok(Self {
            client,
            base: format!("https://{endpoint}"),
        })
    }

    async fn post<Req, Resp>(
        &self,
        method: &str,
        request: &Req,
        timeout: Duration,
    ) -> Result<Resp, TransportError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base, method);
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(request)
            .send()
            .await
            .map_err(classify_reqwest_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|err| TransportError::Protocol(err.to_string()))
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Unavailable(err.to_string())
    }
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
// Server long-polls for ~30 s; leave headroom before the client gives up.
const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(40);

#[async_trait(?Send)]
impl RelayTransport for HttpRelayTransport {
    async fn session_new(&self, request: SessionNewRequest) -> Result<OkResponse, TransportError> {
        self.post("session_new", &request, REQUEST_TIMEOUT).await
    }

    async fn session_get(
        &self,
        request: SessionGetRequest,
    ) -> Result<SessionRecord, TransportError> {
        self.post("session_get", &request, REQUEST_TIMEOUT).await
    }

    async fn session_wait(
        &self,
        request: SessionWaitRequest,
    ) -> Result<SessionRecord, TransportError> {
        self.post("session_wait", &request, LONG_POLL_TIMEOUT).await
    }

    async fn command_new(&self, request: CommandNewRequest) -> Result<OkResponse, TransportError> {
        self.post("command_new", &request, REQUEST_TIMEOUT).await
    }

    async fn command_get(
        &self,
        request: CommandGetRequest,
    ) -> Result<CommandRecord, TransportError> {
        self.post("command_get", &request, REQUEST_TIMEOUT).await
    }
}

/// In-memory transport backed by `MockRelay`, used in tests.
#[derive(Clone)]
pub struct MockRelayTransport {
    relay: Arc<Mutex<MockRelay>>,
}

impl MockRelayTransport {
    pub fn new(relay: MockRelay) -> Self {
        Self {
            relay: Arc::new(Mutex::new(relay)),
        }
    }

    pub fn shared(relay: Arc<Mutex<MockRelay>>) -> Self {
        Self { relay }
    }

    pub fn relay(&self) -> Arc<Mutex<MockRelay>> {
        self.relay.clone()
    }

    fn with_relay<R>(&self, f: impl FnOnce(&mut MockRelay) -> R) -> Result<R, TransportError> {
        let mut lock = self
            .relay
            .lock()
            .map_err(|_| TransportError::Unavailable("mutex poisoned".to_string()))?;
        Ok(f(&mut lock))
    }
}

#[async_trait(?Send)]
impl RelayTransport for MockRelayTransport {
    async fn session_new(&self, request: SessionNewRequest) -> Result<OkResponse, TransportError> {
        self.with_relay(|relay| relay.session_new(&request))
    }

    async fn session_get(
        &self,
        request: SessionGetRequest,
    ) -> Result<SessionRecord, TransportError> {
        self.with_relay(|relay| relay.session_get(&request.id))
    }

    async fn session_wait(
        &self,
        request: SessionWaitRequest,
    ) -> Result<SessionRecord, TransportError> {
        self.with_relay(|relay| relay.session_wait(&request.id, request.last_updated))
    }

    async fn command_new(&self, request: CommandNewRequest) -> Result<OkResponse, TransportError> {
        self.with_relay(|relay| relay.command_new(&request.job))
    }

    async fn command_get(
        &self,
        request: CommandGetRequest,
    ) -> Result<CommandRecord, TransportError> {
        self.with_relay(|relay| relay.command_get(&request.appk))
    }
}

/// Retries `op` under the policy in `meta`. Gives up on the first
/// non-retryable error, after `max_retries` retryable ones, or when the next
/// backoff delay would overrun the request deadline.
pub async fn retry_with_backoff<T, F, Fut>(meta: RequestMeta, mut op: F) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, TransportError>>,
{
    let deadline = Instant::now() + Duration::from_millis(meta.timeout_ms);
    let policy = &meta.retry_policy;
    let mut attempt = 0u32;
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_retryable() || attempt >= policy.max_retries {
            return Err(err);
        }
        let delay = policy.delay_for(attempt);
        if Instant::now() + Duration::from_millis(delay) >= deadline {
            return Err(TransportError::Timeout);
        }
        attempt += 1;
        sleep_millis(delay).await;
    }
}

pub(crate) async fn sleep_millis(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[cfg(test)]
mod tests {
    use std::cell::Cell as StdCell;

    use tonx_relay_mock::MockRelay;
    use tonx_types::wire::{SessionGetRequest, SessionRecord};
    use tonx_types::Network;

    use super::{
        retry_with_backoff, MockRelayTransport, RelayTransport, RequestMeta, RetryPolicy,
        TransportError,
    };

    #[tokio::test]
    async fn mock_transport_round_trips() {
        let transport = MockRelayTransport::new(MockRelay::new(Network::Mainnet));
        let record = transport
            .session_get(SessionGetRequest {
                id: "missing".to_string(),
            })
            .await
            .expect("mock transport never fails");
        assert_eq!(record, SessionRecord::NotFound);
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 450,
            jitter_ms: 0,
        };
        assert_eq!(policy.delay_for(0), 100);
        assert_eq!(policy.delay_for(1), 200);
        assert_eq!(policy.delay_for(2), 400);
        assert_eq!(policy.delay_for(3), 450);
        assert_eq!(policy.delay_for(4), 450);
    }

    #[tokio::test]
    async fn retry_gives_up_after_max_retries() {
        let attempts = StdCell::new(0u32);
        let counter = &attempts;
        let result: Result<(), _> = retry_with_backoff(
            RequestMeta {
                timeout_ms: 10_000,
                retry_policy: RetryPolicy {
                    max_retries: 2,
                    initial_backoff_ms: 1,
                    max_backoff_ms: 2,
                    jitter_ms: 0,
                },
            },
            move || async move {
                counter.set(counter.get() + 1);
                Err(TransportError::Unavailable("down".to_string()))
            },
        )
        .await;
        assert!(matches!(result, Err(TransportError::Unavailable(_))));
        assert_eq!(attempts.get(), 3, "initial attempt plus two retries");
    }

    #[tokio::test]
    async fn retry_does_not_touch_fatal_errors() {
        let attempts = StdCell::new(0u32);
        let counter = &attempts;
        let result: Result<(), _> = retry_with_backoff(
            RequestMeta {
                timeout_ms: 10_000,
                retry_policy: RetryPolicy::default(),
            },
            move || async move {
                counter.set(counter.get() + 1);
                Err(TransportError::Protocol("bad shape".to_string()))
            },
        )
        .await;
        assert!(matches!(result, Err(TransportError::Protocol(_))));
        assert_eq!(attempts.get(), 1);
    }
}
