//! MockRelay: in-memory relay with session records, a command store, and a
//! configurable wallet-side policy for answering submitted jobs.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tonx_crypto::open_job;
use tonx_types::wire::{CommandRecord, OkResponse, SessionNewRequest, SessionRecord};
use tonx_types::{Network, WalletConfig};

use crate::wallet_sim::SimulatedWallet;

/// How the mock wallet reacts when a job arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPolicy {
    /// Leave the job submitted; the test drives it via explicit calls.
    Manual,
    /// Answer immediately with a valid completion.
    Complete,
    /// Complete, but with one flipped byte inside the result signature.
    CompleteTampered,
    Reject,
    Expire,
}

#[derive(Debug, Clone)]
enum SessionPhase {
    Initing,
    Ready { wallet: WalletConfig, revoked: bool },
}

#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub testnet: bool,
    pub name: String,
    pub url: String,
    pub created: u64,
    pub updated: u64,
    phase: SessionPhase,
}

#[derive(Debug, Clone)]
pub struct CommandEntry {
    pub job: String,
    pub record: CommandRecord,
}

#[derive(Debug)]
pub struct MockRelay {
    pub network: Network,
    pub wallet: SimulatedWallet,
    pub policy: CommandPolicy,
    sessions: HashMap<String, SessionEntry>,
    commands: HashMap<String, CommandEntry>,
    /// Cursors received by `session_wait`, in call order.
    pub wait_cursors: Vec<u64>,
    clock: u64,
}

impl MockRelay {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            wallet: SimulatedWallet::generate(),
            policy: CommandPolicy::Complete,
            sessions: HashMap::new(),
            commands: HashMap::new(),
            wait_cursors: Vec::new(),
            clock: 1,
        }
    }

    pub fn with_policy(network: Network, policy: CommandPolicy) -> Self {
        let mut relay = Self::new(network);
        relay.policy = policy;
        relay
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    pub fn session_new(&mut self, req: &SessionNewRequest) -> OkResponse {
        if self.sessions.contains_key(&req.key) {
            return OkResponse { ok: false };
        }
        let now = self.tick();
        self.sessions.insert(
            req.key.clone(),
            SessionEntry {
                testnet: req.testnet,
                name: req.name.clone(),
                url: req.url.clone(),
                created: now,
                updated: now,
                phase: SessionPhase::Initing,
            },
        );
        OkResponse { ok: true }
    }

    pub fn session_get(&self, id: &str) -> SessionRecord {
        match self.sessions.get(id) {
            None => SessionRecord::NotFound,
            Some(entry) => match &entry.phase {
                SessionPhase::Initing => SessionRecord::Initing {
                    testnet: entry.testnet,
                    name: entry.name.clone(),
                    url: entry.url.clone(),
                    created: entry.created,
                    updated: entry.updated,
                },
                SessionPhase::Ready { wallet, revoked } => SessionRecord::Ready {
                    testnet: entry.testnet,
                    name: entry.name.clone(),
                    url: entry.url.clone(),
                    created: entry.created,
                    updated: entry.updated,
                    revoked: *revoked,
                    wallet: wallet.clone(),
                },
            },
        }
    }

    /// Long-poll variant; the in-memory mock answers immediately with the
    /// current record, which models a server-side timeout response. The
    /// received cursor is recorded so tests can assert on it.
    pub fn session_wait(&mut self, id: &str, last_updated: u64) -> SessionRecord {
        self.wait_cursors.push(last_updated);
        self.session_get(id)
    }

    pub fn command_new(&mut self, job_b64: &str) -> OkResponse {
        let Ok(blob) = STANDARD.decode(job_b64) else {
            return OkResponse { ok: false };
        };
        let Ok(envelope) = open_job(&blob) else {
            return OkResponse { ok: false };
        };
        let appk = envelope.public_key.to_url_safe();
        let record = match self.policy {
            CommandPolicy::Manual => CommandRecord::Submitted {
                job: job_b64.to_string(),
            },
            CommandPolicy::Complete => match self.wallet_answer(&blob) {
                Ok(result) => CommandRecord::Completed {
                    job: job_b64.to_string(),
                    result,
                },
                Err(_) => return OkResponse { ok: false },
            },
            CommandPolicy::CompleteTampered => match self.wallet_answer(&blob) {
                Ok(result) => CommandRecord::Completed {
                    job: job_b64.to_string(),
                    result: flip_signature_byte(&result),
                },
                Err(_) => return OkResponse { ok: false },
            },
            CommandPolicy::Reject => CommandRecord::Rejected {
                job: job_b64.to_string(),
            },
            CommandPolicy::Expire => CommandRecord::Expired,
        };
        self.commands.insert(
            appk,
            CommandEntry {
                job: job_b64.to_string(),
                record,
            },
        );
        OkResponse { ok: true }
    }

    pub fn command_get(&self, appk: &str) -> CommandRecord {
        self.commands
            .get(appk)
            .map(|entry| entry.record.clone())
            .unwrap_or(CommandRecord::Empty)
    }

    fn wallet_answer(&self, blob: &[u8]) -> Result<String, tonx_crypto::CryptoError> {
        // Marker distinguishes transaction jobs (coins 0) from sign jobs
        // (coins 1).
        let envelope = open_job(blob)?;
        let mut slice = envelope.job.begin_parse();
        let _app_key = slice.load_bytes(32)?;
        let _expires = slice.load_uint(32)?;
        let marker = slice.load_coins()?;
        if marker == 1 {
            self.wallet.answer_sign_job(blob)
        } else {
            self.wallet.transaction_receipt(blob)
        }
    }

    /// Wallet-side approval: binds an authentic wallet config to the session.
    pub fn approve_session(&mut self, id: &str, endpoint: &str) {
        let session_id = tonx_types::AppPublicKey::from_url_safe(id)
            .expect("session ids are url-safe app public keys");
        let wallet = self
            .wallet
            .wallet_config_for(&session_id, endpoint)
            .expect("simulated wallet always produces a config");
        let now = self.tick();
        if let Some(entry) = self.sessions.get_mut(id) {
            entry.phase = SessionPhase::Ready {
                wallet,
                revoked: false,
            };
            entry.updated = now;
        }
    }

    pub fn revoke_session(&mut self, id: &str) {
        let now = self.tick();
        if let Some(entry) = self.sessions.get_mut(id) {
            if let SessionPhase::Ready { revoked, .. } = &mut entry.phase {
                *revoked = true;
            } else {
                entry.phase = SessionPhase::Initing;
            }
            entry.updated = now;
        }
    }

    /// Corrupts the stored wallet signature of a ready session; used to test
    /// the integrity escalation path.
    pub fn tamper_wallet_sig(&mut self, id: &str) {
        if let Some(entry) = self.sessions.get_mut(id) {
            if let SessionPhase::Ready { wallet, .. } = &mut entry.phase {
                let mut sig = STANDARD
                    .decode(&wallet.wallet_sig)
                    .expect("stored signatures are valid base64");
                sig[0] ^= 0x01;
                wallet.wallet_sig = STANDARD.encode(sig);
            }
        }
    }

    /// Replaces the stored job of a command with a different blob, modeling
    /// a stale or foreign job under the same app key.
    pub fn swap_command_job(&mut self, appk: &str, other_job_b64: &str) {
        if let Some(entry) = self.commands.get_mut(appk) {
            entry.job = other_job_b64.to_string();
            entry.record = match entry.record.clone() {
                CommandRecord::Submitted { .. } => CommandRecord::Submitted {
                    job: other_job_b64.to_string(),
                },
                CommandRecord::Completed { result, .. } => CommandRecord::Completed {
                    job: other_job_b64.to_string(),
                    result,
                },
                CommandRecord::Rejected { .. } => CommandRecord::Rejected {
                    job: other_job_b64.to_string(),
                },
                other => other,
            };
        }
    }

    pub fn complete_command(&mut self, appk: &str) {
        if let Some(entry) = self.commands.get(appk) {
            let blob = STANDARD
                .decode(&entry.job)
                .expect("stored jobs are valid base64");
            let result = self
                .wallet_answer(&blob)
                .expect("simulated wallet answers its own jobs");
            let job = entry.job.clone();
            self.commands.insert(
                appk.to_string(),
                CommandEntry {
                    job: job.clone(),
                    record: CommandRecord::Completed { job, result },
                },
            );
        }
    }

    pub fn reject_command(&mut self, appk: &str) {
        if let Some(entry) = self.commands.get_mut(appk) {
            entry.record = CommandRecord::Rejected {
                job: entry.job.clone(),
            };
        }
    }

    pub fn expire_command(&mut self, appk: &str) {
        if let Some(entry) = self.commands.get_mut(appk) {
            entry.record = CommandRecord::Expired;
        }
    }
}

/// Result blobs end with a 64-byte signature followed by a 32-byte public
/// key; flipping a byte 40 from the end lands inside the signature.
fn flip_signature_byte(result_b64: &str) -> String {
    let mut blob = STANDARD
        .decode(result_b64)
        .expect("wallet results are valid base64");
    let idx = blob.len() - 40;
    blob[idx] ^= 0x01;
    STANDARD.encode(blob)
}
