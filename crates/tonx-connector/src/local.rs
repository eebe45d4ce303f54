//! Local provider mode: the app talks to an injected wallet capability
//! instead of the relay. The provider exposes a versioned wallet config with
//! a domain-scoped subkey; job responses are verified against that subkey.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tonx_cell::boc;
use tonx_crypto::{
    sign_response_payload, subkey_binding_proof, verify_hash, WalletCodecRegistry,
};
use tonx_types::{Address, Network, SignResponse, TransactionResponse};
use tracing::warn;

use crate::connector::ConnectorError;
use crate::session::IntegrityError;

pub const LOCAL_CONFIG_VERSION: u32 = 1;

/// Domain-scoped signing delegation inside a local wallet config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSubkey {
    pub domain: String,
    /// Base64 subkey public key.
    pub public_key: String,
    pub time: u32,
    /// Base64 wallet signature over the subkey-binding proof.
    pub signature: String,
}

/// Wallet config a local provider exposes to the embedding app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalWalletConfig {
    pub version: u32,
    pub network: Network,
    pub address: String,
    /// Base64 wallet public key.
    pub public_key: String,
    pub wallet_type: String,
    pub wallet_config: String,
    pub time: u32,
    pub subkey: LocalSubkey,
}

#[derive(Debug, Error, Clone)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("malformed provider response: {0}")]
    Malformed(String),
    #[error("unsupported local config version {0}")]
    UnsupportedVersion(u32),
}

/// Injected wallet capability. No globals: the embedding app hands the
/// provider to the connector explicitly.
#[async_trait(?Send)]
pub trait WalletProvider {
    fn config(&self) -> LocalWalletConfig;

    async fn call(
        &self,
        method: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;
}

/// Returns true iff the config's subkey delegation carries a valid wallet
/// signature over the subkey-binding proof, under the key decoded from the
/// wallet config blob.
pub fn verify_local_config(config: &LocalWalletConfig, codecs: &WalletCodecRegistry) -> bool {
    let Ok(address) = config.address.parse::<Address>() else {
        return false;
    };
    let Ok((wallet_key, derived)) = codecs.extract(&config.wallet_type, &config.wallet_config)
    else {
        return false;
    };
    if derived != address {
        return false;
    }
    match tonx_types::WalletPublicKey::from_base64(&config.public_key) {
        Ok(claimed_key) if claimed_key == wallet_key => {}
        _ => return false,
    }
    let Ok(subkey_bytes) = STANDARD.decode(&config.subkey.public_key) else {
        return false;
    };
    let subkey: [u8; 32] = match subkey_bytes.as_slice().try_into() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let Ok(proof) =
        subkey_binding_proof(&subkey, config.subkey.time, &address, &config.subkey.domain)
    else {
        return false;
    };
    let Ok(signature) = STANDARD.decode(&config.subkey.signature) else {
        return false;
    };
    verify_hash(wallet_key.as_bytes(), &proof.repr_hash(), &signature)
}

#[derive(Debug, Clone)]
pub struct LocalTransactionRequest {
    pub to: Address,
    /// Transfer amount in nanotons.
    pub value: u64,
    pub timeout_sec: u32,
    pub text: Option<String>,
    pub payload: Option<Vec<u8>>,
    pub state_init: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct LocalSignRequest {
    pub timeout_sec: u32,
    pub text: Option<String>,
    pub payload: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TxOutcome {
    Success { response: String },
    Rejected,
    Expired,
    InvalidSession,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SignOutcome {
    Success { result: String },
    Rejected,
    Expired,
    InvalidSession,
}

/// Relay-free connector over an injected provider. The provider's config is
/// verified once at construction; an unverifiable config is fatal.
pub struct LocalConnector<P: WalletProvider> {
    provider: P,
    config: LocalWalletConfig,
    subkey_public_key: [u8; 32],
    codecs: WalletCodecRegistry,
}

impl<P: WalletProvider> LocalConnector<P> {
    pub fn new(provider: P) -> Result<Self, ConnectorError> {
        Self::with_codecs(provider, WalletCodecRegistry::default())
    }

    pub fn with_codecs(
        provider: P,
        codecs: WalletCodecRegistry,
    ) -> Result<Self, ConnectorError> {
        let config = provider.config();
        if config.version != LOCAL_CONFIG_VERSION {
            return Err(ProviderError::UnsupportedVersion(config.version).into());
        }
        if !verify_local_config(&config, &codecs) {
            warn!(address = %config.address, "local wallet config failed verification");
            return Err(IntegrityError::LocalConfig.into());
        }
        let subkey_bytes = STANDARD
            .decode(&config.subkey.public_key)
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;
        let subkey_public_key: [u8; 32] = subkey_bytes
            .as_slice()
            .try_into()
            .map_err(|_| ProviderError::Malformed("subkey public key length".to_string()))?;
        Ok(Self {
            provider,
            config,
            subkey_public_key,
            codecs,
        })
    }

    pub fn config(&self) -> &LocalWalletConfig {
        &self.config
    }

    pub fn codecs(&self) -> &WalletCodecRegistry {
        &self.codecs
    }

    pub async fn request_transaction(
        &self,
        request: &LocalTransactionRequest,
    ) -> Result<TransactionResponse, ConnectorError> {
        let args = json!({
            "network": self.config.network,
            "to": request.to.to_friendly(),
            "value": request.value.to_string(),
            "timeout": request.timeout_sec,
            "text": request.text,
            "payload": request.payload.as_deref().map(|bytes| STANDARD.encode(bytes)),
            "stateInit": request.state_init.as_deref().map(|bytes| STANDARD.encode(bytes)),
        });
        let response = self.provider.call("tx", args).await?;
        let outcome: TxOutcome = serde_json::from_value(response)
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;
        Ok(match outcome {
            TxOutcome::Success { response } => TransactionResponse::Success { response },
            TxOutcome::Rejected => TransactionResponse::Rejected,
            TxOutcome::Expired => TransactionResponse::Expired,
            TxOutcome::InvalidSession => TransactionResponse::InvalidSession,
        })
    }

    /// Requests a signature from the provider and verifies it against the
    /// sign-response payload under the delegated subkey. An unverifiable
    /// success reads as rejected.
    pub async fn request_sign(
        &self,
        request: &LocalSignRequest,
    ) -> Result<SignResponse, ConnectorError> {
        let payload = request.payload.as_deref().map(boc::parse).transpose()?;
        let args = json!({
            "timeout": request.timeout_sec,
            "text": request.text,
            "payload": request.payload.as_deref().map(|bytes| STANDARD.encode(bytes)),
        });
        let response = self.provider.call("sign", args).await?;
        let outcome: SignOutcome = serde_json::from_value(response)
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;
        Ok(match outcome {
            SignOutcome::Success { result } => {
                let verified = (|| {
                    let blob = STANDARD.decode(&result).ok()?;
                    let (signature, _) = tonx_crypto::open_sign_result(&blob).ok()?;
                    let expected =
                        sign_response_payload(request.text.as_deref(), payload.as_ref()).ok()?;
                    if verify_hash(&self.subkey_public_key, &expected.repr_hash(), &signature) {
                        Some(signature.to_vec())
                    } else {
                        None
                    }
                })();
                match verified {
                    Some(signature) => SignResponse::Success { signature, result },
                    None => {
                        warn!(address = %self.config.address, "local sign result failed verification");
                        SignResponse::Rejected
                    }
                }
            }
            SignOutcome::Rejected => SignResponse::Rejected,
            SignOutcome::Expired => SignResponse::Expired,
            SignOutcome::InvalidSession => SignResponse::InvalidSession,
        })
    }
}
