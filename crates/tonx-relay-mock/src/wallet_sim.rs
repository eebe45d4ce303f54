//! A simulated user wallet: approves sessions and answers signing jobs with
//! real signatures, so verification paths are exercised end to end.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;
use tonx_crypto::{
    derive_wallet_v4_address, encode_wallet_v4_config, open_job, seal_sign_result,
    wallet_binding_proof, CryptoError, WALLET_V4_SUBWALLET_ID, WALLET_V4_TYPE,
};
use tonx_types::{Address, AppPublicKey, WalletConfig, WalletPublicKey};

#[derive(Clone)]
pub struct SimulatedWallet {
    signing_key: SigningKey,
    subwallet_id: u32,
}

impl std::fmt::Debug for SimulatedWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedWallet")
            .field("public_key", &self.public_key())
            .field("subwallet_id", &self.subwallet_id)
            .finish_non_exhaustive()
    }
}

impl SimulatedWallet {
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
            subwallet_id: WALLET_V4_SUBWALLET_ID,
        }
    }

    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    pub fn public_key(&self) -> WalletPublicKey {
        WalletPublicKey::new(self.signing_key.verifying_key().to_bytes())
    }

    pub fn address(&self) -> Address {
        derive_wallet_v4_address(&self.public_key(), self.subwallet_id)
            .expect("wallet data always fits one cell")
    }

    /// Builds an authentic wallet config for the given session: a v4 config
    /// blob plus a real signature over the wallet-binding proof.
    pub fn wallet_config_for(
        &self,
        session_id: &AppPublicKey,
        endpoint: &str,
    ) -> Result<WalletConfig, CryptoError> {
        let address = self.address();
        let proof = wallet_binding_proof(session_id, &address, endpoint, session_id)?;
        let signature = self.signing_key.sign(&proof.repr_hash()).to_bytes();
        Ok(WalletConfig {
            address: address.to_friendly(),
            endpoint: endpoint.to_string(),
            wallet_type: WALLET_V4_TYPE.to_string(),
            wallet_config: encode_wallet_v4_config(&self.public_key(), self.subwallet_id)?,
            wallet_sig: STANDARD.encode(signature),
            app_public_key: session_id.to_url_safe(),
        })
    }

    /// Answers a submitted sign job the way a correct wallet would: rebuild
    /// the sign-response payload from the job's own comment and payload
    /// cells, sign its hash, and wrap signature + public key into the
    /// result blob.
    pub fn answer_sign_job(&self, job_blob: &[u8]) -> Result<String, CryptoError> {
        let envelope = open_job(job_blob)?;
        let mut slice = envelope.job.begin_parse();
        let _app_key = slice.load_bytes(32)?;
        let _expires = slice.load_uint(32)?;
        let _marker = slice.load_coins()?;
        let body = slice.load_ref()?;
        let mut body_slice = body.begin_parse();
        let comment = body_slice.load_ref()?;
        let payload = body_slice.load_ref()?;

        let mut response = tonx_cell::CellBuilder::new();
        response
            .store_ref((*comment).clone())?
            .store_ref((*payload).clone())?;
        let response = response.build()?;

        let signature = self.signing_key.sign(&response.repr_hash()).to_bytes();
        let result = seal_sign_result(&signature, &self.public_key())?;
        Ok(STANDARD.encode(result))
    }

    /// Signs an arbitrary proof hash with the wallet key; used by tests that
    /// construct local-provider configs.
    pub fn sign_proof_hash(&self, hash: &[u8; 32]) -> [u8; 64] {
        self.signing_key.sign(hash).to_bytes()
    }

    /// Opaque confirmation blob for a completed transaction job.
    pub fn transaction_receipt(&self, job_blob: &[u8]) -> Result<String, CryptoError> {
        let envelope = open_job(job_blob)?;
        let signature = self
            .signing_key
            .sign(&envelope.job.repr_hash())
            .to_bytes();
        let result = seal_sign_result(&signature, &self.public_key())?;
        Ok(STANDARD.encode(result))
    }
}

#[cfg(test)]
mod tests {
    use tonx_crypto::{verify_wallet_config, WalletCodecRegistry};
    use tonx_types::AppPublicKey;

    use super::SimulatedWallet;

    #[test]
    fn produces_verifiable_wallet_configs() {
        let wallet = SimulatedWallet::from_seed([0x71; 32]);
        let session_id = AppPublicKey::new([0x72; 32]);
        let config = wallet
            .wallet_config_for(&session_id, "connect.tonhubapi.com")
            .unwrap();
        assert!(verify_wallet_config(
            &session_id,
            &config,
            &WalletCodecRegistry::default()
        ));
    }
}
