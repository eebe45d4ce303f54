//! Ephemeral session keypairs derived from a 32-byte secret seed.
//!
//! The seed is the only secret and is never persisted here; the session
//! identifier is the url-safe base64 form of the derived public key.

use ed25519_dalek::{Signature, Signer as DalekSigner, SigningKey, Verifier as DalekVerifier, VerifyingKey};
use rand::RngCore;
use tonx_types::{AppPublicKey, SessionSeed};

#[derive(Clone)]
pub struct SessionKeypair {
    signing_key: SigningKey,
}

impl std::fmt::Debug for SessionKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeypair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

impl SessionKeypair {
    /// Deterministic: the same seed always yields the same keypair.
    pub fn from_seed(seed: &SessionSeed) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed.as_bytes()),
        }
    }

    pub fn generate() -> (SessionSeed, Self) {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        let seed = SessionSeed::new(seed);
        let keypair = Self::from_seed(&seed);
        (seed, keypair)
    }

    pub fn public_key(&self) -> AppPublicKey {
        AppPublicKey::new(self.signing_key.verifying_key().to_bytes())
    }

    /// Session identifier: the public half in url-safe base64.
    pub fn session_id(&self) -> String {
        self.public_key().to_url_safe()
    }

    pub fn sign_hash(&self, hash: &[u8; 32]) -> [u8; 64] {
        self.signing_key.sign(hash).to_bytes()
    }
}

/// Verifies an ed25519 signature over a 32-byte hash. Malformed keys or
/// signatures verify as false, never panic.
pub fn verify_hash(public_key: &[u8; 32], hash: &[u8; 32], signature: &[u8]) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let signature: [u8; 64] = match signature.try_into() {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    verifying_key
        .verify(hash, &Signature::from_bytes(&signature))
        .is_ok()
}
