//! Wallet config and sign-response verification.
//!
//! Both verifiers fail closed: any malformed input returns false rather than
//! panicking. Only programming-contract violations are errors elsewhere;
//! adversarial data is an ordinary false here.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tonx_cell::Cell;
use tonx_types::{Address, AppPublicKey, WalletConfig};

use crate::keypair::verify_hash;
use crate::proofs::{sign_response_payload, wallet_binding_proof};
use crate::wallet::WalletCodecRegistry;

/// Returns true iff `config.wallet_sig` is a valid signature, under the
/// public key decoded from the wallet config blob, over the exact
/// wallet-binding proof for this session and these config fields.
pub fn verify_wallet_config(
    session_id: &AppPublicKey,
    config: &WalletConfig,
    codecs: &WalletCodecRegistry,
) -> bool {
    let Ok(claimed) = config.address.parse::<Address>() else {
        return false;
    };
    let Ok((wallet_key, derived)) = codecs.extract(&config.wallet_type, &config.wallet_config)
    else {
        return false;
    };
    if derived != claimed {
        return false;
    }
    let Ok(app_public_key) = AppPublicKey::from_url_safe(&config.app_public_key) else {
        return false;
    };
    let Ok(proof) = wallet_binding_proof(session_id, &claimed, &config.endpoint, &app_public_key)
    else {
        return false;
    };
    let Ok(signature) = STANDARD.decode(&config.wallet_sig) else {
        return false;
    };
    verify_hash(wallet_key.as_bytes(), &proof.repr_hash(), &signature)
}

/// Verifies a wallet's signature over the sign-response payload rebuilt from
/// the original request's text and payload. Prevents a signature on one
/// message being replayed as approval of another.
pub fn verify_sign_response(
    config: &WalletConfig,
    codecs: &WalletCodecRegistry,
    text: Option<&str>,
    payload: Option<&Cell>,
    signature: &[u8],
) -> bool {
    let Ok((wallet_key, derived)) = codecs.extract(&config.wallet_type, &config.wallet_config)
    else {
        return false;
    };
    let Ok(claimed) = config.address.parse::<Address>() else {
        return false;
    };
    if derived != claimed {
        return false;
    }
    let Ok(expected) = sign_response_payload(text, payload) else {
        return false;
    };
    verify_hash(wallet_key.as_bytes(), &expected.repr_hash(), signature)
}
