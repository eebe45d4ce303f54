//! Canonical message encoder: the byte-exact cells that get signed.
//!
//! Field order and nesting are part of the verified contract. Comments use a
//! single canonical encoding everywhere — a 32-bit byte length followed by
//! the text as a snake — so signing and verification always reconstruct the
//! same bytes.

use tonx_cell::{boc, read_snake_bytes, Cell, CellBuilder, CellError};
use tonx_types::{Address, AppPublicKey, WalletPublicKey};

use crate::error::CryptoError;
use crate::keypair::SessionKeypair;

/// Length-tagged comment cell; arbitrary lengths chain through snake refs.
pub fn comment_cell(text: &str) -> Result<Cell, CellError> {
    let mut builder = CellBuilder::new();
    builder.store_uint(text.len() as u64, 32)?;
    builder.store_snake_bytes(text.as_bytes())?;
    builder.build()
}

pub fn read_comment_cell(cell: &Cell) -> Result<String, CellError> {
    let bytes = read_snake_bytes(cell)?;
    if bytes.len() < 4 {
        return Err(CellError::UnexpectedTag(
            "comment cell shorter than its length tag".to_string(),
        ));
    }
    let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    if bytes.len() - 4 != len {
        return Err(CellError::UnexpectedTag(format!(
            "comment length tag {len} does not match {} body bytes",
            bytes.len() - 4
        )));
    }
    String::from_utf8(bytes[4..].to_vec())
        .map_err(|err| CellError::UnexpectedTag(err.to_string()))
}

/// Proof binding a session id to a wallet address, relay endpoint, and the
/// app public key the wallet echoes back.
pub fn wallet_binding_proof(
    session_id: &AppPublicKey,
    address: &Address,
    endpoint: &str,
    app_public_key: &AppPublicKey,
) -> Result<Cell, CellError> {
    let mut endpoint_cell = CellBuilder::new();
    endpoint_cell.store_snake_bytes(endpoint.as_bytes())?;
    let mut key_cell = CellBuilder::new();
    key_cell.store_bytes(app_public_key.as_bytes())?;

    let mut builder = CellBuilder::new();
    builder
        .store_coins(0)?
        .store_bytes(session_id.as_bytes())?
        .store_address(address)?
        .store_bit(true)? // app key present
        .store_ref(endpoint_cell.build()?)?
        .store_ref(key_cell.build()?)?;
    builder.build()
}

/// Proof delegating a domain-scoped subkey, local provider mode only.
pub fn subkey_binding_proof(
    subkey_public_key: &[u8; 32],
    time: u32,
    address: &Address,
    domain: &str,
) -> Result<Cell, CellError> {
    let mut domain_cell = CellBuilder::new();
    domain_cell.store_snake_bytes(domain.as_bytes())?;

    let mut builder = CellBuilder::new();
    builder
        .store_coins(0)?
        .store_bytes(subkey_public_key)?
        .store_uint(time as u64, 32)?
        .store_address(address)?
        .store_ref(domain_cell.build()?)?;
    builder.build()
}

#[derive(Debug, Clone)]
pub struct TransactionJob<'a> {
    pub app_public_key: &'a AppPublicKey,
    /// Unix seconds after which the wallet must refuse the job.
    pub expires: u32,
    pub to: &'a Address,
    pub value: u64,
    pub text: Option<&'a str>,
    pub payload: Option<Cell>,
    pub state_init: Option<Cell>,
}

pub fn transaction_job_cell(job: &TransactionJob<'_>) -> Result<Cell, CellError> {
    let mut body = CellBuilder::new();
    body.store_address(job.to)?
        .store_coins(job.value)?
        .store_ref(comment_cell(job.text.unwrap_or_default())?)?
        .store_maybe_ref(job.payload.clone())?
        .store_maybe_ref(job.state_init.clone())?;

    let mut builder = CellBuilder::new();
    builder
        .store_bytes(job.app_public_key.as_bytes())?
        .store_uint(job.expires as u64, 32)?
        .store_coins(0)?
        .store_ref(body.build()?)?;
    builder.build()
}

#[derive(Debug, Clone)]
pub struct SignJob<'a> {
    pub app_public_key: &'a AppPublicKey,
    pub expires: u32,
    pub text: Option<&'a str>,
    pub payload: Option<Cell>,
}

pub fn sign_job_cell(job: &SignJob<'_>) -> Result<Cell, CellError> {
    let mut body = CellBuilder::new();
    body.store_ref(comment_cell(job.text.unwrap_or_default())?)?
        .store_ref(job.payload.clone().unwrap_or_else(Cell::empty))?;

    let mut builder = CellBuilder::new();
    builder
        .store_bytes(job.app_public_key.as_bytes())?
        .store_uint(job.expires as u64, 32)?
        .store_coins(1)?
        .store_ref(body.build()?)?;
    builder.build()
}

/// What a correct wallet actually signs when answering a sign job: the
/// comment and payload cells only, no address or value.
pub fn sign_response_payload(
    text: Option<&str>,
    payload: Option<&Cell>,
) -> Result<Cell, CellError> {
    let mut builder = CellBuilder::new();
    builder
        .store_ref(comment_cell(text.unwrap_or_default())?)?
        .store_ref(payload.cloned().unwrap_or_else(Cell::empty))?;
    builder.build()
}

/// A signed job as submitted to the relay.
#[derive(Debug, Clone)]
pub struct JobEnvelope {
    pub signature: [u8; 64],
    pub public_key: AppPublicKey,
    pub job: Cell,
}

/// Signs the job cell with the session keypair and wraps
/// `{signature, public key, job}` into the transport blob.
pub fn seal_job(keypair: &SessionKeypair, job: &Cell) -> Result<Vec<u8>, CryptoError> {
    let signature = keypair.sign_hash(&job.repr_hash());
    let mut builder = CellBuilder::new();
    builder
        .store_bytes(&signature)?
        .store_bytes(keypair.public_key().as_bytes())?
        .store_ref(job.clone())?;
    Ok(boc::serialize(&builder.build()?))
}

pub fn open_job(bytes: &[u8]) -> Result<JobEnvelope, CryptoError> {
    let envelope = boc::parse(bytes)?;
    let mut slice = envelope.begin_parse();
    let signature_bytes = slice.load_bytes(64)?;
    let mut signature = [0u8; 64];
    signature.copy_from_slice(&signature_bytes);
    let public_key = AppPublicKey::from_slice(&slice.load_bytes(32)?)?;
    let job = (*slice.load_ref()?).clone();
    Ok(JobEnvelope {
        signature,
        public_key,
        job,
    })
}

/// Result blob a wallet returns for a completed sign job: its signature over
/// the sign-response payload plus its public key.
pub fn seal_sign_result(
    signature: &[u8; 64],
    public_key: &WalletPublicKey,
) -> Result<Vec<u8>, CellError> {
    let mut builder = CellBuilder::new();
    builder
        .store_bytes(signature)?
        .store_bytes(public_key.as_bytes())?;
    Ok(boc::serialize(&builder.build()?))
}

pub fn open_sign_result(bytes: &[u8]) -> Result<([u8; 64], WalletPublicKey), CryptoError> {
    let cell = boc::parse(bytes)?;
    let mut slice = cell.begin_parse();
    let signature_bytes = slice.load_bytes(64)?;
    let mut signature = [0u8; 64];
    signature.copy_from_slice(&signature_bytes);
    let public_key = WalletPublicKey::from_slice(&slice.load_bytes(32)?)?;
    Ok((signature, public_key))
}

#[cfg(test)]
mod tests {
    use tonx_cell::CellBuilder;
    use tonx_types::{Address, AppPublicKey, SessionSeed};

    use super::{
        comment_cell, open_job, read_comment_cell, seal_job, sign_job_cell, sign_response_payload,
        transaction_job_cell, wallet_binding_proof, SignJob, TransactionJob,
    };
    use crate::keypair::SessionKeypair;

    #[test]
    fn comment_cell_round_trips_long_text() {
        let text = "a".repeat(500);
        let cell = comment_cell(&text).unwrap();
        assert_eq!(read_comment_cell(&cell).unwrap(), text);
    }

    #[test]
    fn binding_proof_is_field_sensitive() {
        let session = AppPublicKey::new([0x01; 32]);
        let address = Address::new(0, [0x02; 32]);
        let app_key = AppPublicKey::new([0x03; 32]);
        let base = wallet_binding_proof(&session, &address, "connect.example", &app_key).unwrap();
        let other_endpoint =
            wallet_binding_proof(&session, &address, "connect.example2", &app_key).unwrap();
        let other_key = wallet_binding_proof(
            &session,
            &address,
            "connect.example",
            &AppPublicKey::new([0x04; 32]),
        )
        .unwrap();
        assert_ne!(base.repr_hash(), other_endpoint.repr_hash());
        assert_ne!(base.repr_hash(), other_key.repr_hash());
    }

    #[test]
    fn transaction_and_sign_jobs_differ_by_marker() {
        let app_key = AppPublicKey::new([0x05; 32]);
        let to = Address::new(0, [0x06; 32]);
        let tx = transaction_job_cell(&TransactionJob {
            app_public_key: &app_key,
            expires: 1_700_000_000,
            to: &to,
            value: 1_000_000_000,
            text: Some("hi"),
            payload: None,
            state_init: None,
        })
        .unwrap();
        let sign = sign_job_cell(&SignJob {
            app_public_key: &app_key,
            expires: 1_700_000_000,
            text: Some("hi"),
            payload: None,
        })
        .unwrap();
        assert_ne!(tx.repr_hash(), sign.repr_hash());
    }

    #[test]
    fn envelope_round_trip_recovers_signature_key_and_job() {
        let keypair = SessionKeypair::from_seed(&SessionSeed::new([0x21; 32]));
        let mut job = CellBuilder::new();
        job.store_uint(0x4a4f42, 24).unwrap();
        let job = job.build().unwrap();

        let blob = seal_job(&keypair, &job).unwrap();
        let envelope = open_job(&blob).unwrap();
        assert_eq!(envelope.public_key, keypair.public_key());
        assert_eq!(envelope.job, job);
        assert_eq!(envelope.signature, keypair.sign_hash(&job.repr_hash()));
    }

    #[test]
    fn sign_response_payload_ignores_address_and_value() {
        let a = sign_response_payload(Some("msg"), None).unwrap();
        let b = sign_response_payload(Some("msg"), None).unwrap();
        assert_eq!(a.repr_hash(), b.repr_hash());
        let c = sign_response_payload(Some("other"), None).unwrap();
        assert_ne!(a.repr_hash(), c.repr_hash());
    }
}
