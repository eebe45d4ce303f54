//! Wallet-type decoding: recovering `(public key, address)` from a
//! server-relayed wallet config blob.
//!
//! Decoders are keyed by wallet-type string so additional wallet formats can
//! be added without touching the verifier. One variant ships today: the v4
//! wallet, whose address is a deterministic function of its public key,
//! subwallet id, and code cell.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tonx_cell::{boc, Cell, CellBuilder, CellError};
use tonx_types::{Address, WalletPublicKey};

use crate::error::CryptoError;

pub const WALLET_V4_TYPE: &str = "org.ton.wallets.v4";
pub const WALLET_V4_SUBWALLET_ID: u32 = 698_983_191;

/// Identity of the v4 wallet code cell. The connector never executes wallet
/// code; address derivation depends only on this cell's hash.
const WALLET_V4_CODE: [u8; 32] = [
    0xfe, 0xb5, 0xff, 0x68, 0x20, 0xe2, 0xff, 0x0d, 0x94, 0x83, 0xe7, 0xe0, 0xd6, 0x2c, 0x81,
    0x7d, 0x84, 0x67, 0x89, 0xfb, 0x4a, 0xe5, 0x80, 0xc8, 0x78, 0x86, 0x6d, 0x95, 0x9d, 0xab,
    0xd5, 0xc0,
];

pub trait WalletCodec: Send + Sync {
    fn wallet_type(&self) -> &'static str;

    /// Decodes the opaque wallet config blob into the wallet's public key
    /// and derived address. Fails closed on any malformed input.
    fn extract(&self, wallet_config: &str) -> Result<(WalletPublicKey, Address), CryptoError>;
}

/// Registry of wallet decoders keyed by wallet-type string.
pub struct WalletCodecRegistry {
    codecs: Vec<Box<dyn WalletCodec>>,
}

impl WalletCodecRegistry {
    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    pub fn register(&mut self, codec: Box<dyn WalletCodec>) {
        self.codecs.push(codec);
    }

    pub fn get(&self, wallet_type: &str) -> Option<&dyn WalletCodec> {
        self.codecs
            .iter()
            .find(|codec| codec.wallet_type() == wallet_type)
            .map(Box::as_ref)
    }

    pub fn extract(
        &self,
        wallet_type: &str,
        wallet_config: &str,
    ) -> Result<(WalletPublicKey, Address), CryptoError> {
        let codec = self
            .get(wallet_type)
            .ok_or_else(|| CryptoError::UnknownWalletType(wallet_type.to_string()))?;
        codec.extract(wallet_config)
    }
}

impl Default for WalletCodecRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(WalletV4Codec));
        registry
    }
}

pub struct WalletV4Codec;

impl WalletCodec for WalletV4Codec {
    fn wallet_type(&self) -> &'static str {
        WALLET_V4_TYPE
    }

    fn extract(&self, wallet_config: &str) -> Result<(WalletPublicKey, Address), CryptoError> {
        let bytes = STANDARD
            .decode(wallet_config)
            .map_err(|err| CryptoError::ConfigDecode(err.to_string()))?;
        let cell =
            boc::parse(&bytes).map_err(|err| CryptoError::ConfigDecode(err.to_string()))?;
        let mut slice = cell.begin_parse();
        let seqno = slice
            .load_uint(32)
            .map_err(|err| CryptoError::ConfigDecode(err.to_string()))?;
        if seqno != 0 {
            return Err(CryptoError::ConfigDecode(format!(
                "initial seqno must be 0, got {seqno}"
            )));
        }
        let subwallet_id = slice
            .load_uint(32)
            .map_err(|err| CryptoError::ConfigDecode(err.to_string()))? as u32;
        let key_bytes = slice
            .load_bytes(32)
            .map_err(|err| CryptoError::ConfigDecode(err.to_string()))?;
        let public_key = WalletPublicKey::from_slice(&key_bytes)?;
        let address = derive_wallet_v4_address(&public_key, subwallet_id)?;
        Ok((public_key, address))
    }
}

/// Canonical wallet config blob for a v4 wallet: the initial data cell,
/// BOC-serialized and base64 encoded.
pub fn encode_wallet_v4_config(
    public_key: &WalletPublicKey,
    subwallet_id: u32,
) -> Result<String, CellError> {
    Ok(boc::serialize_base64(&wallet_v4_data(
        public_key,
        subwallet_id,
    )?))
}

/// Address of a v4 wallet: workchain 0, hash of the state-init cell built
/// from the code cell and the initial data cell.
pub fn derive_wallet_v4_address(
    public_key: &WalletPublicKey,
    subwallet_id: u32,
) -> Result<Address, CellError> {
    let mut state_init = CellBuilder::new();
    state_init
        .store_bit(false)? // no split depth
        .store_bit(false)? // not special
        .store_bit(true)?
        .store_ref(wallet_v4_code()?)?
        .store_bit(true)?
        .store_ref(wallet_v4_data(public_key, subwallet_id)?)?
        .store_bit(false)?; // no libraries
    Ok(Address::new(0, state_init.build()?.repr_hash()))
}

fn wallet_v4_data(public_key: &WalletPublicKey, subwallet_id: u32) -> Result<Cell, CellError> {
    let mut data = CellBuilder::new();
    data.store_uint(0, 32)? // seqno
        .store_uint(subwallet_id as u64, 32)?
        .store_bytes(public_key.as_bytes())?;
    data.build()
}

fn wallet_v4_code() -> Result<Cell, CellError> {
    let mut code = CellBuilder::new();
    code.store_bytes(&WALLET_V4_CODE)?;
    code.build()
}
