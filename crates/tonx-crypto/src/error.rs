use thiserror::Error;

use tonx_cell::CellError;
use tonx_types::ValidationError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("unknown wallet type `{0}`")]
    UnknownWalletType(String),
    #[error("wallet config decode failed: {0}")]
    ConfigDecode(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Cell(#[from] CellError),
}
