use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CellError {
    #[error("cell data overflow: {requested} bits requested, {available} available")]
    BitsOverflow { requested: usize, available: usize },
    #[error("cell reference overflow: at most {0} references per cell")]
    RefsOverflow(usize),
    #[error("value 0x{value:x} does not fit in {bits} bits")]
    ValueOutOfRange { value: u64, bits: usize },
    #[error("cell data underflow: {requested} bits requested, {available} remaining")]
    BitsUnderflow { requested: usize, available: usize },
    #[error("cell reference underflow")]
    RefsUnderflow,
    #[error("unexpected tag at cell offset: {0}")]
    UnexpectedTag(String),
    #[error("bag of cells: {0}")]
    Boc(String),
    #[error("invalid base64: {0}")]
    Base64(String),
}
