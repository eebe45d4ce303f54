//! Immutable cells and their standard representation hash.
//!
//! Only ordinary level-0 cells are modeled; exotic cells never appear in the
//! connector protocol.

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

/// Maximum data bits a single cell can hold.
pub const MAX_BITS: usize = 1023;
/// Maximum child references per cell.
pub const MAX_REFS: usize = 4;

#[derive(Clone, PartialEq, Eq)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl Cell {
    pub(crate) fn new(data: Vec<u8>, bit_len: usize, refs: Vec<Arc<Cell>>) -> Self {
        debug_assert!(bit_len <= MAX_BITS);
        debug_assert!(refs.len() <= MAX_REFS);
        debug_assert_eq!(data.len(), (bit_len + 7) / 8);
        Self {
            data,
            bit_len,
            refs,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, Vec::new())
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    pub fn depth(&self) -> u16 {
        self.refs
            .iter()
            .map(|r| r.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Standard representation hash: sha256 over descriptor bytes, padded
    /// data, child depths, and child hashes. Field order is part of the
    /// signed contract.
    pub fn repr_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.descriptor_bytes());
        hasher.update(self.padded_data());
        for child in &self.refs {
            hasher.update(child.depth().to_be_bytes());
        }
        for child in &self.refs {
            hasher.update(child.repr_hash());
        }
        hasher.finalize().into()
    }

    pub(crate) fn descriptor_bytes(&self) -> [u8; 2] {
        let d1 = self.refs.len() as u8;
        let d2 = (self.bit_len / 8 + (self.bit_len + 7) / 8) as u8;
        [d1, d2]
    }

    /// Data bytes with the completion tag applied when the bit length is not
    /// byte-aligned.
    pub(crate) fn padded_data(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if self.bit_len % 8 != 0 {
            let last = out
                .last_mut()
                .expect("partial bits imply at least one byte");
            *last |= 1 << (7 - self.bit_len % 8);
        }
        out
    }

    pub fn begin_parse(&self) -> crate::slice::CellSlice<'_> {
        crate::slice::CellSlice::new(self)
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cell {{ bits: {}, refs: {}, hash: {} }}",
            self.bit_len,
            self.refs.len(),
            hex::encode(&self.repr_hash()[..8])
        )
    }
}
