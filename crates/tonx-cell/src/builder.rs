//! Bit-level cell construction.

use std::sync::Arc;

use tonx_types::Address;

use crate::cell::{Cell, MAX_BITS, MAX_REFS};
use crate::error::CellError;

/// Builder for a single cell. Writes are most-significant-bit first; every
/// store reports overflow instead of truncating.
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remaining_bits(&self) -> usize {
        MAX_BITS - self.bit_len
    }

    pub fn remaining_refs(&self) -> usize {
        MAX_REFS - self.refs.len()
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CellError> {
        if self.bit_len >= MAX_BITS {
            return Err(CellError::BitsOverflow {
                requested: 1,
                available: 0,
            });
        }
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let byte = self.data.len() - 1;
            self.data[byte] |= 1 << (7 - self.bit_len % 8);
        }
        self.bit_len += 1;
        Ok(self)
    }

    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 64 || (bits < 64 && value >> bits != 0) {
            return Err(CellError::ValueOutOfRange { value, bits });
        }
        if bits > self.remaining_bits() {
            return Err(CellError::BitsOverflow {
                requested: bits,
                available: self.remaining_bits(),
            });
        }
        for i in (0..bits).rev() {
            self.store_bit((value >> i) & 1 == 1)?;
        }
        Ok(self)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        if bytes.len() * 8 > self.remaining_bits() {
            return Err(CellError::BitsOverflow {
                requested: bytes.len() * 8,
                available: self.remaining_bits(),
            });
        }
        for byte in bytes {
            self.store_uint(*byte as u64, 8)?;
        }
        Ok(self)
    }

    /// VarUInteger-16 coin amount: 4-bit byte length, then that many bytes.
    pub fn store_coins(&mut self, value: u64) -> Result<&mut Self, CellError> {
        let len = (8 - value.leading_zeros() as usize / 8).min(8);
        self.store_uint(len as u64, 4)?;
        if len > 0 {
            self.store_uint(value, len * 8)?;
        }
        Ok(self)
    }

    /// Standard internal address: 3-bit tag `100`, 8-bit workchain, 256-bit
    /// account hash.
    pub fn store_address(&mut self, address: &Address) -> Result<&mut Self, CellError> {
        self.store_uint(0b100, 3)?;
        self.store_uint(address.workchain as u8 as u64, 8)?;
        self.store_bytes(&address.hash)?;
        Ok(self)
    }

    pub fn store_ref(&mut self, cell: Cell) -> Result<&mut Self, CellError> {
        if self.refs.len() >= MAX_REFS {
            return Err(CellError::RefsOverflow(MAX_REFS));
        }
        self.refs.push(Arc::new(cell));
        Ok(self)
    }

    /// Optional reference: presence bit followed by the reference when set.
    pub fn store_maybe_ref(&mut self, cell: Option<Cell>) -> Result<&mut Self, CellError> {
        match cell {
            Some(cell) => {
                self.store_bit(true)?;
                self.store_ref(cell)?;
            }
            None => {
                self.store_bit(false)?;
            }
        }
        Ok(self)
    }

    /// Stores bytes as a snake: as much as fits here, the remainder chained
    /// through single trailing references. Never truncates.
    pub fn store_snake_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        let fit = (self.remaining_bits() / 8).min(bytes.len());
        self.store_bytes(&bytes[..fit])?;
        let rest = &bytes[fit..];
        if !rest.is_empty() {
            if self.remaining_refs() == 0 {
                return Err(CellError::RefsOverflow(MAX_REFS));
            }
            let mut tail = CellBuilder::new();
            tail.store_snake_bytes(rest)?;
            self.store_ref(tail.build()?)?;
        }
        Ok(self)
    }

    pub fn build(self) -> Result<Cell, CellError> {
        Ok(Cell::new(self.data, self.bit_len, self.refs))
    }
}
