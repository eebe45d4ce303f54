//! Cell readers.

use std::sync::Arc;

use tonx_types::Address;

use crate::cell::Cell;
use crate::error::CellError;

/// Cursor over a cell's data bits and references.
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> CellSlice<'a> {
    pub(crate) fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.refs().len() - self.ref_pos
    }

    pub fn load_bit(&mut self) -> Result<bool, CellError> {
        if self.remaining_bits() == 0 {
            return Err(CellError::BitsUnderflow {
                requested: 1,
                available: 0,
            });
        }
        let byte = self.cell.data()[self.bit_pos / 8];
        let bit = byte & (1 << (7 - self.bit_pos % 8)) != 0;
        self.bit_pos += 1;
        Ok(bit)
    }

    pub fn load_uint(&mut self, bits: usize) -> Result<u64, CellError> {
        if bits > 64 {
            return Err(CellError::BitsUnderflow {
                requested: bits,
                available: 64,
            });
        }
        if bits > self.remaining_bits() {
            return Err(CellError::BitsUnderflow {
                requested: bits,
                available: self.remaining_bits(),
            });
        }
        let mut value = 0u64;
        for _ in 0..bits {
            value = (value << 1) | self.load_bit()? as u64;
        }
        Ok(value)
    }

    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>, CellError> {
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.load_uint(8)? as u8);
        }
        Ok(out)
    }

    pub fn load_coins(&mut self) -> Result<u64, CellError> {
        let len = self.load_uint(4)? as usize;
        if len > 8 {
            return Err(CellError::UnexpectedTag(format!(
                "coin amount of {len} bytes exceeds u64"
            )));
        }
        if len == 0 {
            return Ok(0);
        }
        self.load_uint(len * 8)
    }

    pub fn load_address(&mut self) -> Result<Address, CellError> {
        let tag = self.load_uint(3)?;
        if tag != 0b100 {
            return Err(CellError::UnexpectedTag(format!(
                "address tag {tag:#05b}, expected 0b100"
            )));
        }
        let workchain = self.load_uint(8)? as u8 as i8;
        let bytes = self.load_bytes(32)?;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes);
        Ok(Address::new(workchain, hash))
    }

    pub fn load_ref(&mut self) -> Result<Arc<Cell>, CellError> {
        let cell = self
            .cell
            .refs()
            .get(self.ref_pos)
            .cloned()
            .ok_or(CellError::RefsUnderflow)?;
        self.ref_pos += 1;
        Ok(cell)
    }

    pub fn load_maybe_ref(&mut self) -> Result<Option<Arc<Cell>>, CellError> {
        if self.load_bit()? {
            Ok(Some(self.load_ref()?))
        } else {
            Ok(None)
        }
    }
}

/// Reads a snake written by `CellBuilder::store_snake_bytes`: the full bytes
/// of each cell, following the trailing reference chain.
pub fn read_snake_bytes(cell: &Cell) -> Result<Vec<u8>, CellError> {
    let mut out = Vec::new();
    let mut current = cell.clone();
    loop {
        let full_bytes = current.bit_len() / 8;
        let mut slice = current.begin_parse();
        out.extend(slice.load_bytes(full_bytes)?);
        match current.refs().first().cloned() {
            Some(next) => current = (*next).clone(),
            None => return Ok(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::CellBuilder;

    #[test]
    fn underflow_is_reported() {
        let mut b = CellBuilder::new();
        b.store_uint(1, 4).unwrap();
        let cell = b.build().unwrap();
        let mut slice = cell.begin_parse();
        assert!(slice.load_uint(8).is_err());
    }

    #[test]
    fn maybe_ref_round_trip() {
        let mut inner = CellBuilder::new();
        inner.store_uint(9, 8).unwrap();
        let inner = inner.build().unwrap();

        let mut b = CellBuilder::new();
        b.store_maybe_ref(Some(inner.clone())).unwrap();
        b.store_maybe_ref(None).unwrap();
        let cell = b.build().unwrap();

        let mut slice = cell.begin_parse();
        let first = slice.load_maybe_ref().unwrap().unwrap();
        assert_eq!(*first, inner);
        assert!(slice.load_maybe_ref().unwrap().is_none());
    }
}
