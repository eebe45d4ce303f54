//! Single-root bag-of-cells codec.
//!
//! Cells are written in pre-order without deduplication, so every reference
//! points forward; the optional index and checksum sections are not emitted,
//! and are skipped when present on parse.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::cell::{Cell, MAX_BITS, MAX_REFS};
use crate::error::CellError;

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];
const FLAG_HAS_IDX: u8 = 0x80;
const FLAG_HAS_CRC: u8 = 0x40;
const FLAG_HAS_CACHE_BITS: u8 = 0x20;

pub fn serialize(root: &Cell) -> Vec<u8> {
    let mut cells = Vec::new();
    collect_pre_order(root, &mut cells);

    let ref_size = min_bytes(cells.len() as u64);
    let total_size: u64 = cells
        .iter()
        .map(|c| (2 + c.padded_data().len() + c.refs().len() * ref_size) as u64)
        .sum();
    let off_size = min_bytes(total_size);

    let mut out = Vec::new();
    out.extend_from_slice(&BOC_MAGIC);
    out.push(ref_size as u8);
    out.push(off_size as u8);
    write_be(&mut out, cells.len() as u64, ref_size);
    write_be(&mut out, 1, ref_size); // roots
    write_be(&mut out, 0, ref_size); // absent
    write_be(&mut out, total_size, off_size);
    write_be(&mut out, 0, ref_size); // root index

    // Child indexes: pre-order places each cell's subtree immediately after
    // it, so children are located by walking the flat list again.
    let mut child_index = child_indexes(&cells);
    for (i, cell) in cells.iter().enumerate() {
        out.extend_from_slice(&cell.descriptor_bytes());
        out.extend_from_slice(&cell.padded_data());
        for _ in cell.refs() {
            let child = child_index[i]
                .pop()
                .expect("child count matches ref count");
            write_be(&mut out, child as u64, ref_size);
        }
    }
    out
}

pub fn serialize_base64(root: &Cell) -> String {
    STANDARD.encode(serialize(root))
}

pub fn parse(bytes: &[u8]) -> Result<Cell, CellError> {
    let mut reader = ByteReader::new(bytes);
    if reader.take(4)? != BOC_MAGIC {
        return Err(CellError::Boc("bad magic".to_string()));
    }
    let flags_byte = reader.take(1)?[0];
    if flags_byte & FLAG_HAS_CACHE_BITS != 0 {
        return Err(CellError::Boc("cache bits unsupported".to_string()));
    }
    let has_idx = flags_byte & FLAG_HAS_IDX != 0;
    let has_crc = flags_byte & FLAG_HAS_CRC != 0;
    let ref_size = (flags_byte & 0x07) as usize;
    if ref_size == 0 || ref_size > 4 {
        return Err(CellError::Boc(format!("bad ref size {ref_size}")));
    }
    let off_size = reader.take(1)?[0] as usize;
    if off_size == 0 || off_size > 8 {
        return Err(CellError::Boc(format!("bad offset size {off_size}")));
    }
    let cell_count = reader.read_be(ref_size)? as usize;
    let root_count = reader.read_be(ref_size)? as usize;
    let absent = reader.read_be(ref_size)?;
    let _total_size = reader.read_be(off_size)?;
    if root_count != 1 || absent != 0 {
        return Err(CellError::Boc(format!(
            "expected single root without absent cells, got roots={root_count} absent={absent}"
        )));
    }
    let root_index = reader.read_be(ref_size)? as usize;
    if has_idx {
        reader.take(cell_count * off_size)?;
    }

    let mut raw: Vec<(Vec<u8>, usize, Vec<usize>)> = Vec::with_capacity(cell_count);
    for i in 0..cell_count {
        let d1 = reader.take(1)?[0];
        let d2 = reader.take(1)?[0];
        if d1 & 0x08 != 0 {
            return Err(CellError::Boc("exotic cells unsupported".to_string()));
        }
        let ref_count = (d1 & 0x07) as usize;
        if ref_count > MAX_REFS {
            return Err(CellError::Boc(format!("cell has {ref_count} refs")));
        }
        let data_len = (d2 as usize + 1) / 2;
        let data = reader.take(data_len)?.to_vec();
        let bit_len = bit_len_from_descriptor(d2, &data)?;
        if bit_len > MAX_BITS {
            return Err(CellError::Boc(format!("cell has {bit_len} bits")));
        }
        let mut refs = Vec::with_capacity(ref_count);
        for _ in 0..ref_count {
            let child = reader.read_be(ref_size)? as usize;
            if child <= i || child >= cell_count {
                return Err(CellError::Boc(format!(
                    "reference {child} out of order from cell {i}"
                )));
            }
            refs.push(child);
        }
        raw.push((data, bit_len, refs));
    }
    if has_crc {
        reader.take(4)?;
    }

    let mut built: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
    for i in (0..cell_count).rev() {
        let (data, bit_len, ref_idxs) = &raw[i];
        let mut refs = Vec::with_capacity(ref_idxs.len());
        for idx in ref_idxs {
            refs.push(
                built[*idx]
                    .clone()
                    .ok_or_else(|| CellError::Boc("unresolved reference".to_string()))?,
            );
        }
        built[i] = Some(Arc::new(Cell::new(
            unpad(data, *bit_len),
            *bit_len,
            refs,
        )));
    }
    let root = built
        .get(root_index)
        .and_then(Clone::clone)
        .ok_or_else(|| CellError::Boc("root index out of range".to_string()))?;
    Ok((*root).clone())
}

pub fn parse_base64(value: &str) -> Result<Cell, CellError> {
    let bytes = STANDARD
        .decode(value)
        .map_err(|err| CellError::Base64(err.to_string()))?;
    parse(&bytes)
}

fn collect_pre_order(cell: &Cell, out: &mut Vec<Cell>) {
    out.push(cell.clone());
    for child in cell.refs() {
        collect_pre_order(child, out);
    }
}

/// For each cell in the pre-order list, its children's flat indexes in
/// reverse order (popped back off in forward order during writing).
fn child_indexes(cells: &[Cell]) -> Vec<Vec<usize>> {
    fn subtree_size(cell: &Cell) -> usize {
        1 + cell.refs().iter().map(|r| subtree_size(r)).sum::<usize>()
    }
    cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let mut next = i + 1;
            let mut children = Vec::with_capacity(cell.refs().len());
            for child in cell.refs() {
                children.push(next);
                next += subtree_size(child);
            }
            children.reverse();
            children
        })
        .collect()
}

fn bit_len_from_descriptor(d2: u8, data: &[u8]) -> Result<usize, CellError> {
    let full_bytes = (d2 / 2) as usize;
    if d2 % 2 == 0 {
        return Ok(full_bytes * 8);
    }
    let last = *data
        .last()
        .ok_or_else(|| CellError::Boc("partial byte descriptor on empty data".to_string()))?;
    if last == 0 {
        return Err(CellError::Boc("missing completion tag".to_string()));
    }
    Ok(data.len() * 8 - last.trailing_zeros() as usize - 1)
}

fn unpad(data: &[u8], bit_len: usize) -> Vec<u8> {
    let mut out = data[..(bit_len + 7) / 8].to_vec();
    if bit_len % 8 != 0 {
        let keep = bit_len % 8;
        let last = out.len() - 1;
        out[last] &= !(0xffu8 >> keep);
    }
    out
}

fn min_bytes(value: u64) -> usize {
    let mut bytes = 1;
    while value >> (bytes * 8) != 0 {
        bytes += 1;
    }
    bytes
}

fn write_be(out: &mut Vec<u8>, value: u64, bytes: usize) {
    for i in (0..bytes).rev() {
        out.push((value >> (i * 8)) as u8);
    }
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CellError> {
        if self.pos + len > self.bytes.len() {
            return Err(CellError::Boc("truncated".to_string()));
        }
        let out = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn read_be(&mut self, bytes: usize) -> Result<u64, CellError> {
        let mut value = 0u64;
        for byte in self.take(bytes)? {
            value = (value << 8) | *byte as u64;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, parse_base64, serialize, serialize_base64};
    use crate::builder::CellBuilder;

    #[test]
    fn round_trips_nested_tree() {
        let mut leaf_a = CellBuilder::new();
        leaf_a.store_uint(0xaa, 8).unwrap();
        let mut leaf_b = CellBuilder::new();
        leaf_b.store_uint(0xbbbb, 16).unwrap();
        let mut mid = CellBuilder::new();
        mid.store_uint(3, 5).unwrap();
        mid.store_ref(leaf_b.build().unwrap()).unwrap();
        let mut root = CellBuilder::new();
        root.store_uint(0x1234_5678, 32).unwrap();
        root.store_ref(leaf_a.build().unwrap()).unwrap();
        root.store_ref(mid.build().unwrap()).unwrap();
        let root = root.build().unwrap();

        let bytes = serialize(&root);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed, root);
        assert_eq!(parsed.repr_hash(), root.repr_hash());
    }

    #[test]
    fn round_trips_partial_bit_cells() {
        let mut b = CellBuilder::new();
        b.store_uint(5, 3).unwrap();
        b.store_bit(true).unwrap();
        let cell = b.build().unwrap();
        assert_eq!(parse(&serialize(&cell)).unwrap(), cell);
    }

    #[test]
    fn base64_round_trip() {
        let mut b = CellBuilder::new();
        b.store_bytes(b"payload").unwrap();
        let cell = b.build().unwrap();
        assert_eq!(parse_base64(&serialize_base64(&cell)).unwrap(), cell);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse(b"not a boc").is_err());
        assert!(parse_base64("####").is_err());
    }
}
