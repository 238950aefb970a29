// Copyright (c) 2025 ADBC Drivers Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Block arena for decoded text cells.
//!
//! Cell bytes are appended back to back into fixed-size data blocks; a
//! parallel set of index ("meta") blocks records `(offset, length)` per logical
//! cell. A cell may cross block boundaries and is reassembled on read.
//!
//! ```text
//! data blocks:  [ c0 c1 c2 c3| c3 c4 ... ][ ... ]
//! meta blocks:  offsets[0..2^15]  lengths[0..2^15]   (per meta block)
//! ```
//!
//! [`CellStore::reset`] rewinds the write position but keeps every block, so a
//! chunk object recycled for the next descriptor decodes into memory that is
//! already allocated. [`CellStore::clear`] releases the blocks.

use crate::error::{ErrorHelper, Result};
use std::borrow::Cow;

/// Length value that marks a SQL NULL cell.
pub const NULL_LENGTH: u32 = u32::MAX;

/// log2 of the default data block size (8 MiB).
pub const DEFAULT_DATA_BLOCK_SHIFT: u32 = 23;
/// log2 of the default number of cells per meta block.
pub const DEFAULT_META_BLOCK_SHIFT: u32 = 15;
/// Upper bound on blocks reserved up front from a descriptor's sizes.
const MAX_RESERVED_BLOCKS: usize = 1024;

/// Arena holding the cells of one text chunk.
#[derive(Debug)]
pub struct CellStore {
    data_shift: u32,
    meta_shift: u32,
    data_blocks: Vec<Box<[u8]>>,
    offsets: Vec<Box<[u64]>>,
    lengths: Vec<Box<[u32]>>,
    write_offset: u64,
    cell_count: usize,
}

impl Default for CellStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CellStore {
    pub fn new() -> Self {
        Self::with_block_shifts(DEFAULT_DATA_BLOCK_SHIFT, DEFAULT_META_BLOCK_SHIFT)
    }

    /// Arena with `2^data_shift` byte data blocks and `2^meta_shift` cells per
    /// meta block.
    pub fn with_block_shifts(data_shift: u32, meta_shift: u32) -> Self {
        Self {
            data_shift,
            meta_shift,
            data_blocks: Vec::new(),
            offsets: Vec::new(),
            lengths: Vec::new(),
            write_offset: 0,
            cell_count: 0,
        }
    }

    #[inline]
    fn data_block_size(&self) -> usize {
        1usize << self.data_shift
    }

    #[inline]
    fn meta_block_size(&self) -> usize {
        1usize << self.meta_shift
    }

    /// Number of cells written since the last reset.
    pub fn len(&self) -> usize {
        self.cell_count
    }

    pub fn is_empty(&self) -> bool {
        self.cell_count == 0
    }

    /// Bytes of cell data written since the last reset.
    pub fn bytes_used(&self) -> u64 {
        self.write_offset
    }

    /// Data blocks currently held, whether in use or retained for reuse.
    pub fn allocated_blocks(&self) -> usize {
        self.data_blocks.len()
    }

    /// Append one cell; `None` is SQL NULL.
    pub fn add(&mut self, cell: Option<&[u8]>) -> Result<()> {
        match cell {
            Some(bytes) => self.push(bytes),
            None => {
                self.push_null();
                Ok(())
            }
        }
    }

    /// Append a SQL NULL. Data blocks are not touched.
    pub fn push_null(&mut self) {
        let (meta_block, meta_slot) = self.claim_slot();
        self.offsets[meta_block][meta_slot] = self.write_offset;
        self.lengths[meta_block][meta_slot] = NULL_LENGTH;
    }

    /// Append a non-null cell.
    ///
    /// Lengths are stored as `u32` with `u32::MAX` reserved for NULL, so a
    /// cell of 4 GiB or more is rejected.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        let length = cell_length(bytes.len())?;
        let end = self.write_offset + u64::from(length);
        self.ensure_data_capacity(end);

        let (meta_block, meta_slot) = self.claim_slot();
        self.offsets[meta_block][meta_slot] = self.write_offset;
        self.lengths[meta_block][meta_slot] = length;
        self.copy_in(self.write_offset, bytes);
        self.write_offset = end;
        Ok(())
    }

    fn claim_slot(&mut self) -> (usize, usize) {
        let index = self.cell_count;
        self.ensure_meta_capacity(index);
        self.cell_count += 1;
        (
            index >> self.meta_shift,
            index & (self.meta_block_size() - 1),
        )
    }

    /// Read back cell `index`. `None` is SQL NULL.
    ///
    /// Cells inside one block are borrowed; cells spanning blocks are copied
    /// into an owned buffer.
    pub fn get(&self, index: usize) -> Option<Cow<'_, [u8]>> {
        if index >= self.cell_count {
            return None;
        }

        let meta_block = index >> self.meta_shift;
        let meta_slot = index & (self.meta_block_size() - 1);
        let length = self.lengths[meta_block][meta_slot];
        if length == NULL_LENGTH {
            return None;
        }
        if length == 0 {
            return Some(Cow::Borrowed(&[]));
        }

        let offset = self.offsets[meta_block][meta_slot];
        let length = length as usize;
        let block = (offset >> self.data_shift) as usize;
        let start = (offset as usize) & (self.data_block_size() - 1);

        if start + length <= self.data_block_size() {
            return Some(Cow::Borrowed(&self.data_blocks[block][start..start + length]));
        }

        let mut assembled = Vec::with_capacity(length);
        let mut block = block;
        let mut start = start;
        while assembled.len() < length {
            let take = (length - assembled.len()).min(self.data_block_size() - start);
            assembled.extend_from_slice(&self.data_blocks[block][start..start + take]);
            block += 1;
            start = 0;
        }
        Some(Cow::Owned(assembled))
    }

    /// Rewind for a new chunk without giving memory back.
    ///
    /// `expected_size` (decompressed payload bytes) and the cell count are
    /// only capacity hints for the block lists, capped at
    /// `MAX_RESERVED_BLOCKS` blocks each.
    pub fn reset(&mut self, row_count: usize, column_count: usize, expected_size: usize) {
        self.write_offset = 0;
        self.cell_count = 0;

        let wanted_blocks = expected_size
            .div_ceil(self.data_block_size())
            .min(MAX_RESERVED_BLOCKS);
        if wanted_blocks > self.data_blocks.len() {
            self.data_blocks.reserve(wanted_blocks - self.data_blocks.len());
        }
        let wanted_meta = row_count
            .saturating_mul(column_count)
            .div_ceil(self.meta_block_size())
            .min(MAX_RESERVED_BLOCKS);
        if wanted_meta > self.offsets.len() {
            self.offsets.reserve(wanted_meta - self.offsets.len());
            self.lengths.reserve(wanted_meta - self.lengths.len());
        }
    }

    /// Drop every block. Used when the chunk will not be recycled.
    pub fn clear(&mut self) {
        self.data_blocks = Vec::new();
        self.offsets = Vec::new();
        self.lengths = Vec::new();
        self.write_offset = 0;
        self.cell_count = 0;
    }

    fn ensure_meta_capacity(&mut self, index: usize) {
        let needed = (index >> self.meta_shift) + 1;
        while self.offsets.len() < needed {
            let size = self.meta_block_size();
            self.offsets.push(vec![0u64; size].into_boxed_slice());
            self.lengths.push(vec![0u32; size].into_boxed_slice());
        }
    }

    fn ensure_data_capacity(&mut self, end: u64) {
        while ((self.data_blocks.len() as u64) << self.data_shift) < end {
            let size = self.data_block_size();
            self.data_blocks.push(vec![0u8; size].into_boxed_slice());
        }
    }

    fn copy_in(&mut self, offset: u64, mut bytes: &[u8]) {
        let block_size = self.data_block_size();
        let mut block = (offset >> self.data_shift) as usize;
        let mut start = (offset as usize) & (block_size - 1);
        while !bytes.is_empty() {
            let take = bytes.len().min(block_size - start);
            self.data_blocks[block][start..start + take].copy_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
            block += 1;
            start = 0;
        }
    }
}

fn cell_length(len: usize) -> Result<u32> {
    match u32::try_from(len) {
        Ok(length) if length != NULL_LENGTH => Ok(length),
        _ => Err(ErrorHelper::decode().message(format!(
            "cell of {} bytes exceeds the maximum cell size",
            len
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_straddling_blocks() {
        // 8-byte data blocks
        let mut store = CellStore::with_block_shifts(3, 2);
        store.push(b"abc").unwrap();
        store.push(b"0123456789").unwrap();

        assert_eq!(store.get(0).unwrap().as_ref(), b"abc");
        assert_eq!(store.get(1).unwrap().as_ref(), b"0123456789");
        assert!(matches!(store.get(1), Some(Cow::Owned(_))));
        assert!(matches!(store.get(0), Some(Cow::Borrowed(_))));
        assert_eq!(store.allocated_blocks(), 2);
    }

    #[test]
    fn test_cell_spanning_several_blocks() {
        let mut store = CellStore::with_block_shifts(3, 2);
        let long: Vec<u8> = (0u8..30).collect();
        store.push(b"x").unwrap();
        store.push(&long).unwrap();
        store.push(b"tail").unwrap();

        assert_eq!(store.get(1).unwrap().as_ref(), long.as_slice());
        assert_eq!(store.get(2).unwrap().as_ref(), b"tail");
        assert_eq!(store.bytes_used(), 35);
    }

    #[test]
    fn test_null_then_value() {
        let mut store = CellStore::new();
        store.push_null();
        store.push(b"value").unwrap();

        assert!(store.get(0).is_none());
        assert_eq!(store.get(1).unwrap().as_ref(), b"value");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_empty_cell_is_not_null() {
        let mut store = CellStore::with_block_shifts(3, 2);
        store.push(b"12345678").unwrap();
        store.push(b"").unwrap();

        assert_eq!(store.get(1).unwrap().as_ref(), b"");
    }

    #[test]
    fn test_meta_blocks_grow() {
        // 4 cells per meta block
        let mut store = CellStore::with_block_shifts(4, 2);
        for i in 0..11u8 {
            if i % 3 == 0 {
                store.push_null();
            } else {
                store.push(&[i]).unwrap();
            }
        }

        assert_eq!(store.len(), 11);
        for i in 0..11u8 {
            match store.get(i as usize) {
                None => assert_eq!(i % 3, 0),
                Some(cell) => assert_eq!(cell.as_ref(), &[i]),
            }
        }
    }

    #[test]
    fn test_reset_keeps_blocks() {
        let mut store = CellStore::with_block_shifts(3, 2);
        for _ in 0..6 {
            store.push(b"abcdef").unwrap();
        }
        let blocks = store.allocated_blocks();
        assert!(blocks >= 4);

        store.reset(2, 2, 0);
        assert!(store.is_empty());
        assert_eq!(store.allocated_blocks(), blocks);

        store.push(b"new").unwrap();
        store.push_null();
        assert_eq!(store.get(0).unwrap().as_ref(), b"new");
        assert!(store.get(1).is_none());
        assert_eq!(store.allocated_blocks(), blocks);
    }

    #[test]
    fn test_clear_releases_blocks() {
        let mut store = CellStore::with_block_shifts(3, 2);
        store.push(b"abcdefghij").unwrap();
        store.clear();

        assert_eq!(store.allocated_blocks(), 0);
        assert!(store.is_empty());

        store.push(b"again").unwrap();
        assert_eq!(store.get(0).unwrap().as_ref(), b"again");
    }

    #[test]
    fn test_add_dispatches_on_null() {
        let mut store = CellStore::with_block_shifts(3, 2);
        store.add(Some(&b"abc"[..])).unwrap();
        store.add(None).unwrap();
        store.add(Some(&b""[..])).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.get(0).unwrap().as_ref(), b"abc");
        assert!(store.get(1).is_none());
        assert_eq!(store.get(2).unwrap().as_ref(), b"");
        assert_eq!(store.bytes_used(), 3);
    }

    #[test]
    fn test_reset_with_oversized_hints() {
        let mut store = CellStore::with_block_shifts(3, 2);
        store.reset(usize::MAX, 4, usize::MAX);
        assert!(store.is_empty());
        assert_eq!(store.allocated_blocks(), 0);

        store.push(b"ok").unwrap();
        assert_eq!(store.get(0).unwrap().as_ref(), b"ok");
    }

    #[test]
    fn test_cell_length_limit() {
        use crate::error::ErrorKind;

        assert_eq!(cell_length(0).unwrap(), 0);
        assert_eq!(cell_length(NULL_LENGTH as usize - 1).unwrap(), NULL_LENGTH - 1);
        assert_eq!(cell_length(NULL_LENGTH as usize).unwrap_err().kind(), ErrorKind::Decode);
        if let Some(len) = (NULL_LENGTH as usize).checked_add(2) {
            assert_eq!(cell_length(len).unwrap_err().kind(), ErrorKind::Decode);
        }
    }

    #[test]
    fn test_out_of_range_read_is_none() {
        let mut store = CellStore::with_block_shifts(3, 2);
        store.push(b"a").unwrap();
        assert!(store.get(1).is_none());
    }
}
