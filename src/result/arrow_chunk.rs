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

//! Columnar chunk: a list of record batches behind one row cursor.
//!
//! The cursor is `(batch_index, record_index)` plus the row position across
//! the whole chunk. Zero-length batches are stepped over in both directions.
//! Column readers are cached per batch and dropped whenever the cursor moves
//! to another batch.

use crate::error::{ErrorHelper, Result};
use crate::reader::arrow_parser::read_arrow_batches;
use crate::result::arrow_convert::ColumnReader;
use crate::types::chunk::ChunkDescriptor;
use crate::types::value::{CellValue, LogicalType};
use arrow_array::RecordBatch;
use std::io::Read;
use tracing::warn;

#[derive(Debug)]
pub struct ArrowResultChunk {
    row_count: usize,
    column_count: usize,
    chunk_index: usize,
    batches: Vec<RecordBatch>,
    batch_index: usize,
    /// -1 before the first row of the chunk.
    record_index: i64,
    /// Row across all batches: -1 before the first, `row_count` past the last.
    position: i64,
    columns: Vec<Option<ColumnReader>>,
}

impl Default for ArrowResultChunk {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrowResultChunk {
    pub fn new() -> Self {
        Self {
            row_count: 0,
            column_count: 0,
            chunk_index: 0,
            batches: Vec::new(),
            batch_index: 0,
            record_index: -1,
            position: -1,
            columns: Vec::new(),
        }
    }

    /// Build a loaded chunk from batches already in memory.
    pub fn from_batches(batches: Vec<RecordBatch>, chunk_index: usize) -> Self {
        let mut chunk = Self::new();
        chunk.chunk_index = chunk_index;
        chunk.install(batches);
        chunk
    }

    pub fn reset(&mut self, descriptor: &ChunkDescriptor) {
        self.row_count = descriptor.row_count.max(0) as usize;
        self.column_count = descriptor.column_count;
        self.chunk_index = descriptor.index;
        self.batches.clear();
        self.columns.clear();
        self.rewind_to_start();
    }

    pub fn load<R: Read>(&mut self, reader: R) -> Result<()> {
        let batches = read_arrow_batches(reader)?;
        let expected_rows = self.row_count;
        self.install(batches);
        if self.row_count != expected_rows {
            warn!(
                "Chunk {}: descriptor announced {} rows, payload holds {}",
                self.chunk_index, expected_rows, self.row_count
            );
        }
        Ok(())
    }

    fn install(&mut self, batches: Vec<RecordBatch>) {
        self.row_count = batches.iter().map(|b| b.num_rows()).sum();
        if let Some(first) = batches.first() {
            self.column_count = first.num_columns();
        }
        self.columns = (0..self.column_count).map(|_| None).collect();
        self.batches = batches;
        self.rewind_to_start();
    }

    fn rewind_to_start(&mut self) {
        self.batch_index = 0;
        self.record_index = -1;
        self.position = -1;
        self.invalidate_columns();
    }

    fn invalidate_columns(&mut self) {
        self.columns.iter_mut().for_each(|c| *c = None);
    }

    fn batch_len(&self, index: usize) -> i64 {
        self.batches.get(index).map_or(0, |b| b.num_rows() as i64)
    }

    pub fn discard_rows(&mut self) {
        self.batches.clear();
        self.columns.clear();
        self.rewind_to_start();
    }

    pub fn clear(&mut self) {
        self.batches = Vec::new();
        self.columns = Vec::new();
        self.rewind_to_start();
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn next(&mut self) -> bool {
        if self.position >= self.row_count as i64 {
            self.position = self.row_count as i64;
            return false;
        }
        if self.record_index + 1 < self.batch_len(self.batch_index) {
            self.record_index += 1;
            self.position += 1;
            return true;
        }

        let start = if self.position < 0 { 0 } else { self.batch_index + 1 };
        match (start..self.batches.len()).find(|&i| self.batch_len(i) > 0) {
            Some(i) => {
                if i != self.batch_index {
                    self.invalidate_columns();
                }
                self.batch_index = i;
                self.record_index = 0;
                self.position += 1;
                true
            }
            None => {
                self.batch_index = self.batches.len();
                self.record_index = 0;
                self.position = self.row_count as i64;
                self.invalidate_columns();
                false
            }
        }
    }

    pub fn rewind(&mut self) -> bool {
        if self.position < 0 {
            return false;
        }
        if self.position == 0 {
            self.rewind_to_start();
            return false;
        }
        if self.position < self.row_count as i64 && self.record_index > 0 {
            self.record_index -= 1;
            self.position -= 1;
            return true;
        }

        let end = self.batch_index.min(self.batches.len());
        match (0..end).rev().find(|&i| self.batch_len(i) > 0) {
            Some(i) => {
                self.invalidate_columns();
                self.batch_index = i;
                self.record_index = self.batch_len(i) - 1;
                self.position -= 1;
                true
            }
            None => {
                self.rewind_to_start();
                false
            }
        }
    }

    pub fn extract_cell(
        &mut self,
        column: usize,
        logical: LogicalType,
        scale: u8,
    ) -> Result<CellValue> {
        if self.position < 0 || self.position >= self.row_count as i64 {
            return Err(ErrorHelper::invalid_state().message(format!(
                "chunk {} is not positioned on a row (position {})",
                self.chunk_index, self.position
            )));
        }
        let batch = self.batches.get(self.batch_index).ok_or_else(|| {
            ErrorHelper::invalid_state().message(format!(
                "chunk {} cursor points past its batches",
                self.chunk_index
            ))
        })?;
        if column >= batch.num_columns() || column >= self.columns.len() {
            return Err(ErrorHelper::invalid_state().message(format!(
                "column {} out of range, chunk has {} columns",
                column,
                batch.num_columns()
            )));
        }

        let reader = match self.columns[column].take() {
            Some(reader) if reader.logical() == logical => reader,
            _ => ColumnReader::new(batch.column(column), logical)?,
        };
        let value = reader.value(self.record_index as usize, scale);
        self.columns[column] = Some(reader);
        value
    }
}
