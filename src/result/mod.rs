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

//! Decoded result chunks and the row cursor over them.
//!
//! [`ResultChunk`] is closed over the two payload formats. Both shapes share
//! one cursor contract:
//!
//! - the cursor starts at -1, before the first row
//! - `next()` moves forward; at the end it returns false and parks the cursor
//!   one past the last row
//! - `rewind()` moves back; it returns false once the cursor is back at -1
//! - `extract_cell()` is only valid while the cursor is on a row
//!
//! Chunks are recycled: `reset()` points a chunk at another descriptor and
//! keeps its memory, `clear()` releases it.

pub mod arena;
pub mod arrow_chunk;
pub mod arrow_convert;
pub mod decfloat;
pub mod json_chunk;
pub mod numeric;
pub mod temporal;

use crate::error::Result;
use crate::types::chunk::{ChunkDescriptor, ResultFormat};
use crate::types::value::{CellValue, LogicalType};
use std::io::Read;

pub use arena::CellStore;
pub use arrow_chunk::ArrowResultChunk;
pub use json_chunk::JsonResultChunk;

/// One chunk of a result set, in either payload format.
#[derive(Debug)]
pub enum ResultChunk {
    Json(JsonResultChunk),
    Arrow(ArrowResultChunk),
}

impl ResultChunk {
    /// Empty chunk for the given payload format.
    pub fn new(format: ResultFormat) -> Self {
        match format {
            ResultFormat::Json => ResultChunk::Json(JsonResultChunk::new()),
            ResultFormat::Arrow => ResultChunk::Arrow(ArrowResultChunk::new()),
        }
    }

    pub fn format(&self) -> ResultFormat {
        match self {
            ResultChunk::Json(_) => ResultFormat::Json,
            ResultChunk::Arrow(_) => ResultFormat::Arrow,
        }
    }

    /// Point the chunk at `descriptor`, dropping any previous rows.
    pub fn reset(&mut self, descriptor: &ChunkDescriptor) {
        match self {
            ResultChunk::Json(c) => c.reset(descriptor),
            ResultChunk::Arrow(c) => c.reset(descriptor),
        }
    }

    /// Decode a (decompressed) payload into the chunk.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<()> {
        match self {
            ResultChunk::Json(c) => c.load(reader),
            ResultChunk::Arrow(c) => c.load(reader),
        }
    }

    /// Drop rows decoded by a failed attempt, keeping the descriptor.
    pub fn discard_rows(&mut self) {
        match self {
            ResultChunk::Json(c) => c.discard_rows(),
            ResultChunk::Arrow(c) => c.discard_rows(),
        }
    }

    /// Release all memory. The chunk must be reset before it is used again.
    pub fn clear(&mut self) {
        match self {
            ResultChunk::Json(c) => c.clear(),
            ResultChunk::Arrow(c) => c.clear(),
        }
    }

    pub fn next(&mut self) -> bool {
        match self {
            ResultChunk::Json(c) => c.next(),
            ResultChunk::Arrow(c) => c.next(),
        }
    }

    pub fn rewind(&mut self) -> bool {
        match self {
            ResultChunk::Json(c) => c.rewind(),
            ResultChunk::Arrow(c) => c.rewind(),
        }
    }

    /// Current row, -1 before the first.
    pub fn position(&self) -> i64 {
        match self {
            ResultChunk::Json(c) => c.position(),
            ResultChunk::Arrow(c) => c.position(),
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            ResultChunk::Json(c) => c.row_count(),
            ResultChunk::Arrow(c) => c.row_count(),
        }
    }

    pub fn column_count(&self) -> usize {
        match self {
            ResultChunk::Json(c) => c.column_count(),
            ResultChunk::Arrow(c) => c.column_count(),
        }
    }

    pub fn chunk_index(&self) -> usize {
        match self {
            ResultChunk::Json(c) => c.chunk_index(),
            ResultChunk::Arrow(c) => c.chunk_index(),
        }
    }

    /// Decode the cell at `column` of the current row.
    ///
    /// # Errors
    /// `InvalidState` when the cursor is not on a row or the column is out of
    /// range; `Unsupported` when the column cannot be read as `logical`.
    pub fn extract_cell(
        &mut self,
        column: usize,
        logical: LogicalType,
        scale: u8,
    ) -> Result<CellValue> {
        match self {
            ResultChunk::Json(c) => c.extract_cell(column, logical, scale),
            ResultChunk::Arrow(c) => c.extract_cell(column, logical, scale),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::{ArrayRef, RecordBatch, StringArray};
    use arrow_ipc::writer::StreamWriter;
    use arrow_schema::{DataType, Field, Schema};
    use std::sync::Arc;

    fn descriptor(rows: i64) -> ChunkDescriptor {
        ChunkDescriptor {
            url: "https://bucket/chunk_0".into(),
            row_count: rows,
            column_count: 1,
            compressed_size: 0,
            uncompressed_size: 0,
            index: 0,
        }
    }

    fn arrow_payload(values: &[&str]) -> Vec<u8> {
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Utf8, true)]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(StringArray::from(values.to_vec())) as ArrayRef],
        )
        .unwrap();
        let mut buffer = Vec::new();
        {
            let mut writer = StreamWriter::try_new(&mut buffer, &schema).unwrap();
            writer.write(&batch).unwrap();
            writer.finish().unwrap();
        }
        buffer
    }

    fn loaded_chunks() -> Vec<ResultChunk> {
        let mut json = ResultChunk::new(ResultFormat::Json);
        json.reset(&descriptor(4));
        json.load(&br#"["a"],["b"],["c"],["d"]"#[..]).unwrap();

        let mut arrow = ResultChunk::new(ResultFormat::Arrow);
        arrow.reset(&descriptor(4));
        arrow
            .load(arrow_payload(&["a", "b", "c", "d"]).as_slice())
            .unwrap();

        vec![json, arrow]
    }

    fn text(chunk: &mut ResultChunk) -> String {
        chunk
            .extract_cell(0, LogicalType::Text, 0)
            .unwrap()
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_cursor_round_trip_both_formats() {
        for mut chunk in loaded_chunks() {
            let n = chunk.row_count() as i64;
            for k in 0..=n {
                while chunk.rewind() {}
                for _ in 0..n {
                    assert!(chunk.next());
                }
                for _ in 0..k {
                    chunk.rewind();
                }
                assert_eq!(chunk.position(), n - 1 - k, "{:?} k={}", chunk.format(), k);
                if k > 0 {
                    // next() after rewind() resumes at the row that was left
                    assert!(chunk.next());
                    assert_eq!(chunk.position(), n - k);
                    assert_eq!(text(&mut chunk), ["a", "b", "c", "d"][(n - k) as usize]);
                }
            }
        }
    }

    #[test]
    fn test_same_contract_at_the_edges() {
        for mut chunk in loaded_chunks() {
            assert_eq!(chunk.position(), -1);
            assert!(chunk.extract_cell(0, LogicalType::Text, 0).is_err());
            assert!(!chunk.rewind());

            while chunk.next() {}
            assert_eq!(chunk.position(), 4);
            assert!(chunk.extract_cell(0, LogicalType::Text, 0).is_err());
            assert!(chunk.rewind());
            assert_eq!(text(&mut chunk), "d");
        }
    }

    #[test]
    fn test_clear_then_reset_reuses_chunk() {
        for mut chunk in loaded_chunks() {
            chunk.clear();
            chunk.reset(&descriptor(1));
            match chunk.format() {
                ResultFormat::Json => chunk.load(&br#"["z"]"#[..]).unwrap(),
                ResultFormat::Arrow => chunk.load(arrow_payload(&["z"]).as_slice()).unwrap(),
            }
            assert!(chunk.next());
            assert_eq!(text(&mut chunk), "z");
        }
    }
}
