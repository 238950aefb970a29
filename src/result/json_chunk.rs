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

//! Text-cell chunk: rows parsed into a [`CellStore`], converted on read.

use crate::error::{ErrorHelper, Result};
use crate::reader::json_parser::parse_rows;
use crate::result::arena::CellStore;
use crate::result::numeric::{parse_epoch_fraction, parse_i128, parse_i64, parse_scaled_decimal};
use crate::result::temporal;
use crate::types::chunk::ChunkDescriptor;
use crate::types::value::{CellValue, Decimal, LogicalType};
use std::io::Read;

#[derive(Debug)]
pub struct JsonResultChunk {
    row_count: usize,
    column_count: usize,
    chunk_index: usize,
    /// -1 before the first row, `row_count` past the last.
    current_row: i64,
    cells: CellStore,
}

impl Default for JsonResultChunk {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonResultChunk {
    pub fn new() -> Self {
        Self::with_cells(CellStore::new())
    }

    pub(crate) fn with_cells(cells: CellStore) -> Self {
        Self {
            row_count: 0,
            column_count: 0,
            chunk_index: 0,
            current_row: -1,
            cells,
        }
    }

    /// Point the chunk at a new descriptor. Arena blocks are kept.
    pub fn reset(&mut self, descriptor: &ChunkDescriptor) {
        self.row_count = descriptor.row_count.max(0) as usize;
        self.column_count = descriptor.column_count;
        self.chunk_index = descriptor.index;
        self.current_row = -1;
        self.cells.reset(
            self.row_count,
            self.column_count,
            descriptor.uncompressed_size.max(0) as usize,
        );
    }

    /// Parse a payload into the arena.
    ///
    /// The decoded cell count must match the descriptor, otherwise the payload
    /// was truncated or malformed.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<()> {
        parse_rows(reader, &mut self.cells)?;
        let expected = self.row_count.saturating_mul(self.column_count);
        if self.cells.len() != expected {
            return Err(ErrorHelper::decode().message(format!(
                "chunk {} decoded {} cells, expected {} ({} rows x {} columns)",
                self.chunk_index,
                self.cells.len(),
                expected,
                self.row_count,
                self.column_count
            )));
        }
        Ok(())
    }

    /// Forget partially decoded cells before a retry.
    pub fn discard_rows(&mut self) {
        self.cells.reset(self.row_count, self.column_count, 0);
        self.current_row = -1;
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.current_row = -1;
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
        self.current_row
    }

    pub fn next(&mut self) -> bool {
        if self.current_row + 1 < self.row_count as i64 {
            self.current_row += 1;
            true
        } else {
            self.current_row = self.row_count as i64;
            false
        }
    }

    pub fn rewind(&mut self) -> bool {
        if self.current_row < 0 {
            return false;
        }
        self.current_row -= 1;
        self.current_row >= 0
    }

    pub fn extract_cell(
        &self,
        column: usize,
        logical: LogicalType,
        scale: u8,
    ) -> Result<CellValue> {
        if self.current_row < 0 || self.current_row >= self.row_count as i64 {
            return Err(ErrorHelper::invalid_state().message(format!(
                "chunk {} is not positioned on a row (position {})",
                self.chunk_index, self.current_row
            )));
        }
        if column >= self.column_count {
            return Err(ErrorHelper::invalid_state().message(format!(
                "column {} out of range, chunk has {} columns",
                column, self.column_count
            )));
        }

        let index = (self.current_row as usize)
            .checked_mul(self.column_count)
            .and_then(|start| start.checked_add(column))
            .filter(|&index| index < self.cells.len())
            .ok_or_else(|| {
                ErrorHelper::invalid_state().message(format!(
                    "chunk {} has no decoded data for row {}",
                    self.chunk_index, self.current_row
                ))
            })?;
        match self.cells.get(index) {
            None => Ok(CellValue::Null),
            Some(bytes) => convert_text_cell(&bytes, logical, scale),
        }
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|e| ErrorHelper::decode().message(format!("cell is not valid UTF-8: {}", e)))
}

fn decode_hex(bytes: &[u8]) -> Result<Vec<u8>> {
    hex::decode(bytes).map_err(|e| {
        ErrorHelper::decode().message(format!(
            "invalid BINARY value '{}': {}",
            String::from_utf8_lossy(bytes),
            e
        ))
    })
}

/// Convert the server's text rendering of one cell.
pub(crate) fn convert_text_cell(
    bytes: &[u8],
    logical: LogicalType,
    scale: u8,
) -> Result<CellValue> {
    let value = match logical {
        LogicalType::Fixed if scale == 0 => match parse_i64(bytes) {
            Ok(v) => CellValue::Integer(v),
            Err(_) => CellValue::BigInteger(parse_i128(bytes)?),
        },
        LogicalType::Fixed => {
            CellValue::Decimal(Decimal::new(parse_scaled_decimal(bytes, scale)?, scale))
        }
        LogicalType::Real => {
            let text = utf8(bytes)?;
            CellValue::Real(text.trim().parse::<f64>().map_err(|_| {
                ErrorHelper::decode().message(format!("invalid REAL value '{}'", text))
            })?)
        }
        LogicalType::Boolean => match bytes {
            b"1" => CellValue::Boolean(true),
            b"0" => CellValue::Boolean(false),
            other if other.eq_ignore_ascii_case(b"true") => CellValue::Boolean(true),
            other if other.eq_ignore_ascii_case(b"false") => CellValue::Boolean(false),
            other => {
                return Err(ErrorHelper::decode().message(format!(
                    "invalid BOOLEAN value '{}'",
                    String::from_utf8_lossy(other)
                )))
            }
        },
        LogicalType::Binary => CellValue::Binary(decode_hex(bytes)?),
        LogicalType::Date => CellValue::Date(temporal::date_from_days(parse_i64(bytes)?)?),
        LogicalType::Time => {
            let (secs, nanos) = parse_epoch_fraction(bytes)?;
            CellValue::Time(temporal::time_from_parts(secs, nanos)?)
        }
        LogicalType::TimestampNtz => {
            let (secs, nanos) = parse_epoch_fraction(bytes)?;
            CellValue::Timestamp(temporal::timestamp_from_parts(secs, nanos)?)
        }
        LogicalType::TimestampLtz => {
            let (secs, nanos) = parse_epoch_fraction(bytes)?;
            let utc = temporal::timestamp_from_parts(secs, nanos)?;
            CellValue::TimestampTz(temporal::at_offset(utc, temporal::utc()))
        }
        LogicalType::TimestampTz => {
            let text = utf8(bytes)?;
            let (epoch, tz) = text.trim().split_once(' ').ok_or_else(|| {
                ErrorHelper::decode().message(format!("invalid TIMESTAMP_TZ value '{}'", text))
            })?;
            let (secs, nanos) = parse_epoch_fraction(epoch.as_bytes())?;
            let encoded = i32::try_from(parse_i64(tz.trim().as_bytes())?).map_err(|_| {
                ErrorHelper::decode().message(format!("invalid timezone field '{}'", tz))
            })?;
            let utc = temporal::timestamp_from_parts(secs, nanos)?;
            let offset = temporal::offset_from_encoded(encoded)?;
            CellValue::TimestampTz(temporal::at_offset(utc, offset))
        }
        LogicalType::Text
        | LogicalType::Variant
        | LogicalType::Object
        | LogicalType::Array
        | LogicalType::Map
        | LogicalType::Vector
        | LogicalType::DecFloat => CellValue::Text(utf8(bytes)?.to_string()),
    };
    Ok(value)
}
