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

//! Arrow IPC parsing for columnar chunks.
//!
//! A columnar chunk is an Arrow IPC stream, possibly holding several record
//! batches. Decompression already happened in the payload reader.

use crate::error::{ErrorHelper, Result};
use arrow_array::RecordBatch;
use arrow_ipc::reader::StreamReader;
use std::io::Read;

/// Read every record batch of an Arrow IPC stream.
///
/// # Errors
/// Any framing or decoding failure is a decode error, so the chunk is retried.
pub fn read_arrow_batches<R: Read>(reader: R) -> Result<Vec<RecordBatch>> {
    let reader = StreamReader::try_new(reader, None).map_err(|e| {
        ErrorHelper::decode().message(format!("Failed to create Arrow IPC reader: {}", e))
    })?;

    reader
        .into_iter()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ErrorHelper::decode().message(format!("Failed to read Arrow batches: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use arrow_array::{Int32Array, StringArray};
    use arrow_ipc::writer::StreamWriter;
    use arrow_schema::{DataType, Field, Schema};
    use flate2::read::GzDecoder;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::sync::Arc;

    fn create_test_arrow_ipc(batches: &[RecordBatch]) -> Vec<u8> {
        let schema = batches[0].schema();
        let mut buffer = Vec::new();
        {
            let mut writer = StreamWriter::try_new(&mut buffer, &schema).unwrap();
            for batch in batches {
                writer.write(batch).unwrap();
            }
            writer.finish().unwrap();
        }
        buffer
    }

    fn create_test_batch(num_rows: usize) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, false),
        ]));
        let ids: Vec<i32> = (0..num_rows as i32).collect();
        let names: Vec<String> = (0..num_rows).map(|i| format!("name_{}", i)).collect();
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int32Array::from(ids)),
                Arc::new(StringArray::from(names)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_read_multiple_batches() {
        let ipc_data = create_test_arrow_ipc(&[create_test_batch(50), create_test_batch(30)]);

        let result = read_arrow_batches(ipc_data.as_slice()).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].num_rows(), 50);
        assert_eq!(result[1].num_rows(), 30);
        assert_eq!(result[0].num_columns(), 2);
    }

    #[test]
    fn test_read_through_gzip() {
        let ipc_data = create_test_arrow_ipc(&[create_test_batch(100)]);
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&ipc_data).unwrap();
        let compressed = encoder.finish().unwrap();

        let result = read_arrow_batches(GzDecoder::new(compressed.as_slice())).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].num_rows(), 100);
    }

    #[test]
    fn test_invalid_data_is_decode_error() {
        let err = read_arrow_batches(&b"this is not valid arrow ipc data"[..]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_truncated_stream_is_decode_error() {
        let ipc_data = create_test_arrow_ipc(&[create_test_batch(100)]);
        let truncated = &ipc_data[..ipc_data.len() / 2];
        let err = read_arrow_batches(truncated).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_empty_stream() {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Int32, false)]));
        let mut buffer = Vec::new();
        {
            let mut writer = StreamWriter::try_new(&mut buffer, &schema).unwrap();
            writer.finish().unwrap();
        }

        let result = read_arrow_batches(buffer.as_slice()).unwrap();
        assert!(result.is_empty());
    }
}
