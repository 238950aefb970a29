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

//! Chunk descriptors and download access control.

use crate::types::wire::{RemoteChunkInfo, ResultChunksResponse};
use serde::Deserialize;
use std::collections::HashMap;

/// SSE-C algorithm header name.
pub const SSE_C_ALGORITHM_HEADER: &str = "x-amz-server-side-encryption-customer-algorithm";
/// SSE-C key header name.
pub const SSE_C_KEY_HEADER: &str = "x-amz-server-side-encryption-customer-key";
/// The only algorithm the server issues keys for.
pub const SSE_C_ALGORITHM: &str = "AES256";

/// Payload encoding of the result chunks of one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    /// Row-oriented text cells (`["a",null],["b","c"]`).
    #[default]
    Json,
    /// Arrow IPC stream.
    Arrow,
}

/// Immutable description of one remote chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// URL the chunk is downloaded from.
    pub url: String,
    /// Number of rows the server says the chunk holds.
    pub row_count: i64,
    /// Number of columns in every row.
    pub column_count: usize,
    /// Size on the wire.
    pub compressed_size: i64,
    /// Size after decompression, used as an allocation hint.
    pub uncompressed_size: i64,
    /// Position of the chunk in the result set.
    pub index: usize,
}

impl ChunkDescriptor {
    /// Build a descriptor from the server listing, assigning its ordinal.
    pub fn from_remote(info: &RemoteChunkInfo, index: usize, column_count: usize) -> Self {
        Self {
            url: info.url.clone(),
            row_count: info.row_count,
            column_count,
            compressed_size: info.compressed_size,
            uncompressed_size: info.uncompressed_size,
            index,
        }
    }

    /// Expected number of cells for the text format.
    pub fn cell_count(&self) -> usize {
        self.row_count.max(0) as usize * self.column_count
    }
}

/// How chunk downloads are authorised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkAccess {
    /// Per-query SSE-C key.
    pub qrmk: Option<String>,
    /// Caller supplied headers; win over the SSE-C pair when non-empty.
    pub chunk_headers: Option<HashMap<String, String>>,
}

impl ChunkAccess {
    pub fn from_response(response: &ResultChunksResponse) -> Self {
        Self {
            qrmk: response.qrmk.clone(),
            chunk_headers: response.chunk_headers.clone(),
        }
    }

    pub fn with_key(qrmk: impl Into<String>) -> Self {
        Self {
            qrmk: Some(qrmk.into()),
            chunk_headers: None,
        }
    }

    pub fn with_headers(headers: HashMap<String, String>) -> Self {
        Self {
            qrmk: None,
            chunk_headers: Some(headers),
        }
    }

    /// Headers to attach to every chunk GET.
    pub fn request_headers(&self) -> Vec<(String, String)> {
        if let Some(headers) = self.chunk_headers.as_ref().filter(|h| !h.is_empty()) {
            let mut pairs: Vec<(String, String)> = headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            pairs.sort();
            return pairs;
        }

        match &self.qrmk {
            Some(key) => vec![
                (SSE_C_ALGORITHM_HEADER.to_string(), SSE_C_ALGORITHM.to_string()),
                (SSE_C_KEY_HEADER.to_string(), key.clone()),
            ],
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_c_headers_from_key() {
        let access = ChunkAccess::with_key("c2VjcmV0");
        let headers = access.request_headers();
        assert_eq!(
            headers,
            vec![
                (SSE_C_ALGORITHM_HEADER.to_string(), "AES256".to_string()),
                (SSE_C_KEY_HEADER.to_string(), "c2VjcmV0".to_string()),
            ]
        );
    }

    #[test]
    fn test_header_override_wins() {
        let access = ChunkAccess {
            qrmk: Some("ignored".to_string()),
            chunk_headers: Some(HashMap::from([
                ("x-b".to_string(), "2".to_string()),
                ("x-a".to_string(), "1".to_string()),
            ])),
        };
        let headers = access.request_headers();
        assert_eq!(
            headers,
            vec![
                ("x-a".to_string(), "1".to_string()),
                ("x-b".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_override_falls_back_to_key() {
        let access = ChunkAccess {
            qrmk: Some("k".to_string()),
            chunk_headers: Some(HashMap::new()),
        };
        assert_eq!(access.request_headers().len(), 2);
        assert!(ChunkAccess::default().request_headers().is_empty());
    }

    #[test]
    fn test_descriptor_cell_count() {
        let info = RemoteChunkInfo {
            url: "u".to_string(),
            row_count: 4,
            uncompressed_size: 0,
            compressed_size: 0,
        };
        let descriptor = ChunkDescriptor::from_remote(&info, 2, 3);
        assert_eq!(descriptor.cell_count(), 12);
        assert_eq!(descriptor.index, 2);
    }
}
