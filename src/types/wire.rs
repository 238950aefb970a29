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

//! Wire shapes for the chunk section of a query-execution response.
//!
//! Only the fields the result pipeline consumes are modelled; everything else
//! in the response belongs to the statement layer.

use crate::types::chunk::{ChunkDescriptor, ResultFormat};
use serde::Deserialize;
use std::collections::HashMap;

/// One remote chunk as listed by the server.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteChunkInfo {
    pub url: String,
    pub row_count: i64,
    #[serde(default)]
    pub uncompressed_size: i64,
    #[serde(default)]
    pub compressed_size: i64,
}

/// Chunk-related fields of the execution response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultChunksResponse {
    #[serde(default)]
    pub chunks: Vec<RemoteChunkInfo>,
    /// Per-query key for the SSE-C download headers.
    #[serde(default)]
    pub qrmk: Option<String>,
    /// Header overrides; when present they replace the SSE-C pair.
    #[serde(default)]
    pub chunk_headers: Option<HashMap<String, String>>,
    #[serde(default)]
    pub query_result_format: ResultFormat,
}

impl ResultChunksResponse {
    /// Turn the listed chunks into ordered descriptors.
    pub fn descriptors(&self, column_count: usize) -> Vec<ChunkDescriptor> {
        self.chunks
            .iter()
            .enumerate()
            .map(|(index, info)| ChunkDescriptor::from_remote(info, index, column_count))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_chunks_response() {
        let json = r#"{
            "chunks": [
                {"url": "https://bucket/c0", "rowCount": 10, "uncompressedSize": 400, "compressedSize": 120},
                {"url": "https://bucket/c1", "rowCount": 7, "uncompressedSize": 280, "compressedSize": 90}
            ],
            "qrmk": "a2V5",
            "queryResultFormat": "arrow"
        }"#;

        let response: ResultChunksResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.chunks.len(), 2);
        assert_eq!(response.chunks[1].row_count, 7);
        assert_eq!(response.qrmk.as_deref(), Some("a2V5"));
        assert!(response.chunk_headers.is_none());
        assert_eq!(response.query_result_format, ResultFormat::Arrow);

        let descriptors = response.descriptors(3);
        assert_eq!(descriptors[0].index, 0);
        assert_eq!(descriptors[1].index, 1);
        assert_eq!(descriptors[1].url, "https://bucket/c1");
        assert_eq!(descriptors[1].column_count, 3);
        assert_eq!(descriptors[1].compressed_size, 90);
    }

    #[test]
    fn test_deserialize_defaults() {
        let response: ResultChunksResponse = serde_json::from_str("{}").unwrap();
        assert!(response.chunks.is_empty());
        assert_eq!(response.query_result_format, ResultFormat::Json);
        assert!(response.descriptors(1).is_empty());
    }

    #[test]
    fn test_deserialize_chunk_headers() {
        let json = r#"{"chunkHeaders": {"x-goog-custom": "v"}, "chunks": []}"#;
        let response: ResultChunksResponse = serde_json::from_str(json).unwrap();
        let headers = response.chunk_headers.unwrap();
        assert_eq!(headers.get("x-goog-custom").map(String::as_str), Some("v"));
    }
}
