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

//! Where chunk bytes come from.
//!
//! [`ChunkSource`] is the seam between the downloader and the network. The
//! production implementation, [`HttpChunkSource`], issues one GET per chunk
//! against object storage; tests plug in an in-memory source.

use crate::client::ChunkHttpClient;
use crate::error::{ErrorHelper, Result};
use crate::types::chunk::{ChunkAccess, ChunkDescriptor};
use async_trait::async_trait;
use bytes::Bytes;
use flate2::read::GzDecoder;
use reqwest::header::CONTENT_ENCODING;
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Fetches the raw payload of one chunk.
#[async_trait]
pub trait ChunkSource: Send + Sync + std::fmt::Debug {
    /// Download the chunk described by `descriptor`.
    ///
    /// Errors returned here are transport failures and are not retried by
    /// the decode task.
    async fn fetch(&self, descriptor: &ChunkDescriptor) -> Result<ChunkPayload>;
}

/// A downloaded chunk body, possibly gzip-compressed.
#[derive(Debug, Clone)]
pub struct ChunkPayload {
    pub body: Bytes,
    pub gzip: bool,
}

impl ChunkPayload {
    /// Uncompressed body.
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            gzip: false,
        }
    }

    /// Body sent with `Content-Encoding: gzip`.
    pub fn gzip(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            gzip: true,
        }
    }

    /// Stream over the decompressed bytes. A corrupt gzip stream shows up as
    /// a read error, which the parsers report as a decode failure.
    pub fn reader(&self) -> Box<dyn Read + '_> {
        if self.gzip {
            Box::new(GzDecoder::new(&self.body[..]))
        } else {
            Box::new(&self.body[..])
        }
    }
}

/// Downloads chunks from their presigned URLs.
#[derive(Debug)]
pub struct HttpChunkSource {
    http_client: Arc<ChunkHttpClient>,
    headers: Vec<(String, String)>,
    speed_threshold_mbps: f64,
}

impl HttpChunkSource {
    pub fn new(
        http_client: Arc<ChunkHttpClient>,
        access: ChunkAccess,
        speed_threshold_mbps: f64,
    ) -> Self {
        Self {
            http_client,
            headers: access.request_headers(),
            speed_threshold_mbps,
        }
    }

    /// Headers sent with every GET.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

#[async_trait]
impl ChunkSource for HttpChunkSource {
    async fn fetch(&self, descriptor: &ChunkDescriptor) -> Result<ChunkPayload> {
        let start = Instant::now();

        let response = self.http_client.get(&descriptor.url, &self.headers).await?;

        let gzip = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("gzip"));

        let body = response.bytes().await.map_err(|e| {
            ErrorHelper::io().message(format!(
                "Failed to read chunk {} response body: {}",
                descriptor.index, e
            ))
        })?;

        let elapsed = start.elapsed();
        let size_mb = body.len() as f64 / 1024.0 / 1024.0;
        let speed_mbps = size_mb / elapsed.as_secs_f64().max(f64::EPSILON);

        debug!(
            "Downloaded chunk {}: {:.2} MB in {:.2}s ({:.2} MB/s, gzip={})",
            descriptor.index,
            size_mb,
            elapsed.as_secs_f64(),
            speed_mbps,
            gzip
        );

        if speed_mbps < self.speed_threshold_mbps && size_mb > 0.0 {
            warn!(
                "Chunk {} download slower than threshold: {:.2} MB/s (threshold: {:.2} MB/s)",
                descriptor.index, speed_mbps, self.speed_threshold_mbps
            );
        }

        Ok(ChunkPayload { body, gzip })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HttpClientConfig;
    use crate::types::chunk::{SSE_C_ALGORITHM_HEADER, SSE_C_KEY_HEADER};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn read_all(payload: &ChunkPayload) -> std::io::Result<Vec<u8>> {
        let mut out = Vec::new();
        payload.reader().read_to_end(&mut out)?;
        Ok(out)
    }

    #[test]
    fn test_plain_payload_reader() {
        let payload = ChunkPayload::new(&b"[\"a\"]"[..]);
        assert!(!payload.gzip);
        assert_eq!(read_all(&payload).unwrap(), b"[\"a\"]");
    }

    #[test]
    fn test_gzip_payload_reader() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"[\"a\",null],[\"b\",\"c\"]").unwrap();
        let compressed = encoder.finish().unwrap();

        let payload = ChunkPayload::gzip(compressed);
        assert_eq!(read_all(&payload).unwrap(), b"[\"a\",null],[\"b\",\"c\"]");
        // reader() can be called again for a retry
        assert_eq!(read_all(&payload).unwrap().len(), 20);
    }

    #[test]
    fn test_corrupt_gzip_fails_on_read() {
        let payload = ChunkPayload::gzip(&b"definitely not gzip"[..]);
        assert!(read_all(&payload).is_err());
    }

    #[tokio::test]
    async fn test_http_source_carries_access_headers() {
        let client = Arc::new(ChunkHttpClient::new(HttpClientConfig::default()).unwrap());
        let source = HttpChunkSource::new(client, ChunkAccess::with_key("a2V5"), 0.1);
        let names: Vec<&str> = source.headers().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec![SSE_C_ALGORITHM_HEADER, SSE_C_KEY_HEADER]);

        let source = HttpChunkSource::new(
            Arc::new(ChunkHttpClient::new(HttpClientConfig::default()).unwrap()),
            ChunkAccess::default(),
            0.1,
        );
        assert!(source.headers().is_empty());
    }
}
