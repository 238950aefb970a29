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

//! Chunked result retrieval for cloud data-warehouse drivers.
//!
//! A query result is split by the server into chunks stored in object
//! storage. This crate downloads those chunks with a bounded prefetch window,
//! decodes them (row-oriented JSON text or Arrow IPC) and exposes a row cursor
//! with typed cell extraction.
//!
//! ## Overview
//!
//! - [`ChunkDownloader`] - prefetches chunks and hands them out in index order
//! - [`ResultChunk`] - one decoded chunk with a `next()`/`rewind()` cursor and
//!   `extract_cell()`
//! - [`ChunkSource`] - where chunk bytes come from ([`HttpChunkSource`] in
//!   production)
//!
//! ## Example
//!
//! ```ignore
//! use warehouse_results::{ChunkDownloader, ChunkDownloaderConfig, LogicalType, ResultChunksResponse};
//!
//! let response: ResultChunksResponse = serde_json::from_str(body)?;
//! let config = ChunkDownloaderConfig::default();
//! let mut downloader =
//!     ChunkDownloader::from_response(&response, 2, &config, tokio::runtime::Handle::current())?;
//!
//! while let Some(chunk) = downloader.get_next_chunk().await? {
//!     while chunk.next() {
//!         let id = chunk.extract_cell(0, LogicalType::Fixed, 0)?;
//!         let name = chunk.extract_cell(1, LogicalType::Text, 0)?;
//!     }
//! }
//! ```
//!
//! ## Configuration Options
//!
//! Set through [`ChunkDownloaderConfig::set_option`]. The `results.log_*`
//! options only take effect when the embedding application calls
//! [`logging::init_logging`].
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `results.prefetch_threads` | 4 | Chunks downloaded concurrently |
//! | `results.max_retries` | 7 | Decode retries per chunk, 0 = unlimited |
//! | `results.retry_backoff_ms` | 1000 | First retry delay, doubled per retry |
//! | `results.max_retry_backoff_ms` | 16000 | Retry delay ceiling |
//! | `results.speed_threshold_mbps` | 0.1 | Slow download warning threshold |
//! | `results.http.connect_timeout_ms` | 30000 | HTTP connect timeout |
//! | `results.http.read_timeout_ms` | 60000 | HTTP request timeout |
//! | `results.log_level` | unset | `off`, `error`, `warn`, `info`, `debug`, `trace` |
//! | `results.log_file` | unset | Append logs to this file instead of stderr |

pub mod client;
pub mod error;
pub mod logging;
pub mod reader;
pub mod result;
pub mod types;

pub use error::{Error, ErrorHelper, ErrorKind, Result};
pub use reader::{ChunkDownloader, ChunkPayload, ChunkSource, HttpChunkSource};
pub use result::ResultChunk;

pub use client::{ChunkHttpClient, HttpClientConfig};
pub use logging::LogConfig;
pub use types::{
    CellValue, ChunkAccess, ChunkDescriptor, ChunkDownloaderConfig, Decimal, LogicalType,
    RemoteChunkInfo, ResultChunksResponse, ResultFormat, RetryPolicy,
};
