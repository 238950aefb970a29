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

//! Fetching and parsing chunk payloads.
//!
//! This module provides:
//! - `ChunkDownloader`: prefetch window that hands out decoded chunks in order
//! - `ChunkSource` / `HttpChunkSource`: where chunk bytes come from
//! - `json_parser` / `arrow_parser`: payload parsers for the two result formats

pub mod arrow_parser;
pub mod chunk_downloader;
pub mod chunk_source;
pub mod download_task;
pub mod json_parser;
pub mod stream;

pub use chunk_downloader::ChunkDownloader;
pub use chunk_source::{ChunkPayload, ChunkSource, HttpChunkSource};
pub use download_task::DecodeOutcome;
