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

//! Type definitions for the result pipeline.
//!
//! - `wire`: serde shapes of the chunk listing in an execution response
//! - `chunk`: chunk descriptors, result format, download access headers
//! - `config`: downloader configuration and retry policy
//! - `value`: logical column types and decoded cell values

pub mod chunk;
pub mod config;
pub mod value;
pub mod wire;

pub use chunk::{ChunkAccess, ChunkDescriptor, ResultFormat};
pub use config::{ChunkDownloaderConfig, RetryPolicy};
pub use value::{CellValue, Decimal, LogicalType};
pub use wire::{RemoteChunkInfo, ResultChunksResponse};
