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

//! Prefetching, in-order chunk downloader.
//!
//! ## Architecture
//!
//! ```text
//!            slot 0        slot 1        slot w-1
//!          +--------+    +--------+    +--------+
//! tasks -> | chunk  |    | chunk  | .. | chunk  |     w = min(chunks, prefetch_threads)
//!          +--------+    +--------+    +--------+
//!               \            |            /
//!                +--- get_next_chunk() --+   hands out index 0, 1, 2, ... in order
//! ```
//!
//! Chunk `i` always lives in slot `i % w`. Construction spawns tasks for
//! indices `0..w`. Each later call first recycles the slot of the chunk handed
//! out previously (resetting it and spawning the next unscheduled index into
//! it), then awaits the slot holding the requested index. Tasks may finish in
//! any order; the consumer still sees ascending indices.
//!
//! The returned `&mut ResultChunk` borrows the downloader, so a chunk is
//! always released before its slot is recycled.

use crate::client::ChunkHttpClient;
use crate::error::{ErrorHelper, Result};
use crate::reader::chunk_source::{ChunkSource, HttpChunkSource};
use crate::reader::download_task::{download_chunk, DecodeOutcome};
use crate::result::ResultChunk;
use crate::types::chunk::{ChunkAccess, ChunkDescriptor, ResultFormat};
use crate::types::config::{ChunkDownloaderConfig, RetryPolicy};
use crate::types::wire::ResultChunksResponse;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// State of one prefetch slot.
#[derive(Debug)]
enum Slot {
    /// No chunk object; one is created on the next attempt.
    Vacant,
    /// A task owns the slot's chunk.
    InFlight(JoinHandle<DecodeOutcome>),
    /// Decoded chunk, handed out or about to be.
    Ready(ResultChunk),
    /// Chunk of a failed attempt, reset and waiting to be retried.
    Idle(ResultChunk),
}

pub struct ChunkDownloader {
    descriptors: Vec<ChunkDescriptor>,
    source: Arc<dyn ChunkSource>,
    format: ResultFormat,
    policy: RetryPolicy,
    slots: Vec<Slot>,
    window_size: usize,
    next_to_schedule: usize,
    next_to_hand: usize,
    cancel_token: CancellationToken,
    runtime_handle: tokio::runtime::Handle,
}

impl std::fmt::Debug for ChunkDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkDownloader")
            .field("descriptor_count", &self.descriptors.len())
            .field("format", &self.format)
            .field("window_size", &self.window_size)
            .field("next_to_schedule", &self.next_to_schedule)
            .field("next_to_hand", &self.next_to_hand)
            .finish()
    }
}

impl ChunkDownloader {
    /// Create a downloader and start prefetching the first window of chunks.
    ///
    /// # Arguments
    /// * `descriptors` - Chunks of the result set, in index order
    /// * `source` - Where chunk payloads are fetched from
    /// * `format` - Payload format shared by every chunk
    /// * `config` - Window size and retry policy
    /// * `runtime_handle` - Tokio runtime handle for spawning decode tasks
    pub fn new(
        descriptors: Vec<ChunkDescriptor>,
        source: Arc<dyn ChunkSource>,
        format: ResultFormat,
        config: &ChunkDownloaderConfig,
        runtime_handle: tokio::runtime::Handle,
    ) -> Self {
        let window_size = descriptors.len().min(config.prefetch_threads.max(1));
        let policy = RetryPolicy::from(config);

        debug!(
            "Creating chunk downloader: {} chunks, format={:?}, window={}, max_retries={}, \
             initial_backoff={:?}, max_backoff={:?}",
            descriptors.len(),
            format,
            window_size,
            policy.max_retries,
            policy.initial_backoff,
            policy.max_backoff
        );

        let mut downloader = Self {
            descriptors,
            source,
            format,
            policy,
            slots: (0..window_size).map(|_| Slot::Vacant).collect(),
            window_size,
            next_to_schedule: 0,
            next_to_hand: 0,
            cancel_token: CancellationToken::new(),
            runtime_handle,
        };

        for index in 0..window_size {
            downloader.spawn(index, ResultChunk::new(format));
        }
        downloader.next_to_schedule = window_size;

        downloader
    }

    /// Create a downloader over HTTP from the chunk section of an execution
    /// response.
    pub fn from_response(
        response: &ResultChunksResponse,
        column_count: usize,
        config: &ChunkDownloaderConfig,
        runtime_handle: tokio::runtime::Handle,
    ) -> Result<Self> {
        let http_client = Arc::new(ChunkHttpClient::new(config.http.clone())?);
        let source = HttpChunkSource::new(
            http_client,
            ChunkAccess::from_response(response),
            config.speed_threshold_mbps,
        );
        Ok(Self::new(
            response.descriptors(column_count),
            Arc::new(source),
            response.query_result_format,
            config,
            runtime_handle,
        ))
    }

    /// Reset `chunk` to descriptor `index` and start a task decoding into it.
    fn spawn(&mut self, index: usize, mut chunk: ResultChunk) {
        let descriptor = self.descriptors[index].clone();
        chunk.reset(&descriptor);

        debug!(
            "Scheduling chunk {} into slot {}",
            index,
            index % self.window_size
        );

        let handle = self.runtime_handle.spawn(download_chunk(
            Arc::clone(&self.source),
            descriptor,
            chunk,
            self.policy,
            self.cancel_token.clone(),
        ));
        self.slots[index % self.window_size] = Slot::InFlight(handle);
    }

    /// Recycle the slot of the previously handed-out chunk for the next
    /// unscheduled index.
    ///
    /// Runs before the requested slot is awaited: with a window of one both
    /// are the same slot.
    fn refill(&mut self) {
        if self.next_to_hand == 0 || self.next_to_schedule >= self.descriptors.len() {
            return;
        }
        let slot = (self.next_to_hand - 1) % self.window_size;
        if !matches!(self.slots[slot], Slot::Ready(_)) {
            // already recycled by an earlier call that then failed
            return;
        }
        if let Slot::Ready(chunk) = std::mem::replace(&mut self.slots[slot], Slot::Vacant) {
            let index = self.next_to_schedule;
            self.spawn(index, chunk);
            self.next_to_schedule += 1;
        }
    }

    /// Wait for the next chunk in index order.
    ///
    /// Returns `Ok(None)` once every chunk has been handed out. After an error
    /// the same index is attempted again on the next call.
    pub async fn get_next_chunk(&mut self) -> Result<Option<&mut ResultChunk>> {
        let index = self.next_to_hand;
        if index >= self.descriptors.len() {
            return Ok(None);
        }
        if self.cancel_token.is_cancelled() {
            return Err(ErrorHelper::cancelled().message("Chunk downloader cancelled"));
        }

        self.refill();

        let slot = index % self.window_size;
        match std::mem::replace(&mut self.slots[slot], Slot::Vacant) {
            Slot::InFlight(handle) => self.slots[slot] = Slot::InFlight(handle),
            Slot::Idle(chunk) => {
                debug!("Retrying chunk {} after earlier failure", index);
                self.spawn(index, chunk);
            }
            Slot::Vacant => {
                debug!("Recreating chunk {} in vacant slot {}", index, slot);
                self.spawn(index, ResultChunk::new(self.format));
            }
            Slot::Ready(chunk) => {
                // A ready chunk in the requested slot belongs to the index one
                // window back; it was never recycled, so schedule this index.
                self.spawn(index, chunk);
                if self.next_to_schedule <= index {
                    self.next_to_schedule = index + 1;
                }
            }
        }

        // Awaiting through a borrow keeps the handle in its slot if the
        // caller drops this future.
        let joined = match &mut self.slots[slot] {
            Slot::InFlight(handle) => handle.await,
            _ => {
                return Err(ErrorHelper::invalid_state()
                    .message(format!("Slot {} has no task for chunk {}", slot, index)))
            }
        };

        match joined {
            Ok(DecodeOutcome {
                chunk,
                result: Ok(()),
            }) => {
                debug!(
                    "Handing out chunk {} ({} rows)",
                    index,
                    chunk.row_count()
                );
                self.slots[slot] = Slot::Ready(chunk);
                self.next_to_hand += 1;
            }
            Ok(DecodeOutcome {
                chunk,
                result: Err(e),
            }) => {
                warn!("Chunk {} failed: {}", index, e);
                self.slots[slot] = Slot::Idle(chunk);
                return Err(e);
            }
            Err(join_error) => {
                self.slots[slot] = Slot::Vacant;
                if join_error.is_cancelled() {
                    return Err(ErrorHelper::cancelled()
                        .message(format!("Task for chunk {} was cancelled", index)));
                }
                error!("Task for chunk {} panicked: {}", index, join_error);
                return Err(ErrorHelper::invalid_state()
                    .message(format!("Task for chunk {} panicked: {}", index, join_error)));
            }
        }

        match &mut self.slots[slot] {
            Slot::Ready(chunk) => Ok(Some(chunk)),
            _ => Err(ErrorHelper::invalid_state()
                .message(format!("Chunk {} vanished from slot {}", index, slot))),
        }
    }

    /// Abort every in-flight task. Later calls to `get_next_chunk` fail with
    /// `Cancelled`.
    pub fn cancel(&self) {
        debug!("Cancelling chunk downloader");
        self.cancel_token.cancel();
    }

    pub fn descriptor_count(&self) -> usize {
        self.descriptors.len()
    }

    /// Number of chunks downloaded concurrently.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn format(&self) -> ResultFormat {
        self.format
    }
}

impl Drop for ChunkDownloader {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}
