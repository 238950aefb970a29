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

//! The per-chunk download-and-decode task.
//!
//! One task owns one chunk slot until it finishes. It fetches the payload,
//! decodes it into the slot's chunk and hands the chunk back together with
//! the outcome.
//!
//! ## Retry Behavior
//!
//! | Failure | Retried | Sleep before retry |
//! |---|---|---|
//! | Transport (`Io`) | No, surfaced to the consumer | - |
//! | Malformed payload (`Decode`) | Yes, up to `max_retries` (0 = forever) | `initial_backoff * 2^(n-1)`, capped at `max_backoff` |
//! | Anything else | No | - |
//!
//! Rows written by a failed attempt are discarded before the next one, so a
//! retry never sees cells from an earlier try.

use crate::error::{ErrorHelper, Result};
use crate::reader::chunk_source::ChunkSource;
use crate::result::ResultChunk;
use crate::types::chunk::ChunkDescriptor;
use crate::types::config::RetryPolicy;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

/// What a finished task hands back to its slot.
#[derive(Debug)]
pub struct DecodeOutcome {
    /// The slot's chunk: loaded on success, reset to its descriptor otherwise.
    pub chunk: ResultChunk,
    pub result: Result<()>,
}

/// Download `descriptor` into `chunk`, retrying decode failures.
///
/// The chunk is expected to be reset to `descriptor` already.
pub async fn download_chunk(
    source: Arc<dyn ChunkSource>,
    descriptor: ChunkDescriptor,
    mut chunk: ResultChunk,
    policy: RetryPolicy,
    cancel_token: CancellationToken,
) -> DecodeOutcome {
    let result = process_chunk(
        source.as_ref(),
        &descriptor,
        &mut chunk,
        &policy,
        &cancel_token,
    )
    .await;

    if let Err(ref e) = result {
        debug!("Chunk {} task finished with error: {}", descriptor.index, e);
        chunk.reset(&descriptor);
    }

    DecodeOutcome { chunk, result }
}

async fn process_chunk(
    source: &dyn ChunkSource,
    descriptor: &ChunkDescriptor,
    chunk: &mut ResultChunk,
    policy: &RetryPolicy,
    cancel_token: &CancellationToken,
) -> Result<()> {
    let mut retry_count: u32 = 0;

    loop {
        if cancel_token.is_cancelled() {
            return Err(cancelled(descriptor));
        }

        let payload = tokio::select! {
            _ = cancel_token.cancelled() => return Err(cancelled(descriptor)),
            payload = source.fetch(descriptor) => payload?,
        };

        // The reader borrows the payload and is not Send; keep it out of the
        // scope of the backoff await below.
        let loaded = chunk.load(payload.reader());

        let e = match loaded {
            Ok(()) => {
                trace!(
                    "Chunk {} decoded: {} rows after {} retries",
                    descriptor.index,
                    chunk.row_count(),
                    retry_count
                );
                return Ok(());
            }
            Err(e) if e.is_retryable() => e,
            Err(e) => return Err(e),
        };

        chunk.discard_rows();
        retry_count += 1;

        if !policy.allows(retry_count) {
            error!(
                "Chunk {} exceeded max retries ({}): {}",
                descriptor.index, policy.max_retries, e
            );
            return Err(ErrorHelper::retries_exhausted().message(format!(
                "Chunk {} failed to decode after {} retries: {}",
                descriptor.index, policy.max_retries, e
            )));
        }

        let delay = policy.delay_for(retry_count);
        warn!(
            "Chunk {} decode failed (retry {}), retrying in {:?}: {}",
            descriptor.index, retry_count, delay, e
        );

        tokio::select! {
            _ = cancel_token.cancelled() => return Err(cancelled(descriptor)),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

fn cancelled(descriptor: &ChunkDescriptor) -> crate::error::Error {
    ErrorHelper::cancelled().message(format!("Download of chunk {} cancelled", descriptor.index))
}
