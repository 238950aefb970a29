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

//! Downloader configuration and its string option surface.

use crate::client::HttpClientConfig;
use crate::error::{ErrorHelper, Result};
use crate::logging::LogConfig;
use std::time::Duration;

/// Configuration for the chunk downloader.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDownloaderConfig {
    /// Upper bound on chunks downloaded and decoded concurrently.
    pub prefetch_threads: usize,
    /// Decode retries per chunk before giving up. `0` means unlimited.
    pub max_retries: u32,
    /// Delay before the first decode retry; doubles on every further retry.
    pub initial_backoff: Duration,
    /// Ceiling for the doubling backoff.
    pub max_backoff: Duration,
    /// Log warning if download speed falls below this threshold (MB/s).
    pub speed_threshold_mbps: f64,
    /// HTTP client settings used by [`HttpChunkSource`](crate::reader::HttpChunkSource).
    pub http: HttpClientConfig,
    pub log: LogConfig,
}

impl Default for ChunkDownloaderConfig {
    fn default() -> Self {
        Self {
            prefetch_threads: 4,
            max_retries: 7,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(16),
            speed_threshold_mbps: 0.1,
            http: HttpClientConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl ChunkDownloaderConfig {
    /// Set an option from its string form.
    ///
    /// | Key | Default |
    /// |-----|---------|
    /// | `results.prefetch_threads` | 4 |
    /// | `results.max_retries` | 7 (0 = unlimited) |
    /// | `results.retry_backoff_ms` | 1000 |
    /// | `results.max_retry_backoff_ms` | 16000 |
    /// | `results.speed_threshold_mbps` | 0.1 |
    /// | `results.http.connect_timeout_ms` | 30000 |
    /// | `results.http.read_timeout_ms` | 60000 |
    /// | `results.log_level` | unset |
    /// | `results.log_file` | unset |
    pub fn set_option(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "results.prefetch_threads" => {
                let v = parse_int_option(key, value)?;
                if v == 0 {
                    return Err(ErrorHelper::invalid_option(key, value));
                }
                self.prefetch_threads = v as usize;
            }
            "results.max_retries" => {
                // Any value <= 0 selects unlimited retries.
                let v: i64 = value
                    .trim()
                    .parse()
                    .map_err(|_| ErrorHelper::invalid_option(key, value))?;
                self.max_retries = v.clamp(0, u32::MAX as i64) as u32;
            }
            "results.retry_backoff_ms" => {
                self.initial_backoff = Duration::from_millis(parse_int_option(key, value)?);
            }
            "results.max_retry_backoff_ms" => {
                self.max_backoff = Duration::from_millis(parse_int_option(key, value)?);
            }
            "results.speed_threshold_mbps" => {
                self.speed_threshold_mbps = value
                    .trim()
                    .parse()
                    .map_err(|_| ErrorHelper::invalid_option(key, value))?;
            }
            "results.http.connect_timeout_ms" => {
                self.http.connect_timeout = Duration::from_millis(parse_int_option(key, value)?);
            }
            "results.http.read_timeout_ms" => {
                self.http.read_timeout = Duration::from_millis(parse_int_option(key, value)?);
            }
            "results.log_level" => {
                let log = LogConfig {
                    level: Some(value.to_string()),
                    ..self.log.clone()
                };
                log.level_filter()?;
                self.log = log;
            }
            "results.log_file" => {
                self.log.file = Some(value.to_string());
            }
            _ => return Err(ErrorHelper::unknown_option(key)),
        }
        Ok(())
    }

    /// Read an option back in its string form.
    pub fn get_option(&self, key: &str) -> Result<String> {
        let value = match key {
            "results.prefetch_threads" => self.prefetch_threads.to_string(),
            "results.max_retries" => self.max_retries.to_string(),
            "results.retry_backoff_ms" => self.initial_backoff.as_millis().to_string(),
            "results.max_retry_backoff_ms" => self.max_backoff.as_millis().to_string(),
            "results.speed_threshold_mbps" => self.speed_threshold_mbps.to_string(),
            "results.http.connect_timeout_ms" => self.http.connect_timeout.as_millis().to_string(),
            "results.http.read_timeout_ms" => self.http.read_timeout.as_millis().to_string(),
            "results.log_level" => self.log.level.clone().ok_or_else(|| {
                ErrorHelper::invalid_state().message("option 'results.log_level' is not set")
            })?,
            "results.log_file" => self.log.file.clone().ok_or_else(|| {
                ErrorHelper::invalid_state().message("option 'results.log_file' is not set")
            })?,
            _ => return Err(ErrorHelper::unknown_option(key)),
        };
        Ok(value)
    }
}

fn parse_int_option(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ErrorHelper::invalid_option(key, value))
}

/// Backoff schedule for decode retries, extracted from [`ChunkDownloaderConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `0` means retry forever.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `retries` failed retries.
    pub fn allows(&self, retries: u32) -> bool {
        self.max_retries == 0 || retries <= self.max_retries
    }

    /// Sleep before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl From<&ChunkDownloaderConfig> for RetryPolicy {
    fn from(config: &ChunkDownloaderConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: config.initial_backoff,
            max_backoff: config.max_backoff,
        }
    }
}
