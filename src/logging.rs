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

//! Opt-in `tracing` subscriber for applications embedding the pipeline.
//!
//! The library only emits events; it never installs a subscriber on its own.
//! A driver that has no logging setup of its own can call [`init_logging`]
//! with the `results.log_level` / `results.log_file` options. Without an
//! explicit level, `RUST_LOG` is honoured, falling back to `warn`.

use crate::error::{ErrorHelper, Result};
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const TARGET: &str = "warehouse_results";

/// Logging configuration, part of [`ChunkDownloaderConfig`](crate::types::ChunkDownloaderConfig).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`, any case.
    pub level: Option<String>,
    /// Append to this file instead of writing to stderr.
    pub file: Option<String>,
}

impl LogConfig {
    /// Parsed level, `None` when unset.
    pub fn level_filter(&self) -> Result<Option<LevelFilter>> {
        match &self.level {
            Some(level) => level
                .trim()
                .parse::<LevelFilter>()
                .map(Some)
                .map_err(|_| ErrorHelper::invalid_option("results.log_level", level)),
            None => Ok(None),
        }
    }

    /// Filter scoped to this crate, or `None` when logging is switched off.
    pub fn env_filter(&self) -> Result<Option<EnvFilter>> {
        let filter = match self.level_filter()? {
            Some(LevelFilter::OFF) => return Ok(None),
            Some(level) => EnvFilter::new(format!("{}={}", TARGET, level)),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("{}=warn", TARGET))),
        };
        Ok(Some(filter))
    }

    fn make_writer(&self) -> Result<BoxMakeWriter> {
        match &self.file {
            Some(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| {
                        ErrorHelper::io().message(format!("cannot open log file {}: {}", path, e))
                    })?;
                Ok(BoxMakeWriter::new(Mutex::new(file)))
            }
            None => Ok(BoxMakeWriter::new(std::io::stderr)),
        }
    }
}

/// Install a global subscriber built from `config`.
///
/// Returns `Ok(false)` when logging is off or the process already has a
/// global subscriber, which is left untouched.
pub fn init_logging(config: &LogConfig) -> Result<bool> {
    let Some(filter) = config.env_filter()? else {
        return Ok(false);
    };
    let writer = config.make_writer()?;

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_ansi(config.file.is_none()),
        )
        .try_init()
        .is_ok();
    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn with_level(level: &str) -> LogConfig {
        LogConfig {
            level: Some(level.to_string()),
            file: None,
        }
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!(LogConfig::default().level_filter().unwrap(), None);
        assert_eq!(
            with_level("DEBUG").level_filter().unwrap(),
            Some(LevelFilter::DEBUG)
        );
        let err = with_level("chatty").level_filter().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_filter_is_scoped_to_crate() {
        let filter = with_level("Trace").env_filter().unwrap().unwrap();
        assert!(filter.to_string().contains("warehouse_results=trace"));
        assert!(with_level("off").env_filter().unwrap().is_none());
    }

    #[test]
    fn test_init_logging_off_installs_nothing() {
        assert!(!init_logging(&with_level("OFF")).unwrap());
    }

    #[test]
    fn test_unopenable_log_file_is_an_error() {
        let config = LogConfig {
            level: Some("info".to_string()),
            file: Some("/nonexistent-dir/results.log".to_string()),
        };
        let err = init_logging(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
