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

//! Error types for result retrieval.
//!
//! Errors are built through [`ErrorHelper`], one constructor per [`ErrorKind`]:
//!
//! ```ignore
//! return Err(ErrorHelper::decode().message(format!("bad escape \\{}", c as char)));
//! ```

use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Category of a failure. Drives the retry decision in the decode task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport failure: connection error, non-2xx status, truncated body.
    Io,
    /// Malformed chunk payload or cell text. Retried by the decode task.
    Decode,
    /// Logical/physical type combination with no decode rule.
    Unsupported,
    /// Caller broke a precondition (no current row, column out of range, ...).
    InvalidState,
    /// Bad configuration key or value.
    InvalidArgument,
    /// The pipeline was cancelled.
    Cancelled,
    /// A chunk kept failing to decode after the configured number of retries.
    RetriesExhausted,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Io => "I/O error",
            ErrorKind::Decode => "decode error",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::InvalidState => "invalid state",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::RetriesExhausted => "retries exhausted",
        };
        f.write_str(name)
    }
}

/// Error raised anywhere in the result pipeline.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Only decode failures are worth another attempt; everything else is
    /// either the transport layer's business or a permanent mismatch.
    pub fn is_retryable(&self) -> bool {
        self.kind == ErrorKind::Decode
    }
}

/// Builder returned by the [`ErrorHelper`] constructors.
#[derive(Debug, Clone, Copy)]
pub struct ErrorBuilder {
    kind: ErrorKind,
}

impl ErrorBuilder {
    pub fn message(self, message: impl Into<String>) -> Error {
        Error::new(self.kind, message)
    }
}

/// Entry point for building errors of a given kind.
pub struct ErrorHelper;

impl ErrorHelper {
    pub fn io() -> ErrorBuilder {
        ErrorBuilder { kind: ErrorKind::Io }
    }

    pub fn decode() -> ErrorBuilder {
        ErrorBuilder {
            kind: ErrorKind::Decode,
        }
    }

    pub fn unsupported() -> ErrorBuilder {
        ErrorBuilder {
            kind: ErrorKind::Unsupported,
        }
    }

    pub fn invalid_state() -> ErrorBuilder {
        ErrorBuilder {
            kind: ErrorKind::InvalidState,
        }
    }

    pub fn invalid_argument() -> ErrorBuilder {
        ErrorBuilder {
            kind: ErrorKind::InvalidArgument,
        }
    }

    pub fn cancelled() -> ErrorBuilder {
        ErrorBuilder {
            kind: ErrorKind::Cancelled,
        }
    }

    pub fn retries_exhausted() -> ErrorBuilder {
        ErrorBuilder {
            kind: ErrorKind::RetriesExhausted,
        }
    }

    /// Error for an option key nobody recognises.
    pub fn unknown_option(key: &str) -> Error {
        Self::invalid_argument().message(format!("unknown option '{}'", key))
    }

    /// Error for a recognised option key with an unparsable value.
    pub fn invalid_option(key: &str, value: &str) -> Error {
        Self::invalid_argument().message(format!("invalid value '{}' for option '{}'", value, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_kind() {
        let err = ErrorHelper::decode().message("unexpected end of stream");
        assert_eq!(err.to_string(), "decode error: unexpected end of stream");
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_only_decode_errors_are_retryable() {
        assert!(ErrorHelper::decode().message("x").is_retryable());
        assert!(!ErrorHelper::io().message("x").is_retryable());
        assert!(!ErrorHelper::unsupported().message("x").is_retryable());
        assert!(!ErrorHelper::cancelled().message("x").is_retryable());
        assert!(!ErrorHelper::retries_exhausted().message("x").is_retryable());
    }

    #[test]
    fn test_option_errors() {
        let err = ErrorHelper::unknown_option("results.nope");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().contains("results.nope"));

        let err = ErrorHelper::invalid_option("results.max_retries", "abc");
        assert!(err.message().contains("abc"));
    }
}
