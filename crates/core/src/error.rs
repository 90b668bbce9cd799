// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for dama-core operations.

use thiserror::Error;

/// All possible errors that can occur while decoding protocol data.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown STOMP command: '{0}'")]
    UnknownCommand(String),

    #[error("malformed header line: '{0}'\n  hint: headers must be 'name:value'")]
    MalformedHeader(String),

    #[error("invalid escape sequence in header: '{0}'")]
    InvalidEscape(String),

    #[error("invalid content-length: '{0}'")]
    InvalidContentLength(String),

    #[error("truncated frame: {0}")]
    Truncated(&'static str),

    #[error("invalid heart-beat header: '{0}'\n  hint: expected two comma-separated millisecond values, e.g. 10000,10000")]
    InvalidHeartBeat(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for dama-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
