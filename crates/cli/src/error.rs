// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors reported by the `dama` binary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("email required\n  hint: pass --email <address>")]
    MissingEmail,

    #[error("password required\n  hint: set DAMA_PASSWORD or pass --password")]
    MissingPassword,

    #[error("could not subscribe to {0}")]
    Subscribe(String),

    #[error("server rejected the request: {0}")]
    Rejected(String),

    #[error(transparent)]
    Client(#[from] dama_client::ClientError),

    #[error(transparent)]
    Protocol(#[from] dama_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
