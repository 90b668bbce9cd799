// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

use crate::manager::ConnectError;
use crate::refresh::RefreshError;
use crate::rest::RestError;

/// Errors surfaced by [`crate::RealtimeClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Rest(#[from] RestError),

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error(transparent)]
    Protocol(#[from] dama_core::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
