// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! The variable name constants are generated by `build.rs` and live in the
//! [`vars`] submodule.

/// Generated environment variable name constants.
pub mod vars {
    include!(concat!(env!("OUT_DIR"), "/env_vars.rs"));
}

/// Returns the value of `DAMA_API_BASE_URL` if set and non-empty.
pub fn api_base_url() -> Option<String> {
    non_empty(vars::DAMA_API_BASE_URL)
}

/// Returns the value of `DAMA_WS_URL` if set and non-empty.
pub fn websocket_url() -> Option<String> {
    non_empty(vars::DAMA_WS_URL)
}

/// Returns the value of `DAMA_PASSWORD` if set and non-empty.
pub fn password() -> Option<String> {
    non_empty(vars::DAMA_PASSWORD)
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
