// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Library behind the `dama` binary.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;

pub use cli::{Cli, Command, GlobalArgs};
pub use error::{Error, Result};

/// Signs in, runs `cli.command`, then signs out.
pub async fn run(cli: Cli) -> Result<()> {
    commands::run(cli.global, cli.command).await
}
