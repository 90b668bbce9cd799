// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::Parser;
use dama_cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    dama_cli::logging::setup_logging(cli.global.verbose);

    if let Err(e) = dama_cli::run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
