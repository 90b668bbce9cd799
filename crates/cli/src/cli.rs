// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use clap::{Args, Parser, Subcommand};

const QUICKSTART_HELP: &str = "\
Get started:
  dama --email me@example.com watch-room 42     Follow a room and its chat
  dama --email me@example.com chat 42 gg        Say something in a room
  dama --email me@example.com move 7 5 0 4 1    Move a piece from (5,0) to (4,1)

The password is read from DAMA_PASSWORD unless --password is given.";

#[derive(Parser, Debug)]
#[command(name = "dama")]
#[command(about = "Realtime client for online dáma (checkers)")]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// REST API base URL (overrides DAMA_API_BASE_URL)
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    /// STOMP WebSocket endpoint (overrides DAMA_WS_URL)
    #[arg(long = "ws-url", global = true)]
    pub ws_url: Option<String>,

    /// Account email
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// Account password (prefer DAMA_PASSWORD)
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Follow a room's lobby events and chat until interrupted
    #[command(name = "watch-room")]
    WatchRoom {
        /// Room ID
        room_id: i64,
    },

    /// Follow a game's state updates until interrupted
    #[command(name = "watch-game")]
    WatchGame {
        /// Game ID
        game_id: i64,
    },

    /// Post a chat message to a room
    Chat {
        /// Room ID
        room_id: i64,

        /// Message text (joined with spaces)
        #[arg(required = true, num_args = 1..)]
        message: Vec<String>,
    },

    /// Submit a move in a game
    Move {
        /// Game ID
        game_id: i64,
        from_row: u8,
        from_col: u8,
        to_row: u8,
        to_col: u8,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
