// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Destination layout of the checkers backend's message broker.
//!
//! - `/topic/...` broadcast topics the client subscribes to
//! - `/user/queue/...` per-user queues
//! - `/app/...` application handlers the client publishes to

/// Errors raised by the server for this user (rejected moves, bad chat, ...).
pub const USER_ERRORS: &str = "/user/queue/errors";

/// Room lobby updates: joins, leaves, ready state, game start.
pub fn room(room_id: i64) -> String {
    format!("/topic/rooms/{}", room_id)
}

/// Game state updates: moves, captures, promotions, game over.
pub fn game(game_id: i64) -> String {
    format!("/topic/games/{}", game_id)
}

/// Chat messages broadcast within a room.
pub fn room_chat(room_id: i64) -> String {
    format!("/topic/room/{}/chat", room_id)
}

/// Submit a move for a game.
pub fn game_move(game_id: i64) -> String {
    format!("/app/games/{}/move", game_id)
}

/// Post a chat message to a room.
pub fn chat_send(room_id: i64) -> String {
    format!("/app/room/{}/chat/send", room_id)
}

#[cfg(test)]
#[path = "destination_tests.rs"]
mod tests;
