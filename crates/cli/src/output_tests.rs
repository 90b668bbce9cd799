// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use dama_core::Headers;
use yare::parameterized;

fn message(destination: &str, body: &str) -> InboundMessage {
    InboundMessage {
        subscription: "sub-0".into(),
        destination: destination.into(),
        headers: Headers::new(),
        body: body.into(),
    }
}

#[parameterized(
    chat_line = {
        "/topic/room/3/chat",
        r#"{"id":1,"senderId":2,"senderName":"anna","content":"gg"}"#,
        "[chat] anna: gg"
    },
    malformed_chat_is_raw = { "/topic/room/3/chat", "{oops", "[/topic/room/3/chat] {oops" },
    room_event = {
        "/topic/rooms/42",
        "{\"type\":\"PLAYER_JOINED\"}\n",
        "[/topic/rooms/42] {\"type\":\"PLAYER_JOINED\"}"
    },
)]
fn renders_messages(destination: &str, body: &str, expected: &str) {
    assert_eq!(render_message(&message(destination, body)), expected);
}

#[parameterized(
    with_status = { r#"{"date":1760745600000,"statusCode":400,"message":"Invalid move."}"#, "Invalid move. (status 400)" },
    message_only = { r#"{"message":"Not your turn."}"#, "Not your turn." },
    no_message = { r#"{"statusCode":500}"#, r#"{"statusCode":500}"# },
    plain_text = { "forbidden\n", "forbidden" },
)]
fn renders_errors(body: &str, expected: &str) {
    assert_eq!(render_error(body), expected);
}
