// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One-line renderings of inbound messages.

use dama_client::InboundMessage;
use dama_core::{ChatMessage, ServerError};

/// Renders a broadcast. Chat lines are shown as `name: text`; anything else
/// is printed raw, prefixed with its destination.
pub fn render_message(message: &InboundMessage) -> String {
    if message.destination.ends_with("/chat") {
        if let Ok(chat) = message.json::<ChatMessage>() {
            return format!("[chat] {}: {}", chat.sender_name, chat.content);
        }
    }
    format!("[{}] {}", message.destination, message.body.trim())
}

/// Text of an error pushed on the user error queue.
pub fn render_error(body: &str) -> String {
    match dama_core::payload::from_json::<ServerError>(body) {
        Ok(ServerError {
            message: Some(message),
            status_code,
            ..
        }) => match status_code {
            Some(code) => format!("{} (status {})", message, code),
            None => message,
        },
        _ => body.trim().to_string(),
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
