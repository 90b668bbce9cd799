// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON payloads exchanged over the realtime channel.
//!
//! Field names follow the backend's camelCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A move submitted to `/app/games/{id}/move`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub from_row: u8,
    pub from_col: u8,
    pub to_row: u8,
    pub to_col: u8,
}

impl MoveRequest {
    pub fn new(from: (u8, u8), to: (u8, u8)) -> Self {
        MoveRequest {
            from_row: from.0,
            from_col: from.1,
            to_row: to.0,
            to_col: to.1,
        }
    }
}

/// A chat line posted to `/app/room/{id}/chat/send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    pub content: String,
}

impl ChatMessageRequest {
    pub fn new(content: impl Into<String>) -> Self {
        ChatMessageRequest {
            content: content.into(),
        }
    }
}

/// A chat line broadcast on `/topic/room/{id}/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    pub content: String,
}

/// An error delivered on `/user/queue/errors` or in a REST error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerError {
    /// When the server raised the error (epoch milliseconds on the wire).
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Serializes a payload to its JSON body.
pub fn to_json<T: Serialize>(payload: &T) -> crate::Result<String> {
    Ok(serde_json::to_string(payload)?)
}

/// Deserializes a payload from a MESSAGE body.
pub fn from_json<T: for<'de> Deserialize<'de>>(body: &str) -> crate::Result<T> {
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
