// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! dama-core: Shared protocol library for the dama checkers client
//!
//! This crate provides the STOMP 1.2 frame model and codec, heart-beat
//! negotiation, the backend's destination layout and the JSON payloads
//! exchanged over the realtime channel. It does no I/O.

pub mod destination;
pub mod error;
pub mod frame;
pub mod heartbeat;
pub mod payload;

pub use error::{Error, Result};
pub use frame::{Command, Frame, Headers};
pub use heartbeat::HeartBeat;
pub use payload::{ChatMessage, ChatMessageRequest, MoveRequest, ServerError};
