// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for the realtime session.
//!
//! Provides a trait-based transport layer that enables:
//! - A STOMP-over-WebSocket session for production ([`crate::stomp`])
//! - Mock transports for unit testing
//!
//! Opening a transport returns a [`Session`] immediately; the handshake
//! completes in the background and its progress is reported as
//! [`TransportEvent`]s on the channel supplied with the [`OpenRequest`].

use std::sync::Arc;

use dama_core::{Frame, Headers, HeartBeat};
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

/// Broker-assigned id of a live subscription within one session.
pub type SubscriptionId = String;

/// Error type for transport operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// The session has not completed its handshake.
    #[error("not connected")]
    NotConnected,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The peer sent something that is not valid STOMP.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// A MESSAGE delivered on a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub subscription: SubscriptionId,
    pub destination: String,
    pub headers: Headers,
    pub body: String,
}

impl InboundMessage {
    /// Builds a message from a MESSAGE frame; `None` if the frame lacks a
    /// `subscription` header.
    pub fn from_frame(frame: &Frame) -> Option<Self> {
        let subscription = frame.get("subscription")?.to_string();
        let destination = frame.get("destination").unwrap_or_default().to_string();
        let mut headers = Headers::new();
        for (name, value) in &frame.headers {
            headers.entry(name.clone()).or_insert_with(|| value.clone());
        }
        Some(InboundMessage {
            subscription,
            destination,
            headers,
            body: frame.body.clone(),
        })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Decodes the JSON body.
    pub fn json<T: DeserializeOwned>(&self) -> dama_core::Result<T> {
        dama_core::payload::from_json(&self.body)
    }
}

/// Progress of a session, in order.
///
/// `Ready` or `Error` settles the handshake; `Closed` is always the last
/// event and is reported exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The broker accepted the CONNECT.
    Ready,
    /// A broker ERROR frame or socket failure, with its detail.
    Error(String),
    Message(InboundMessage),
    Closed,
}

/// Everything needed to open a session.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub url: String,
    /// Extra CONNECT headers, such as `Authorization`.
    pub connect_headers: Headers,
    pub heartbeat: HeartBeat,
    pub events: mpsc::UnboundedSender<TransportEvent>,
}

/// One STOMP session.
///
/// Operations enqueue frames and return without waiting for the network;
/// failures after the frame left are reported through the event channel.
pub trait Session: Send + Sync {
    fn subscribe(&self, destination: &str, headers: &Headers) -> TransportResult<SubscriptionId>;

    fn unsubscribe(&self, id: &str) -> TransportResult<()>;

    fn publish(&self, destination: &str, body: &str, headers: &Headers) -> TransportResult<()>;

    /// Starts a graceful shutdown; `Closed` follows once it completes.
    fn deactivate(&self);

    fn is_connected(&self) -> bool;
}

/// Shared handle to the active session.
pub type SessionHandle = Arc<dyn Session>;

/// Session factory.
pub trait Transport: Send + Sync {
    fn open(&self, request: OpenRequest) -> TransportResult<SessionHandle>;
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
