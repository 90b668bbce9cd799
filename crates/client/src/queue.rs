// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound queue for messages sent while the session is down.
//!
//! In-memory and bounded: when full, the oldest message is evicted. Queued
//! messages are flushed in order once the session is connected. A message
//! that keeps failing is re-queued until it has failed
//! [`MAX_SEND_RETRIES`] flushes, then dropped.

use std::collections::VecDeque;

use dama_core::Headers;
use tracing::{error, warn};

use crate::transport::TransportError;

pub const DEFAULT_CAPACITY: usize = 500;

pub const MAX_SEND_RETRIES: u32 = 3;

/// A message waiting to be published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    pub destination: String,
    pub body: String,
    pub headers: Headers,
    /// Failed flushes so far.
    pub retry_count: u32,
}

impl PendingMessage {
    pub fn new(destination: impl Into<String>, body: impl Into<String>, headers: Headers) -> Self {
        PendingMessage {
            destination: destination.into(),
            body: body.into(),
            headers,
            retry_count: 0,
        }
    }
}

/// Outcome of one [`OutboundQueue::flush`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub sent: usize,
    pub requeued: usize,
    pub dropped: usize,
}

pub struct OutboundQueue {
    messages: VecDeque<PendingMessage>,
    capacity: usize,
    max_retries: u32,
}

impl OutboundQueue {
    pub fn new(capacity: usize, max_retries: u32) -> Self {
        OutboundQueue {
            messages: VecDeque::new(),
            capacity: capacity.max(1),
            max_retries,
        }
    }

    /// Appends a message, evicting and returning the oldest one if full.
    pub fn push(&mut self, message: PendingMessage) -> Option<PendingMessage> {
        let evicted = if self.messages.len() >= self.capacity {
            self.messages.pop_front()
        } else {
            None
        };
        if let Some(old) = &evicted {
            warn!(
                destination = %old.destination,
                capacity = self.capacity,
                "outbound queue full, dropping oldest message"
            );
        }
        self.messages.push_back(message);
        evicted
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingMessage> {
        self.messages.iter()
    }

    /// Publishes every queued message in order.
    ///
    /// A message whose publish fails goes back on the queue with its retry
    /// count bumped, unless that count reaches the retry limit, in which case
    /// it is dropped.
    pub fn flush<F>(&mut self, mut publish: F) -> FlushReport
    where
        F: FnMut(&PendingMessage) -> Result<(), TransportError>,
    {
        let mut report = FlushReport::default();
        for mut message in std::mem::take(&mut self.messages) {
            let Err(e) = publish(&message) else {
                report.sent += 1;
                continue;
            };

            message.retry_count += 1;
            if message.retry_count >= self.max_retries {
                error!(
                    destination = %message.destination,
                    attempts = message.retry_count,
                    error = %e,
                    "dropping message after repeated send failures"
                );
                report.dropped += 1;
            } else {
                warn!(
                    destination = %message.destination,
                    retry = message.retry_count,
                    error = %e,
                    "send failed, message re-queued"
                );
                self.messages.push_back(message);
                report.requeued += 1;
            }
        }
        report
    }
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, MAX_SEND_RETRIES)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
