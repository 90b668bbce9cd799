// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! STOMP heart-beat header and negotiation.
//!
//! Each side advertises `cx,cy`: the smallest interval at which it can send
//! heart-beats and the interval at which it wants to receive them, in
//! milliseconds. Zero means "cannot" / "does not want".

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// One side's heart-beat settings, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeartBeat {
    /// Interval at which heart-beats are sent.
    pub outgoing_ms: u64,
    /// Interval at which heart-beats are expected.
    pub incoming_ms: u64,
}

impl HeartBeat {
    pub fn new(outgoing_ms: u64, incoming_ms: u64) -> Self {
        HeartBeat {
            outgoing_ms,
            incoming_ms,
        }
    }

    /// Heart-beats disabled in both directions.
    pub fn disabled() -> Self {
        HeartBeat::default()
    }

    /// Computes the effective intervals for the client.
    ///
    /// `self` is what the client asked for, `server` is the value of the
    /// CONNECTED frame's `heart-beat` header.
    pub fn negotiate(&self, server: &HeartBeat) -> HeartBeat {
        let outgoing_ms = if self.outgoing_ms == 0 || server.incoming_ms == 0 {
            0
        } else {
            self.outgoing_ms.max(server.incoming_ms)
        };
        let incoming_ms = if self.incoming_ms == 0 || server.outgoing_ms == 0 {
            0
        } else {
            self.incoming_ms.max(server.outgoing_ms)
        };
        HeartBeat {
            outgoing_ms,
            incoming_ms,
        }
    }

    /// Send interval, or `None` when disabled.
    pub fn outgoing(&self) -> Option<Duration> {
        (self.outgoing_ms > 0).then(|| Duration::from_millis(self.outgoing_ms))
    }

    /// Receive interval, or `None` when disabled.
    pub fn incoming(&self) -> Option<Duration> {
        (self.incoming_ms > 0).then(|| Duration::from_millis(self.incoming_ms))
    }
}

impl fmt::Display for HeartBeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.outgoing_ms, self.incoming_ms)
    }
}

impl FromStr for HeartBeat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (out, inc) = s
            .split_once(',')
            .ok_or_else(|| Error::InvalidHeartBeat(s.to_string()))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u64>()
                .map_err(|_| Error::InvalidHeartBeat(s.to_string()))
        };
        Ok(HeartBeat::new(parse(out)?, parse(inc)?))
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
