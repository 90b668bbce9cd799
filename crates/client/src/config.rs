// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Every knob has a default matching the backend's deployment. The two URLs
//! can be overridden at build time (`option_env!`) or at run time through
//! [`ClientConfig::from_env`].

use std::time::Duration;

use dama_core::HeartBeat;

use crate::env;

/// REST API base URL used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";

/// STOMP WebSocket endpoint used when nothing else is configured.
pub const DEFAULT_WEBSOCKET_URL: &str = "ws://localhost:8080/ws/websocket";

/// Heart-beat interval requested in both directions, in milliseconds.
pub const DEFAULT_HEARTBEAT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub websocket_url: String,
    /// Upper bound on a connect attempt, from token fetch to CONNECTED.
    pub connect_timeout: Duration,
    pub heartbeat: HeartBeat,
    /// Period of the proactive token refresh.
    pub refresh_interval: Duration,
    /// Quiet period after a refresh before the session is rebuilt.
    pub reconnect_debounce: Duration,
    /// How long to wait for a graceful shutdown before clearing the session.
    pub deactivate_timeout: Duration,
    pub queue_capacity: usize,
    pub max_send_retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_base_url: option_env!("DAMA_API_BASE_URL")
                .unwrap_or(DEFAULT_API_BASE_URL)
                .to_string(),
            websocket_url: option_env!("DAMA_WS_URL")
                .unwrap_or(DEFAULT_WEBSOCKET_URL)
                .to_string(),
            connect_timeout: Duration::from_secs(10),
            heartbeat: HeartBeat::new(DEFAULT_HEARTBEAT_MS, DEFAULT_HEARTBEAT_MS),
            refresh_interval: Duration::from_secs(25 * 60),
            reconnect_debounce: Duration::from_secs(1),
            deactivate_timeout: Duration::from_secs(3),
            queue_capacity: crate::queue::DEFAULT_CAPACITY,
            max_send_retries: crate::queue::MAX_SEND_RETRIES,
        }
    }
}

impl ClientConfig {
    /// Defaults, with the URLs overridden by `DAMA_API_BASE_URL` and
    /// `DAMA_WS_URL` when set.
    pub fn from_env() -> Self {
        let mut config = ClientConfig::default();
        if let Some(url) = env::api_base_url() {
            config.api_base_url = url;
        }
        if let Some(url) = env::websocket_url() {
            config.websocket_url = url;
        }
        config
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_websocket_url(mut self, url: impl Into<String>) -> Self {
        self.websocket_url = url.into();
        self
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
