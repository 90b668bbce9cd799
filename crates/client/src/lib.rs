// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime client for the dáma checkers backend.
//!
//! - [`ConnectionManager`]: the single STOMP session, its subscriptions and
//!   outbound queue
//! - [`TokenRefreshCoordinator`]: proactive and on-demand session refresh
//! - [`RefreshingClient`]: REST wrapper that refreshes on 401 and retries
//! - [`RealtimeClient`]: wires the three together for one signed-in user

pub mod auth;
pub mod client;
pub mod config;
pub mod env;
pub mod error;
pub mod interceptor;
pub mod manager;
pub mod notify;
pub mod queue;
pub mod refresh;
pub mod rest;
pub mod stomp;
mod subscriptions;
pub mod task;
pub mod transport;

#[cfg(test)]
mod test_helpers;

pub use client::RealtimeClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use interceptor::RefreshingClient;
pub use manager::{
    ConnectError, ConnectResult, ConnectionManager, ConnectionStatus, SubscribeOptions,
    SubscriptionHandle,
};
pub use notify::{ListenerHandle, RefreshNotifier};
pub use refresh::{RefreshError, TokenRefreshCoordinator};
pub use rest::{HttpClient, Method, RestClient, RestError};
pub use stomp::StompTransport;
pub use subscriptions::MessageCallback;
pub use transport::{
    InboundMessage, OpenRequest, Session, SessionHandle, Transport, TransportError,
    TransportEvent,
};
