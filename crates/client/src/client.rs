// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle: one object per signed-in user wiring the REST client,
//! the refresh coordinator and the connection manager together.

use std::sync::Arc;

use tracing::warn;

use crate::auth::{self, Credentials, UserInfo};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::interceptor::RefreshingClient;
use crate::manager::ConnectionManager;
use crate::refresh::TokenRefreshCoordinator;
use crate::rest::{HttpClient, RestClient};
use crate::stomp::StompTransport;
use crate::transport::{SessionHandle, Transport};

pub struct RealtimeClient {
    rest: Arc<dyn RestClient>,
    coordinator: TokenRefreshCoordinator,
    manager: ConnectionManager,
}

impl RealtimeClient {
    /// Production wiring: reqwest against `api_base_url`, STOMP over
    /// WebSocket against `websocket_url`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = HttpClient::new(&config.api_base_url)?;
        Ok(Self::with_parts(
            config,
            Arc::new(http),
            Arc::new(StompTransport::new()),
        ))
    }

    /// Wires the components around caller-supplied REST and transport
    /// implementations.
    pub fn with_parts(
        config: ClientConfig,
        http: Arc<dyn RestClient>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        // The coordinator talks to the raw client so a failing refresh cannot
        // recurse into itself.
        let coordinator = TokenRefreshCoordinator::new(Arc::clone(&http), config.refresh_interval);
        let rest: Arc<dyn RestClient> = Arc::new(RefreshingClient::new(http, coordinator.clone()));
        let manager = ConnectionManager::new(transport, Arc::clone(&rest), config);
        manager.attach_refresh(coordinator.notifier());

        RealtimeClient {
            rest,
            coordinator,
            manager,
        }
    }

    /// REST client that refreshes the session on 401.
    pub fn rest(&self) -> &Arc<dyn RestClient> {
        &self.rest
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn coordinator(&self) -> &TokenRefreshCoordinator {
        &self.coordinator
    }

    /// Signs in, then starts the refresh timer and connects.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserInfo> {
        auth::login(self.rest.as_ref(), &Credentials::new(email, password)).await?;
        let user = auth::current_user(self.rest.as_ref()).await?;
        self.resume().await?;
        Ok(user)
    }

    /// Starts the refresh timer and connects using the existing cookie
    /// session.
    pub async fn resume(&self) -> Result<SessionHandle> {
        self.coordinator.start();
        Ok(self.manager.connect().await?)
    }

    /// Stops refreshing, closes the session and signs out.
    ///
    /// The sign-out request is best effort.
    pub async fn logout(&self) {
        self.coordinator.cleanup();
        self.manager.close().await;
        if let Err(e) = auth::logout(self.rest.as_ref()).await {
            warn!(error = %e, "logout request failed");
        }
    }

    /// Detaches every component without contacting the server.
    pub fn dispose(&self) {
        self.coordinator.cleanup();
        self.manager.dispose();
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
