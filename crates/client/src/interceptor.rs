// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! REST refresh interceptor.
//!
//! Wraps a [`RestClient`] so that a 401 triggers one session refresh through
//! the [`TokenRefreshCoordinator`] followed by a single retry. Concurrent
//! 401s share the coordinator's in-flight refresh.

use tracing::debug;

use crate::refresh::TokenRefreshCoordinator;
use crate::rest::{is_auth_path, Method, RestClient, RestError, RestFuture};

pub struct RefreshingClient<C> {
    inner: C,
    coordinator: TokenRefreshCoordinator,
}

impl<C: RestClient> RefreshingClient<C> {
    pub fn new(inner: C, coordinator: TokenRefreshCoordinator) -> Self {
        RefreshingClient { inner, coordinator }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: RestClient> RestClient for RefreshingClient<C> {
    fn request<'a>(
        &'a self,
        method: Method,
        path: &'a str,
        body: Option<String>,
    ) -> RestFuture<'a, String> {
        Box::pin(async move {
            // Auth endpoints fail with 401 for reasons a refresh cannot fix.
            if is_auth_path(path) {
                return self.inner.request(method, path, body).await;
            }

            match self.inner.request(method, path, body.clone()).await {
                Err(RestError::Unauthorized) => {
                    debug!(?method, path, "unauthorized, refreshing session before retry");
                    self.coordinator.refresh().await?;
                    self.inner.request(method, path, body).await
                }
                other => other,
            }
        })
    }
}

#[cfg(test)]
#[path = "interceptor_tests.rs"]
mod tests;
