// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! REST access to the backend API.
//!
//! [`RestClient`] is the seam the connection manager, the refresh
//! coordinator and the refresh interceptor depend on. [`HttpClient`] is the
//! reqwest implementation; the backend keeps its session credential in
//! cookies, so the cookie store is always enabled.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::refresh::RefreshError;

pub const AUTH_PREFIX: &str = "/auth/";
pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const WS_TOKEN_PATH: &str = "/auth/ws-token";
pub const USERS_PATH: &str = "/users";

/// Error type for REST operations.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("{message} (status {status})")]
    Status { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error(transparent)]
    Refresh(#[from] RefreshError),
}

/// Result type for REST operations.
pub type RestResult<T> = Result<T, RestError>;

/// Boxed future returned by [`RestClient`] methods.
pub type RestFuture<'a, T> = Pin<Box<dyn Future<Output = RestResult<T>> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Request/response access to the backend API.
///
/// Paths are relative to the API base URL. Bodies are JSON text; the
/// response body is returned as text for the caller to decode.
pub trait RestClient: Send + Sync {
    fn request<'a>(
        &'a self,
        method: Method,
        path: &'a str,
        body: Option<String>,
    ) -> RestFuture<'a, String>;

    fn get<'a>(&'a self, path: &'a str) -> RestFuture<'a, String> {
        self.request(Method::Get, path, None)
    }

    fn post<'a>(&'a self, path: &'a str, body: Option<String>) -> RestFuture<'a, String> {
        self.request(Method::Post, path, body)
    }

    fn patch<'a>(&'a self, path: &'a str, body: Option<String>) -> RestFuture<'a, String> {
        self.request(Method::Patch, path, body)
    }

    fn delete<'a>(&'a self, path: &'a str) -> RestFuture<'a, String> {
        self.request(Method::Delete, path, None)
    }
}

impl<T: RestClient + ?Sized> RestClient for Arc<T> {
    fn request<'a>(
        &'a self,
        method: Method,
        path: &'a str,
        body: Option<String>,
    ) -> RestFuture<'a, String> {
        (**self).request(method, path, body)
    }
}

/// reqwest-backed [`RestClient`].
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> RestResult<Self> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(HttpClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl RestClient for HttpClient {
    fn request<'a>(
        &'a self,
        method: Method,
        path: &'a str,
        body: Option<String>,
    ) -> RestFuture<'a, String> {
        Box::pin(async move {
            let mut request = self.client.request(method.as_reqwest(), self.url(path));
            if let Some(body) = body {
                request = request.header(CONTENT_TYPE, "application/json").body(body);
            }

            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;
            debug!(?method, path, status = status.as_u16(), "rest response");

            if status == StatusCode::UNAUTHORIZED {
                return Err(RestError::Unauthorized);
            }
            if !status.is_success() {
                return Err(RestError::Status {
                    status: status.as_u16(),
                    message: error_message(&text, status.as_u16()),
                });
            }
            Ok(text)
        })
    }
}

/// Extracts a human readable message from an error response body.
///
/// Prefers the JSON `message` field, then `error`, then a generic message
/// naming the status.
pub fn error_message(body: &str, status: u16) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error"]
                .iter()
                .find_map(|key| value.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| format!("request failed with status {}", status))
}

/// Returns `true` for the authentication endpoints, which the refresh
/// interceptor never retries.
pub fn is_auth_path(path: &str) -> bool {
    path.starts_with(AUTH_PREFIX)
}

/// Obtains a short-lived bearer token for the STOMP CONNECT frame.
pub async fn fetch_ws_token(rest: &dyn RestClient) -> RestResult<String> {
    let body = rest.post(WS_TOKEN_PATH, None).await?;
    parse_token(&body)
}

/// Accepts a bare token, a JSON string or `{"token": "..."}`.
pub fn parse_token(body: &str) -> RestResult<String> {
    let trimmed = body.trim();
    let token = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::String(token)) => token,
        Ok(Value::Object(map)) => match map.get("token") {
            Some(Value::String(token)) => token.clone(),
            _ => return Err(RestError::Decode("missing token field".to_string())),
        },
        Ok(Value::Null) | Ok(Value::Array(_)) => {
            return Err(RestError::Decode(format!("unexpected token body: {}", trimmed)))
        }
        _ => trimmed.to_string(),
    };

    if token.is_empty() {
        return Err(RestError::Decode("empty token".to_string()));
    }
    Ok(token)
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod tests;
