// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Cookie-session authentication endpoints.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::rest::{RestClient, RestError, RestResult, LOGIN_PATH, LOGOUT_PATH, USERS_PATH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// The signed-in user, as returned by `GET /users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: i64,
    pub display_name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<FixedOffset>>,
}

/// `POST /auth/login`. On success the session cookie is set on the client.
pub async fn login(rest: &dyn RestClient, credentials: &Credentials) -> RestResult<()> {
    let body = serde_json::to_string(credentials).map_err(|e| RestError::Decode(e.to_string()))?;
    rest.post(LOGIN_PATH, Some(body)).await?;
    info!(email = %credentials.email, "logged in");
    Ok(())
}

pub async fn logout(rest: &dyn RestClient) -> RestResult<()> {
    rest.post(LOGOUT_PATH, None).await?;
    info!("logged out");
    Ok(())
}

pub async fn current_user(rest: &dyn RestClient) -> RestResult<UserInfo> {
    let body = rest.get(USERS_PATH).await?;
    serde_json::from_str(&body).map_err(|e| RestError::Decode(e.to_string()))
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
