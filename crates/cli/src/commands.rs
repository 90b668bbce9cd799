// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use dama_client::{
    ClientConfig, ConnectionManager, InboundMessage, RealtimeClient, SubscribeOptions,
    SubscriptionHandle,
};
use dama_core::{destination, ChatMessageRequest, Headers, MoveRequest};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::{Command, GlobalArgs};
use crate::error::{Error, Result};
use crate::output::{render_error, render_message};

/// How long to listen for a rejection after publishing a chat line or move.
const REJECTION_GRACE: Duration = Duration::from_millis(1500);

/// Environment first, then flags.
pub fn resolve_config(global: &GlobalArgs) -> ClientConfig {
    let mut config = ClientConfig::from_env();
    if let Some(url) = &global.api_url {
        config = config.with_api_base_url(url);
    }
    if let Some(url) = &global.ws_url {
        config = config.with_websocket_url(url);
    }
    config
}

/// `--password` wins over `DAMA_PASSWORD`.
pub fn resolve_password(flag: Option<String>, env: Option<String>) -> Result<String> {
    flag.filter(|p| !p.is_empty())
        .or(env)
        .ok_or(Error::MissingPassword)
}

pub async fn run(global: GlobalArgs, command: Command) -> Result<()> {
    let email = global.email.clone().ok_or(Error::MissingEmail)?;
    let password = resolve_password(global.password.clone(), dama_client::env::password())?;

    let client = RealtimeClient::new(resolve_config(&global))?;
    let user = client.login(&email, &password).await?;
    info!(user = %user.display_name, "signed in");

    let result = match command {
        Command::WatchRoom { room_id } => {
            watch(
                client.manager(),
                &[destination::room(room_id), destination::room_chat(room_id)],
            )
            .await
        }
        Command::WatchGame { game_id } => {
            watch(client.manager(), &[destination::game(game_id)]).await
        }
        Command::Chat { room_id, message } => {
            let request = ChatMessageRequest::new(message.join(" "));
            publish(client.manager(), &destination::chat_send(room_id), &request).await
        }
        Command::Move {
            game_id,
            from_row,
            from_col,
            to_row,
            to_col,
        } => {
            let request = MoveRequest::new((from_row, from_col), (to_row, to_col));
            publish(client.manager(), &destination::game_move(game_id), &request).await
        }
    };

    client.logout().await;
    result
}

/// Prints every message on `destinations` until interrupted.
async fn watch(manager: &ConnectionManager, destinations: &[String]) -> Result<()> {
    let mut handles = Vec::with_capacity(destinations.len() + 1);
    for dest in destinations {
        handles.push(subscribe(manager, dest, |message| {
            println!("{}", render_message(message));
        })?);
    }
    handles.push(subscribe(manager, destination::USER_ERRORS, |message| {
        eprintln!("error: {}", render_error(&message.body));
    })?);

    info!(destinations = ?destinations, "watching, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;

    for handle in &handles {
        handle.unsubscribe();
    }
    Ok(())
}

/// Publishes `payload`, then waits briefly for the server to reject it.
async fn publish<T: Serialize>(
    manager: &ConnectionManager,
    dest: &str,
    payload: &T,
) -> Result<()> {
    let (tx, mut rejections) = mpsc::unbounded_channel();
    let errors = subscribe(manager, destination::USER_ERRORS, move |message| {
        let _ = tx.send(render_error(&message.body));
    })?;

    manager.publish_json(dest, payload)?;

    let outcome = match tokio::time::timeout(REJECTION_GRACE, rejections.recv()).await {
        Ok(Some(reason)) => Err(Error::Rejected(reason)),
        _ => Ok(()),
    };
    errors.unsubscribe();
    outcome
}

fn subscribe<F>(manager: &ConnectionManager, dest: &str, callback: F) -> Result<SubscriptionHandle>
where
    F: Fn(&InboundMessage) + Send + Sync + 'static,
{
    manager
        .subscribe(dest, callback, Headers::new(), SubscribeOptions::default())
        .ok_or_else(|| {
            warn!(destination = dest, "subscription refused");
            Error::Subscribe(dest.to_string())
        })
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
