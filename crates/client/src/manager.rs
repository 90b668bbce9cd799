// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection manager for the realtime session.
//!
//! Owns the single STOMP session shared by every screen of the client:
//! - connects on demand, with concurrent callers sharing one attempt
//! - tags every transport event with the attempt that produced it and
//!   discards events from superseded attempts
//! - keeps a subscription table that is replayed after every reconnect
//! - queues outbound messages while the session is down
//! - rebuilds the session (debounced) whenever the access token is refreshed
//!
//! State lives behind one `std::sync::Mutex` that is never held across an
//! `.await`. Subscription callbacks run outside the lock.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use dama_core::Headers;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::notify::{call_isolated, ListenerHandle, RefreshNotifier};
use crate::queue::{OutboundQueue, PendingMessage};
use crate::rest::{fetch_ws_token, RestClient};
use crate::subscriptions::{MessageCallback, SubscriptionTable};
use crate::task::ScheduledTask;
use crate::transport::{InboundMessage, OpenRequest, SessionHandle, Transport, TransportEvent};

/// Lifecycle of the realtime connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Why a connect attempt did not produce a session.
///
/// Cloned to every caller sharing the attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("could not obtain a websocket token: {0}")]
    Credential(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("no answer from the broker within {0:?}")]
    Timeout(Duration),

    #[error("connect attempt superseded by a newer one")]
    Superseded,

    #[error("connect attempt cancelled")]
    Cancelled,
}

pub type ConnectResult = Result<SessionHandle, ConnectError>;

type SharedConnect = Shared<BoxFuture<'static, ConnectResult>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Replace an existing subscription to the same destination instead of
    /// refusing.
    pub replace: bool,
}

impl SubscribeOptions {
    pub fn replace() -> Self {
        SubscribeOptions { replace: true }
    }
}

struct ActiveSession {
    attempt: u64,
    handle: SessionHandle,
}

struct PendingConnect {
    attempt: u64,
    future: SharedConnect,
    settle: oneshot::Sender<ConnectResult>,
}

struct State {
    status: ConnectionStatus,
    attempt_id: u64,
    /// Set by `connect`, cleared by `disconnect`. Refresh-driven reconnects
    /// only run while set.
    wanted: bool,
    /// Bumped by every `disconnect`.
    disconnects: u64,
    session: Option<ActiveSession>,
    pending: Option<PendingConnect>,
    subscriptions: SubscriptionTable,
    queue: OutboundQueue,
    reconnect: Option<ScheduledTask>,
    refresh_listener: Option<ListenerHandle>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    rest: Arc<dyn RestClient>,
    config: ClientConfig,
    state: Mutex<State>,
    status_tx: watch::Sender<ConnectionStatus>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = state.session.take() {
            session.handle.deactivate();
        }
    }
}

/// Manages the realtime session.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<Inner>,
}

impl ConnectionManager {
    /// `rest` is used for `POST /auth/ws-token`; pass a refreshing client so
    /// an expired session is renewed transparently.
    pub fn new(
        transport: Arc<dyn Transport>,
        rest: Arc<dyn RestClient>,
        config: ClientConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::Disconnected);
        let queue = OutboundQueue::new(config.queue_capacity, config.max_send_retries);
        ConnectionManager {
            inner: Arc::new(Inner {
                transport,
                rest,
                config,
                state: Mutex::new(State {
                    status: ConnectionStatus::Disconnected,
                    attempt_id: 0,
                    wanted: false,
                    disconnects: 0,
                    session: None,
                    pending: None,
                    subscriptions: SubscriptionTable::default(),
                    queue,
                    reconnect: None,
                    refresh_listener: None,
                }),
                status_tx,
            }),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.lock().status
    }

    /// Receiver that observes every status transition.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    pub fn queued_messages(&self) -> usize {
        self.lock().queue.len()
    }

    /// Subscribed destinations in registration order.
    pub fn subscriptions(&self) -> Vec<String> {
        self.lock().subscriptions.destinations()
    }

    /// Connects, or joins the connect already in flight.
    ///
    /// Every concurrent caller observes the same outcome. When already
    /// connected, returns the current session.
    pub async fn connect(&self) -> ConnectResult {
        let future = {
            let mut state = self.lock();
            state.wanted = true;
            if let Some(pending) = &state.pending {
                pending.future.clone()
            } else if let (ConnectionStatus::Connected, Some(active)) =
                (state.status, &state.session)
            {
                return Ok(Arc::clone(&active.handle));
            } else {
                self.begin_attempt(&mut state)
            }
        };
        future.await
    }

    fn begin_attempt(&self, state: &mut State) -> SharedConnect {
        state.attempt_id += 1;
        let attempt = state.attempt_id;

        if let Some(previous) = state.session.take() {
            debug!(attempt = previous.attempt, "deactivating previous session");
            previous.handle.deactivate();
        }
        state.subscriptions.clear_live_ids();
        self.set_status(state, ConnectionStatus::Connecting);

        let (settle, outcome) = oneshot::channel();
        let future = async move {
            match outcome.await {
                Ok(result) => result,
                Err(_) => Err(ConnectError::Cancelled),
            }
        }
        .boxed()
        .shared();
        state.pending = Some(PendingConnect {
            attempt,
            future: future.clone(),
            settle,
        });

        debug!(attempt, "connect attempt started");
        tokio::spawn(run_attempt(Arc::downgrade(&self.inner), attempt));
        future
    }

    /// Tears the session down and forgets every subscription.
    ///
    /// Cancels a pending refresh-driven reconnect and any in-flight connect.
    /// Queued outbound messages are kept.
    pub fn disconnect(&self) {
        let (reconnect, entries, session, pending) = {
            let mut state = self.lock();
            state.wanted = false;
            state.disconnects += 1;
            state.attempt_id += 1;
            let pending = state.pending.take();
            self.set_status(&mut state, ConnectionStatus::Disconnected);
            (
                state.reconnect.take(),
                state.subscriptions.drain(),
                state.session.take(),
                pending,
            )
        };
        drop(reconnect);

        if let Some(session) = session {
            for id in entries.iter().filter_map(|e| e.live_id.as_deref()) {
                if let Err(e) = session.handle.unsubscribe(id) {
                    debug!(id, error = %e, "unsubscribe during disconnect failed");
                }
            }
            session.handle.deactivate();
        }
        if let Some(pending) = pending {
            let _ = pending.settle.send(Err(ConnectError::Cancelled));
        }
        info!("realtime connection closed");
    }

    /// Registers `callback` for messages on `destination`.
    ///
    /// Returns `None` (and logs a warning) when not connected, when the
    /// destination is already subscribed and `options.replace` is unset, or
    /// when the session rejects the subscription.
    pub fn subscribe<F>(
        &self,
        destination: &str,
        callback: F,
        headers: Headers,
        options: SubscribeOptions,
    ) -> Option<SubscriptionHandle>
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let session = match (state.status, &state.session) {
            (ConnectionStatus::Connected, Some(active)) => Arc::clone(&active.handle),
            _ => {
                warn!(destination, "cannot subscribe while not connected");
                return None;
            }
        };

        let replaced = match state.subscriptions.get(destination) {
            Some(_) if !options.replace => {
                warn!(destination, "already subscribed");
                return None;
            }
            Some(existing) => existing.live_id.clone(),
            None => None,
        };

        // The old registration stays live until its replacement is in place.
        let live_id = match session.subscribe(destination, &headers) {
            Ok(id) => id,
            Err(e) => {
                warn!(destination, error = %e, "subscribe failed");
                return None;
            }
        };
        if let Some(id) = replaced {
            if let Err(e) = session.unsubscribe(&id) {
                warn!(destination, error = %e, "failed to drop replaced subscription");
            }
        }
        let callback: MessageCallback = Arc::new(callback);
        let registration = state
            .subscriptions
            .insert(destination, callback, headers, Some(live_id));
        debug!(destination, "subscribed");

        Some(SubscriptionHandle {
            destination: destination.to_string(),
            registration,
            manager: Arc::downgrade(&self.inner),
            active: AtomicBool::new(true),
        })
    }

    /// Removes the subscription to `destination`, if any.
    pub fn unsubscribe(&self, destination: &str) {
        let (entry, session) = {
            let mut state = self.lock();
            let session = state.session.as_ref().map(|s| Arc::clone(&s.handle));
            (state.subscriptions.remove(destination), session)
        };
        if let Some(entry) = entry {
            release(entry.live_id.as_deref(), session, destination);
        }
    }

    fn remove_registration(&self, destination: &str, registration: u64) {
        let (entry, session) = {
            let mut state = self.lock();
            let session = state.session.as_ref().map(|s| Arc::clone(&s.handle));
            let entry = state
                .subscriptions
                .remove_registration(destination, registration);
            (entry, session)
        };
        if let Some(entry) = entry {
            release(entry.live_id.as_deref(), session, destination);
        }
    }

    /// Publishes `body` to `destination`, or queues it until the session is
    /// connected. Never fails; problems are logged.
    pub fn send_message(&self, destination: &str, body: impl Into<String>, headers: Headers) {
        let body = body.into();
        let mut state = self.lock();

        if let (ConnectionStatus::Connected, Some(active)) = (state.status, &state.session) {
            match active.handle.publish(destination, &body, &headers) {
                Ok(()) => {
                    trace!(destination, "message sent");
                    return;
                }
                Err(e) => warn!(destination, error = %e, "publish failed, queueing message"),
            }
        } else {
            warn!(destination, status = %state.status, "not connected, queueing message");
        }

        state
            .queue
            .push(PendingMessage::new(destination, body, headers));
    }

    /// Serializes `payload` and sends it with a JSON content type.
    pub fn publish_json<T: Serialize>(
        &self,
        destination: &str,
        payload: &T,
    ) -> dama_core::Result<()> {
        let body = dama_core::payload::to_json(payload)?;
        let mut headers = Headers::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        self.send_message(destination, body, headers);
        Ok(())
    }

    /// Gracefully shuts the current session down and waits for it to
    /// confirm, at most the configured deactivate timeout.
    ///
    /// Subscriptions are kept for the next connect.
    pub async fn deactivate(&self) {
        let (session, attempt, mut status_rx) = {
            let mut state = self.lock();
            if state.status == ConnectionStatus::Disconnected {
                // Already down; nothing will confirm.
                if let Some(stale) = state.session.take() {
                    stale.handle.deactivate();
                }
                return;
            }
            let Some(active) = &state.session else {
                return;
            };
            (
                Arc::clone(&active.handle),
                active.attempt,
                self.inner.status_tx.subscribe(),
            )
        };

        session.deactivate();
        let timeout = self.inner.config.deactivate_timeout;
        let confirmed = tokio::time::timeout(
            timeout,
            status_rx.wait_for(|s| *s == ConnectionStatus::Disconnected),
        )
        .await
        .is_ok();
        if !confirmed {
            warn!(?timeout, "session did not confirm shutdown, continuing");
        }

        let pending = {
            let mut state = self.lock();
            if state.session.as_ref().is_some_and(|s| s.attempt == attempt) {
                state.session = None;
                state.attempt_id += 1;
                state.subscriptions.clear_live_ids();
                self.set_status(&mut state, ConnectionStatus::Disconnected);
                state.pending.take()
            } else {
                None
            }
        };
        if let Some(pending) = pending {
            let _ = pending.settle.send(Err(ConnectError::Superseded));
        }
    }

    /// Deactivates the current session, then connects again.
    pub async fn reconnect(&self) -> ConnectResult {
        self.deactivate().await;
        self.connect().await
    }

    /// Graceful counterpart of [`disconnect`](Self::disconnect): lets the
    /// session flush what it was sending before tearing everything down.
    pub async fn close(&self) {
        self.deactivate().await;
        self.disconnect();
    }

    /// Schedules a reconnect after the debounce period, replacing any
    /// reconnect still waiting.
    pub fn schedule_reconnect(&self) {
        let weak = Arc::downgrade(&self.inner);
        let task = ScheduledTask::after(self.inner.config.reconnect_debounce, async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let manager = ConnectionManager { inner };
            let generation = {
                let state = manager.lock();
                if !state.wanted {
                    debug!("not connected by the application, skipping reconnect");
                    return;
                }
                state.disconnects
            };
            info!("reconnecting with refreshed credentials");
            manager.deactivate().await;
            if !manager.still_wanted(generation) {
                debug!("disconnected while reconnecting, not connecting again");
                return;
            }
            if let Err(e) = manager.connect().await {
                warn!(error = %e, "reconnect after token refresh failed");
            }
        });

        let previous = self.lock().reconnect.replace(task);
        if previous.is_some() {
            debug!("reconnect already scheduled, restarting debounce");
        }
        drop(previous);
    }

    /// Rebuilds the session (debounced) each time `notifier` emits.
    pub fn attach_refresh(&self, notifier: &RefreshNotifier) {
        let weak = Arc::downgrade(&self.inner);
        let handle = notifier.subscribe(move || {
            if let Some(inner) = weak.upgrade() {
                ConnectionManager { inner }.schedule_reconnect();
            }
        });
        let previous = self.lock().refresh_listener.replace(handle);
        if let Some(previous) = previous {
            previous.unsubscribe();
        }
    }

    pub fn detach_refresh(&self) {
        let handle = self.lock().refresh_listener.take();
        if let Some(handle) = handle {
            handle.unsubscribe();
        }
    }

    /// Detaches from token refreshes and disconnects.
    pub fn dispose(&self) {
        self.detach_refresh();
        self.disconnect();
    }

    /// True while no `disconnect` has happened since `generation` was read.
    fn still_wanted(&self, generation: u64) -> bool {
        let state = self.lock();
        state.wanted && state.disconnects == generation
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(&self, state: &mut State, status: ConnectionStatus) {
        if state.status != status {
            debug!(from = %state.status, to = %status, "connection status changed");
        }
        state.status = status;
        self.inner.status_tx.send_replace(status);
    }

    fn open_session(
        &self,
        attempt: u64,
        token: String,
    ) -> Option<(SessionHandle, mpsc::UnboundedReceiver<TransportEvent>)> {
        if self.lock().attempt_id != attempt {
            debug!(attempt, "attempt superseded before opening the socket");
            return None;
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut connect_headers = Headers::new();
        connect_headers.insert("Authorization".to_string(), format!("Bearer {}", token));
        let request = OpenRequest {
            url: self.inner.config.websocket_url.clone(),
            connect_headers,
            heartbeat: self.inner.config.heartbeat,
            events: events_tx,
        };

        let session = match self.inner.transport.open(request) {
            Ok(session) => session,
            Err(e) => {
                self.fail_attempt(attempt, ConnectError::Transport(e.to_string()));
                return None;
            }
        };

        let installed = {
            let mut state = self.lock();
            if state.attempt_id == attempt {
                state.session = Some(ActiveSession {
                    attempt,
                    handle: Arc::clone(&session),
                });
                true
            } else {
                false
            }
        };
        if !installed {
            session.deactivate();
            return None;
        }
        Some((session, events_rx))
    }

    /// Handles CONNECTED. Returns `false` if the attempt is stale.
    fn on_ready(&self, attempt: u64, session: &SessionHandle) -> bool {
        let mut state = self.lock();
        if state.attempt_id != attempt {
            drop(state);
            debug!(attempt, "ready from superseded attempt, deactivating it");
            session.deactivate();
            return false;
        }
        if state.status == ConnectionStatus::Connected {
            return true;
        }

        self.set_status(&mut state, ConnectionStatus::Connected);
        let restored = state.subscriptions.resubscribe_all(session.as_ref());
        let report = state
            .queue
            .flush(|m| session.publish(&m.destination, &m.body, &m.headers));
        let pending = take_pending(&mut state, attempt);
        drop(state);

        info!(
            attempt,
            restored,
            flushed = report.sent,
            requeued = report.requeued,
            "realtime connection established"
        );
        if let Some(settle) = pending {
            let _ = settle.send(Ok(Arc::clone(session)));
        }
        true
    }

    fn on_error(&self, attempt: u64, detail: String) {
        let pending = {
            let mut state = self.lock();
            if state.attempt_id != attempt {
                debug!(attempt, error = %detail, "error from superseded attempt ignored");
                return;
            }
            self.set_status(&mut state, ConnectionStatus::Disconnected);
            take_pending(&mut state, attempt)
        };
        warn!(attempt, error = %detail, "realtime connection error");
        if let Some(settle) = pending {
            let _ = settle.send(Err(ConnectError::Transport(detail)));
        }
    }

    fn on_closed(&self, attempt: u64) {
        let pending = {
            let mut state = self.lock();
            if state.attempt_id != attempt {
                return;
            }
            if state.session.as_ref().is_some_and(|s| s.attempt == attempt) {
                state.session = None;
            }
            state.subscriptions.clear_live_ids();
            self.set_status(&mut state, ConnectionStatus::Disconnected);
            take_pending(&mut state, attempt)
        };
        info!(attempt, "realtime connection lost");
        if let Some(settle) = pending {
            let _ = settle.send(Err(ConnectError::Transport(
                "connection closed before the broker accepted it".to_string(),
            )));
        }
    }

    fn on_timeout(&self, attempt: u64, session: Option<&SessionHandle>) {
        let pending = {
            let mut state = self.lock();
            if state.attempt_id != attempt {
                return;
            }
            if state.session.as_ref().is_some_and(|s| s.attempt == attempt) {
                state.session = None;
            }
            self.set_status(&mut state, ConnectionStatus::Disconnected);
            take_pending(&mut state, attempt)
        };
        if let Some(session) = session {
            session.deactivate();
        }
        let timeout = self.inner.config.connect_timeout;
        warn!(attempt, ?timeout, "connect attempt timed out");
        if let Some(settle) = pending {
            let _ = settle.send(Err(ConnectError::Timeout(timeout)));
        }
    }

    fn fail_attempt(&self, attempt: u64, error: ConnectError) {
        let pending = {
            let mut state = self.lock();
            if state.attempt_id != attempt {
                return;
            }
            self.set_status(&mut state, ConnectionStatus::Disconnected);
            take_pending(&mut state, attempt)
        };
        warn!(attempt, error = %error, "connect attempt failed");
        if let Some(settle) = pending {
            let _ = settle.send(Err(error));
        }
    }

    fn dispatch(&self, attempt: u64, message: InboundMessage) {
        let callback = {
            let state = self.lock();
            if state.attempt_id != attempt {
                return;
            }
            state.subscriptions.callback_for(&message.subscription)
        };
        match callback {
            Some(callback) => {
                call_isolated("subscription callback", || callback(&message));
            }
            None => debug!(
                subscription = %message.subscription,
                destination = %message.destination,
                "no handler for message"
            ),
        }
    }
}

/// Drives one connect attempt and then its session's events.
async fn run_attempt(weak: Weak<Inner>, attempt: u64) {
    let Some(manager) = upgrade(&weak) else {
        return;
    };
    let deadline = Instant::now() + manager.inner.config.connect_timeout;

    let token =
        match tokio::time::timeout_at(deadline, fetch_ws_token(manager.inner.rest.as_ref())).await
        {
            Ok(Ok(token)) => token,
            Ok(Err(e)) => {
                manager.fail_attempt(attempt, ConnectError::Credential(e.to_string()));
                return;
            }
            Err(_) => {
                manager.on_timeout(attempt, None);
                return;
            }
        };

    let Some((session, mut events)) = manager.open_session(attempt, token) else {
        return;
    };
    drop(manager);

    // Until the handshake settles, the deadline applies.
    let mut settled = false;
    loop {
        let event = if settled {
            events.recv().await
        } else {
            match tokio::time::timeout_at(deadline, events.recv()).await {
                Ok(event) => event,
                Err(_) => {
                    match upgrade(&weak) {
                        Some(manager) => manager.on_timeout(attempt, Some(&session)),
                        None => session.deactivate(),
                    }
                    return;
                }
            }
        };

        let Some(manager) = upgrade(&weak) else {
            session.deactivate();
            return;
        };
        match event {
            Some(TransportEvent::Ready) => {
                if !manager.on_ready(attempt, &session) {
                    return;
                }
                settled = true;
            }
            Some(TransportEvent::Error(detail)) => {
                manager.on_error(attempt, detail);
                settled = true;
            }
            Some(TransportEvent::Message(message)) => manager.dispatch(attempt, message),
            Some(TransportEvent::Closed) | None => {
                manager.on_closed(attempt);
                return;
            }
        }
    }
}

fn upgrade(weak: &Weak<Inner>) -> Option<ConnectionManager> {
    weak.upgrade().map(|inner| ConnectionManager { inner })
}

fn take_pending(state: &mut State, attempt: u64) -> Option<oneshot::Sender<ConnectResult>> {
    if state.pending.as_ref().is_some_and(|p| p.attempt == attempt) {
        state.pending.take().map(|p| p.settle)
    } else {
        None
    }
}

fn release(live_id: Option<&str>, session: Option<SessionHandle>, destination: &str) {
    if let (Some(id), Some(session)) = (live_id, session) {
        if let Err(e) = session.unsubscribe(id) {
            warn!(destination, error = %e, "unsubscribe failed");
        }
    }
    debug!(destination, "unsubscribed");
}

/// Registration returned by [`ConnectionManager::subscribe`].
///
/// Dropping the handle keeps the subscription; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
pub struct SubscriptionHandle {
    destination: String,
    registration: u64,
    manager: Weak<Inner>,
    active: AtomicBool,
}

impl SubscriptionHandle {
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Removes this registration. Idempotent, and a no-op if the
    /// destination has since been re-subscribed with a replacement.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(manager) = upgrade(&self.manager) {
            manager.remove_registration(&self.destination, self.registration);
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
