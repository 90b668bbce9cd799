// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test doubles for the client's unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dama_core::Headers;
use tokio::sync::mpsc;

use crate::rest::{Method, RestClient, RestError, RestFuture, RestResult, WS_TOKEN_PATH};
use crate::transport::{
    InboundMessage, OpenRequest, Session, SessionHandle, SubscriptionId, Transport,
    TransportError, TransportEvent, TransportResult,
};

/// A scripted REST response.
#[derive(Debug, Clone)]
pub enum Reply {
    Ok(String),
    Unauthorized,
    Status(u16, String),
}

impl Reply {
    fn into_result(self) -> RestResult<String> {
        match self {
            Reply::Ok(body) => Ok(body),
            Reply::Unauthorized => Err(RestError::Unauthorized),
            Reply::Status(status, message) => Err(RestError::Status { status, message }),
        }
    }
}

#[derive(Default)]
struct MockRestState {
    scripted: HashMap<String, VecDeque<Reply>>,
    latency: HashMap<String, Duration>,
    calls: Vec<(Method, String, Option<String>)>,
    tokens_issued: u64,
}

/// In-memory [`RestClient`].
///
/// Unscripted `POST /auth/ws-token` calls return `token-1`, `token-2`, ...;
/// any other unscripted call returns an empty body.
#[derive(Clone, Default)]
pub struct MockRest {
    state: Arc<Mutex<MockRestState>>,
}

impl MockRest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for the next call to `path`.
    pub fn respond(&self, path: &str, reply: Reply) {
        let mut state = self.state.lock().unwrap();
        state
            .scripted
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Delay every call to `path` by `latency`.
    pub fn set_latency(&self, path: &str, latency: Duration) {
        self.state
            .lock()
            .unwrap()
            .latency
            .insert(path.to_string(), latency);
    }

    pub fn calls(&self, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(_, p, _)| p == path)
            .count()
    }

    pub fn bodies(&self, path: &str) -> Vec<Option<String>> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(_, p, _)| p == path)
            .map(|(_, _, b)| b.clone())
            .collect()
    }
}

impl RestClient for MockRest {
    fn request<'a>(
        &'a self,
        method: Method,
        path: &'a str,
        body: Option<String>,
    ) -> RestFuture<'a, String> {
        let (reply, latency) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((method, path.to_string(), body));
            let scripted = state
                .scripted
                .get_mut(path)
                .and_then(VecDeque::pop_front);
            let reply = match scripted {
                Some(reply) => reply,
                None if path == WS_TOKEN_PATH => {
                    state.tokens_issued += 1;
                    Reply::Ok(format!("{{\"token\":\"token-{}\"}}", state.tokens_issued))
                }
                None => Reply::Ok(String::new()),
            };
            (reply, state.latency.get(path).copied())
        };

        Box::pin(async move {
            if let Some(latency) = latency {
                tokio::time::sleep(latency).await;
            }
            reply.into_result()
        })
    }
}

/// Lets every spawned task run until it blocks.
///
/// Only meaningful on a paused clock, where time advances only once all
/// tasks are idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[derive(Default)]
struct MockSessionState {
    connected: bool,
    next_id: u64,
    /// (live id, destination) currently registered.
    live: Vec<(String, String)>,
    subscribe_calls: Vec<String>,
    unsubscribed: Vec<String>,
    published: Vec<(String, String, Headers)>,
    fail_publish: bool,
    fail_subscribe: HashSet<String>,
    deactivations: usize,
}

/// Recording [`Session`].
///
/// Deactivation reports `Closed` on the session's event channel unless
/// confirmation is turned off.
pub struct MockSession {
    state: Mutex<MockSessionState>,
    events: mpsc::UnboundedSender<TransportEvent>,
    confirm_deactivate: AtomicBool,
}

impl MockSession {
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        MockSession {
            state: Mutex::new(MockSessionState::default()),
            events,
            confirm_deactivate: AtomicBool::new(true),
        }
    }

    /// A connected session whose events go nowhere.
    pub fn detached() -> Arc<Self> {
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = Arc::new(MockSession::new(tx));
        session.set_connected(true);
        session
    }

    pub fn set_connected(&self, connected: bool) {
        self.state.lock().unwrap().connected = connected;
    }

    pub fn live_destinations(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.live.iter().map(|(_, d)| d.clone()).collect()
    }

    pub fn live_id(&self, destination: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .live
            .iter()
            .find(|(_, d)| d == destination)
            .map(|(id, _)| id.clone())
    }

    pub fn subscribe_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().subscribe_calls.clone()
    }

    pub fn unsubscribed(&self) -> Vec<String> {
        self.state.lock().unwrap().unsubscribed.clone()
    }

    /// (destination, body) of every successful publish.
    pub fn published(&self) -> Vec<(String, String)> {
        let state = self.state.lock().unwrap();
        state
            .published
            .iter()
            .map(|(d, b, _)| (d.clone(), b.clone()))
            .collect()
    }

    pub fn published_headers(&self) -> Vec<Headers> {
        let state = self.state.lock().unwrap();
        state.published.iter().map(|(_, _, h)| h.clone()).collect()
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.state.lock().unwrap().fail_publish = fail;
    }

    pub fn fail_subscribe_to(&self, destination: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_subscribe
            .insert(destination.to_string());
    }

    pub fn deactivations(&self) -> usize {
        self.state.lock().unwrap().deactivations
    }

    pub fn set_confirm_deactivate(&self, confirm: bool) {
        self.confirm_deactivate.store(confirm, Ordering::SeqCst);
    }
}

impl Session for MockSession {
    fn subscribe(&self, destination: &str, _headers: &Headers) -> TransportResult<SubscriptionId> {
        let mut state = self.state.lock().unwrap();
        state.subscribe_calls.push(destination.to_string());
        if state.fail_subscribe.contains(destination) {
            return Err(TransportError::SendFailed("mock subscribe failure".into()));
        }
        state.next_id += 1;
        let id = format!("mock-{}", state.next_id);
        state.live.push((id.clone(), destination.to_string()));
        Ok(id)
    }

    fn unsubscribe(&self, id: &str) -> TransportResult<()> {
        let mut state = self.state.lock().unwrap();
        state.unsubscribed.push(id.to_string());
        state.live.retain(|(live, _)| live != id);
        Ok(())
    }

    fn publish(&self, destination: &str, body: &str, headers: &Headers) -> TransportResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_publish {
            return Err(TransportError::SendFailed("mock publish failure".into()));
        }
        state
            .published
            .push((destination.to_string(), body.to_string(), headers.clone()));
        Ok(())
    }

    fn deactivate(&self) {
        {
            let mut state = self.state.lock().unwrap();
            state.deactivations += 1;
            state.connected = false;
        }
        if self.confirm_deactivate.load(Ordering::SeqCst) {
            let _ = self.events.send(TransportEvent::Closed);
        }
    }

    fn is_connected(&self) -> bool {
        self.state.lock().unwrap().connected
    }
}

struct Opened {
    request: OpenRequest,
    session: Arc<MockSession>,
}

#[derive(Default)]
struct MockTransportState {
    opened: Vec<Opened>,
    fail_open: bool,
}

/// [`Transport`] whose sessions are driven by the test.
///
/// Sessions are numbered from 0 in the order they were opened.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockTransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opened.len()
    }

    pub fn session(&self, n: usize) -> Arc<MockSession> {
        Arc::clone(&self.state.lock().unwrap().opened[n].session)
    }

    pub fn connect_headers(&self, n: usize) -> Headers {
        self.state.lock().unwrap().opened[n]
            .request
            .connect_headers
            .clone()
    }

    pub fn request(&self, n: usize) -> OpenRequest {
        self.state.lock().unwrap().opened[n].request.clone()
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.state.lock().unwrap().fail_open = fail;
    }

    fn emit(&self, n: usize, event: TransportEvent) {
        let events = self.state.lock().unwrap().opened[n].request.events.clone();
        let _ = events.send(event);
    }

    /// The broker accepts session `n`.
    pub fn ready(&self, n: usize) {
        self.session(n).set_connected(true);
        self.emit(n, TransportEvent::Ready);
    }

    pub fn error(&self, n: usize, detail: &str) {
        self.emit(n, TransportEvent::Error(detail.to_string()));
    }

    pub fn close(&self, n: usize) {
        self.session(n).set_connected(false);
        self.emit(n, TransportEvent::Closed);
    }

    /// Delivers a MESSAGE to whatever live subscription session `n` has for
    /// `destination`.
    pub fn deliver(&self, n: usize, destination: &str, body: &str) {
        let subscription = self.session(n).live_id(destination).unwrap();
        self.emit(
            n,
            TransportEvent::Message(InboundMessage {
                subscription,
                destination: destination.to_string(),
                headers: Headers::new(),
                body: body.to_string(),
            }),
        );
    }
}

impl Transport for MockTransport {
    fn open(&self, request: OpenRequest) -> TransportResult<SessionHandle> {
        let mut state = self.state.lock().unwrap();
        if state.fail_open {
            return Err(TransportError::ConnectionFailed("mock open failure".into()));
        }
        let session = Arc::new(MockSession::new(request.events.clone()));
        state.opened.push(Opened {
            request,
            session: Arc::clone(&session),
        });
        Ok(session)
    }
}
