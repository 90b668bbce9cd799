// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! STOMP 1.2 over WebSocket.
//!
//! Each [`StompTransport::open`] spawns one connection task that owns the
//! socket. The returned session talks to the task through an unbounded
//! channel, so frames leave in the order they were submitted and a
//! deactivation is processed after every frame queued before it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dama_core::{Command, Frame, Headers, HeartBeat};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;

use crate::transport::{
    InboundMessage, OpenRequest, Session, SessionHandle, SubscriptionId, Transport,
    TransportError, TransportEvent, TransportResult,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production [`Transport`] backed by tokio-tungstenite.
#[derive(Debug, Clone, Default)]
pub struct StompTransport;

impl StompTransport {
    pub fn new() -> Self {
        StompTransport
    }
}

impl Transport for StompTransport {
    fn open(&self, request: OpenRequest) -> TransportResult<SessionHandle> {
        let host = host_header(&request.url)?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            connected: AtomicBool::new(false),
            next_subscription: AtomicU64::new(0),
            outbound: outbound_tx,
            shutdown: CancellationToken::new(),
        });

        tokio::spawn(run_connection(request, host, Arc::clone(&shared), outbound_rx));
        Ok(Arc::new(StompSession { shared }))
    }
}

enum Outbound {
    Frame(Frame),
    Shutdown,
}

struct Shared {
    connected: AtomicBool,
    next_subscription: AtomicU64,
    outbound: mpsc::UnboundedSender<Outbound>,
    /// Observed only while the handshake is in progress.
    shutdown: CancellationToken,
}

struct StompSession {
    shared: Arc<Shared>,
}

impl StompSession {
    fn send(&self, frame: Frame) -> TransportResult<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.shared
            .outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| TransportError::ConnectionClosed)
    }
}

impl Session for StompSession {
    fn subscribe(&self, destination: &str, headers: &Headers) -> TransportResult<SubscriptionId> {
        let n = self.shared.next_subscription.fetch_add(1, Ordering::Relaxed);
        let id = format!("sub-{}", n);
        self.send(
            Frame::new(Command::Subscribe)
                .header("id", id.as_str())
                .header("destination", destination)
                .header("ack", "auto")
                .with_headers(headers),
        )?;
        Ok(id)
    }

    fn unsubscribe(&self, id: &str) -> TransportResult<()> {
        self.send(Frame::new(Command::Unsubscribe).header("id", id))
    }

    fn publish(&self, destination: &str, body: &str, headers: &Headers) -> TransportResult<()> {
        self.send(
            Frame::new(Command::Send)
                .header("destination", destination)
                .with_headers(headers)
                .body(body),
        )
    }

    fn deactivate(&self) {
        self.shared.shutdown.cancel();
        let _ = self.shared.outbound.send(Outbound::Shutdown);
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }
}

async fn run_connection(
    request: OpenRequest,
    host: String,
    shared: Arc<Shared>,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) {
    let events = request.events.clone();

    let outcome = tokio::select! {
        _ = shared.shutdown.cancelled() => None,
        result = handshake(&request, &host) => Some(result),
    };

    let (ws, heartbeat) = match outcome {
        Some(Ok(established)) => established,
        Some(Err(detail)) => {
            warn!(url = %request.url, error = %detail, "stomp handshake failed");
            let _ = events.send(TransportEvent::Error(detail));
            let _ = events.send(TransportEvent::Closed);
            return;
        }
        None => {
            debug!(url = %request.url, "session deactivated during handshake");
            let _ = events.send(TransportEvent::Closed);
            return;
        }
    };

    debug!(url = %request.url, %heartbeat, "stomp session connected");
    shared.connected.store(true, Ordering::Release);
    let _ = events.send(TransportEvent::Ready);

    let result = pump(ws, heartbeat, &events, &mut outbound).await;
    shared.connected.store(false, Ordering::Release);

    if let Err(detail) = result {
        warn!(error = %detail, "stomp session lost");
        let _ = events.send(TransportEvent::Error(detail));
    }
    let _ = events.send(TransportEvent::Closed);
}

/// Opens the socket, sends CONNECT and waits for CONNECTED.
///
/// Returns the negotiated heart-beat intervals.
async fn handshake(request: &OpenRequest, host: &str) -> Result<(WsStream, HeartBeat), String> {
    let (mut ws, _) = tokio_tungstenite::connect_async(request.url.as_str())
        .await
        .map_err(|e| format!("websocket connect failed: {}", e))?;

    let connect = Frame::new(Command::Connect)
        .header("accept-version", "1.2")
        .header("host", host)
        .header("heart-beat", request.heartbeat.to_string())
        .with_headers(&request.connect_headers);
    ws.send(Message::Text(connect.encode().into()))
        .await
        .map_err(|e| format!("send failed: {}", e))?;

    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => match Frame::parse(text.as_str()) {
                Ok(None) => continue,
                Ok(Some(frame)) => match frame.command {
                    Command::Connected => {
                        let server = match frame.get("heart-beat") {
                            Some(raw) => raw.parse::<HeartBeat>().map_err(|e| e.to_string())?,
                            None => HeartBeat::disabled(),
                        };
                        return Ok((ws, request.heartbeat.negotiate(&server)));
                    }
                    Command::Error => return Err(error_detail(&frame)),
                    other => debug!(command = %other, "ignoring frame before CONNECTED"),
                },
                Err(e) => return Err(format!("malformed frame: {}", e)),
            },
            Some(Ok(Message::Close(_))) | None => {
                return Err("connection closed during handshake".to_string())
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(format!("receive failed: {}", e)),
        }
    }
}

/// Runs the established session until it is deactivated or lost.
///
/// `Ok` means an orderly close from either side.
async fn pump(
    ws: WsStream,
    heartbeat: HeartBeat,
    events: &mpsc::UnboundedSender<TransportEvent>,
    outbound: &mut mpsc::UnboundedReceiver<Outbound>,
) -> Result<(), String> {
    let (mut sink, mut stream) = ws.split();
    let mut beat = heartbeat
        .outgoing()
        .map(|period| tokio::time::interval_at(Instant::now() + period, period));
    // Tolerate one late heart-beat before declaring the peer gone.
    let silence_limit = heartbeat.incoming().map(|period| period * 2);
    let mut last_inbound = Instant::now();

    loop {
        let deadline = silence_limit.map(|limit| last_inbound + limit);
        tokio::select! {
            command = outbound.recv() => match command {
                Some(Outbound::Frame(frame)) => {
                    trace!(command = %frame.command, "sending frame");
                    sink.send(Message::Text(frame.encode().into()))
                        .await
                        .map_err(|e| format!("send failed: {}", e))?;
                }
                Some(Outbound::Shutdown) | None => {
                    let disconnect = Frame::new(Command::Disconnect).header("receipt", "disconnect");
                    let _ = sink.send(Message::Text(disconnect.encode().into())).await;
                    let _ = sink.close().await;
                    debug!("stomp session closed");
                    return Ok(());
                }
            },
            message = stream.next() => {
                last_inbound = Instant::now();
                match message {
                    Some(Ok(Message::Text(text))) => match Frame::parse(text.as_str()) {
                        Ok(None) => trace!("heart-beat received"),
                        Ok(Some(frame)) => handle_frame(frame, events)?,
                        Err(e) => warn!(error = %e, "dropping malformed frame"),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("server closed the connection");
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(format!("receive failed: {}", e)),
                }
            },
            _ = next_beat(&mut beat) => {
                sink.send(Message::Text("\n".into()))
                    .await
                    .map_err(|e| format!("send failed: {}", e))?;
            },
            _ = expire(deadline) => {
                return Err(format!(
                    "no heart-beat from server for {}ms",
                    silence_limit.unwrap_or(Duration::ZERO).as_millis()
                ));
            },
        }
    }
}

fn handle_frame(
    frame: Frame,
    events: &mpsc::UnboundedSender<TransportEvent>,
) -> Result<(), String> {
    match frame.command {
        Command::Message => match InboundMessage::from_frame(&frame) {
            Some(message) => {
                let _ = events.send(TransportEvent::Message(message));
            }
            None => warn!("dropping MESSAGE without subscription header"),
        },
        // The broker closes the connection after an ERROR frame.
        Command::Error => return Err(error_detail(&frame)),
        Command::Receipt => debug!(receipt = frame.get("receipt-id"), "receipt"),
        other => debug!(command = %other, "ignoring unexpected frame"),
    }
    Ok(())
}

async fn next_beat(beat: &mut Option<Interval>) {
    match beat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Detail carried by an ERROR frame: its `message` header, else its body.
pub(crate) fn error_detail(frame: &Frame) -> String {
    match frame.get("message") {
        Some(message) if !message.is_empty() => message.to_string(),
        _ if !frame.body.trim().is_empty() => frame.body.trim().to_string(),
        _ => "broker reported an error".to_string(),
    }
}

/// Value for the CONNECT `host` header: the URL's host name.
///
/// Rejects anything that is not a `ws://` or `wss://` URL with a host.
pub(crate) fn host_header(raw: &str) -> TransportResult<String> {
    let url = Url::parse(raw)
        .map_err(|e| TransportError::ConnectionFailed(format!("invalid url {}: {}", raw, e)))?;
    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(TransportError::ConnectionFailed(format!(
                "unsupported scheme {}: {}",
                other, raw
            )))
        }
    }
    url.host_str()
        .map(str::to_string)
        .ok_or_else(|| TransportError::ConnectionFailed(format!("url has no host: {}", raw)))
}

#[cfg(test)]
#[path = "stomp_tests.rs"]
mod tests;
