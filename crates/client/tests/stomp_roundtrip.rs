// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end tests of the STOMP transport against an in-process broker.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use dama_client::{OpenRequest, StompTransport, Transport, TransportEvent};
use dama_core::{Command, Frame, Headers, HeartBeat};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

type BrokerSocket = WebSocketStream<tokio::net::TcpStream>;

/// Accepts one WebSocket connection and hands it to `script`.
async fn broker<F, Fut>(script: F) -> String
where
    F: FnOnce(BrokerSocket) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        script(ws).await;
    });
    format!("ws://{}/ws/websocket", addr)
}

/// Next non-heart-beat frame from the client.
async fn next_frame(ws: &mut BrokerSocket) -> Option<Frame> {
    while let Some(message) = ws.next().await {
        match message.ok()? {
            Message::Text(text) => {
                if let Some(frame) = Frame::parse(text.as_str()).unwrap() {
                    return Some(frame);
                }
            }
            Message::Close(_) => return None,
            _ => {}
        }
    }
    None
}

async fn send_frame(ws: &mut BrokerSocket, frame: Frame) {
    ws.send(Message::Text(frame.encode().into())).await.unwrap();
}

fn open(url: String, heartbeat: HeartBeat) -> (dama_client::SessionHandle, mpsc::UnboundedReceiver<TransportEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut connect_headers = Headers::new();
    connect_headers.insert("Authorization".into(), "Bearer t0k3n".into());
    let session = StompTransport::new()
        .open(OpenRequest {
            url,
            connect_headers,
            heartbeat,
            events: tx,
        })
        .unwrap();
    (session, rx)
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a transport event")
        .expect("event channel closed")
}

#[tokio::test]
async fn subscribe_receive_publish_and_disconnect() {
    let (seen_tx, mut seen) = mpsc::unbounded_channel::<Frame>();
    let url = broker(move |mut ws| async move {
        let connect = next_frame(&mut ws).await.unwrap();
        seen_tx.send(connect).unwrap();
        send_frame(
            &mut ws,
            Frame::new(Command::Connected)
                .header("version", "1.2")
                .header("heart-beat", "0,0"),
        )
        .await;

        let subscribe = next_frame(&mut ws).await.unwrap();
        let id = subscribe.get("id").unwrap().to_string();
        seen_tx.send(subscribe).unwrap();
        send_frame(
            &mut ws,
            Frame::new(Command::Message)
                .header("subscription", id)
                .header("destination", "/topic/rooms/42")
                .header("message-id", "1")
                .body(r#"{"type":"PLAYER_JOINED"}"#),
        )
        .await;

        while let Some(frame) = next_frame(&mut ws).await {
            let done = frame.command == Command::Disconnect;
            seen_tx.send(frame).unwrap();
            if done {
                break;
            }
        }
    })
    .await;

    let (session, mut events) = open(url, HeartBeat::disabled());
    assert_eq!(next_event(&mut events).await, TransportEvent::Ready);
    assert!(session.is_connected());

    let connect = seen.recv().await.unwrap();
    assert_eq!(connect.command, Command::Connect);
    assert_eq!(connect.get("accept-version"), Some("1.2"));
    assert_eq!(connect.get("host"), Some("127.0.0.1"));
    assert_eq!(connect.get("Authorization"), Some("Bearer t0k3n"));

    let id = session.subscribe("/topic/rooms/42", &Headers::new()).unwrap();
    let subscribe = seen.recv().await.unwrap();
    assert_eq!(subscribe.command, Command::Subscribe);
    assert_eq!(subscribe.get("id"), Some(id.as_str()));
    assert_eq!(subscribe.get("destination"), Some("/topic/rooms/42"));

    match next_event(&mut events).await {
        TransportEvent::Message(message) => {
            assert_eq!(message.subscription, id);
            assert_eq!(message.body, r#"{"type":"PLAYER_JOINED"}"#);
        }
        other => panic!("expected a message, got {:?}", other),
    }

    session
        .publish("/app/room/42/chat/send", r#"{"content":"hi"}"#, &Headers::new())
        .unwrap();
    let send = seen.recv().await.unwrap();
    assert_eq!(send.command, Command::Send);
    assert_eq!(send.get("destination"), Some("/app/room/42/chat/send"));
    assert_eq!(send.body, r#"{"content":"hi"}"#);

    session.deactivate();
    assert_eq!(seen.recv().await.unwrap().command, Command::Disconnect);
    assert_eq!(next_event(&mut events).await, TransportEvent::Closed);
    assert!(!session.is_connected());
}

#[tokio::test]
async fn broker_error_is_reported_then_closed() {
    let url = broker(|mut ws| async move {
        let _connect = next_frame(&mut ws).await;
        send_frame(
            &mut ws,
            Frame::new(Command::Error)
                .header("message", "Invalid token")
                .body("JWT expired"),
        )
        .await;
        let _ = ws.close(None).await;
    })
    .await;

    let (session, mut events) = open(url, HeartBeat::disabled());

    assert_eq!(
        next_event(&mut events).await,
        TransportEvent::Error("Invalid token".into())
    );
    assert_eq!(next_event(&mut events).await, TransportEvent::Closed);
    assert!(session.subscribe("/topic/games/1", &Headers::new()).is_err());
}

#[tokio::test]
async fn silent_broker_is_declared_lost() {
    let url = broker(|mut ws| async move {
        let _connect = next_frame(&mut ws).await;
        send_frame(
            &mut ws,
            Frame::new(Command::Connected)
                .header("version", "1.2")
                .header("heart-beat", "100,0"),
        )
        .await;
        // Promise heart-beats, then never send one.
        tokio::time::sleep(Duration::from_secs(10)).await;
    })
    .await;

    let (_session, mut events) = open(url, HeartBeat::new(0, 100));

    assert_eq!(next_event(&mut events).await, TransportEvent::Ready);
    match next_event(&mut events).await {
        TransportEvent::Error(detail) => assert!(detail.contains("heart-beat")),
        other => panic!("expected a heart-beat error, got {:?}", other),
    }
    assert_eq!(next_event(&mut events).await, TransportEvent::Closed);
}

#[tokio::test]
async fn deactivate_during_handshake_closes_quietly() {
    let url = broker(|mut ws| async move {
        let _connect = next_frame(&mut ws).await;
        // Never answer the CONNECT.
        tokio::time::sleep(Duration::from_secs(10)).await;
    })
    .await;

    let (session, mut events) = open(url, HeartBeat::disabled());
    tokio::time::sleep(Duration::from_millis(50)).await;
    session.deactivate();

    assert_eq!(next_event(&mut events).await, TransportEvent::Closed);
}

#[tokio::test]
async fn unreachable_broker_reports_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (_session, mut events) = open(format!("ws://{}/ws/websocket", addr), HeartBeat::disabled());

    assert!(matches!(
        next_event(&mut events).await,
        TransportEvent::Error(_)
    ));
    assert_eq!(next_event(&mut events).await, TransportEvent::Closed);
}
