// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

fn message(n: usize) -> PendingMessage {
    PendingMessage::new("/app/room/1/chat/send", format!("#{}", n), Headers::new())
}

fn bodies(queue: &OutboundQueue) -> Vec<String> {
    queue.iter().map(|m| m.body.clone()).collect()
}

#[test]
fn keeps_fifo_order() {
    let mut queue = OutboundQueue::default();
    for n in 1..=3 {
        assert!(queue.push(message(n)).is_none());
    }
    assert_eq!(bodies(&queue), ["#1", "#2", "#3"]);
}

#[test]
fn full_queue_evicts_oldest() {
    let mut queue = OutboundQueue::default();
    for n in 1..=500 {
        queue.push(message(n));
    }
    let evicted = queue.push(message(501)).unwrap();

    assert_eq!(evicted.body, "#1");
    assert_eq!(queue.len(), 500);
    let expected: Vec<String> = (2..=501).map(|n| format!("#{}", n)).collect();
    assert_eq!(bodies(&queue), expected);
}

#[test]
fn flush_sends_in_order_and_empties() {
    let mut queue = OutboundQueue::default();
    for n in 1..=3 {
        queue.push(message(n));
    }
    let mut sent = Vec::new();

    let report = queue.flush(|m| {
        sent.push(m.body.clone());
        Ok(())
    });

    assert_eq!(sent, ["#1", "#2", "#3"]);
    assert_eq!(report, FlushReport { sent: 3, requeued: 0, dropped: 0 });
    assert!(queue.is_empty());
}

#[test]
fn failing_message_is_dropped_after_three_flushes() {
    let mut queue = OutboundQueue::default();
    queue.push(message(1));
    let mut attempts = 0;
    let mut fail = |_: &PendingMessage| {
        attempts += 1;
        Err(TransportError::SendFailed("broken pipe".into()))
    };

    let first = queue.flush(&mut fail);
    assert_eq!(first.requeued, 1);
    assert_eq!(queue.iter().next().unwrap().retry_count, 1);

    let second = queue.flush(&mut fail);
    assert_eq!(second.requeued, 1);
    assert_eq!(queue.iter().next().unwrap().retry_count, 2);

    let third = queue.flush(&mut fail);
    assert_eq!(third, FlushReport { sent: 0, requeued: 0, dropped: 1 });
    assert!(queue.is_empty());

    // Never queued a fourth time.
    queue.flush(&mut fail);
    assert_eq!(attempts, 3);
}

#[test]
fn requeued_messages_keep_relative_order() {
    let mut queue = OutboundQueue::default();
    for n in 1..=4 {
        queue.push(message(n));
    }

    let report = queue.flush(|m| {
        if m.body == "#2" || m.body == "#4" {
            Err(TransportError::NotConnected)
        } else {
            Ok(())
        }
    });

    assert_eq!(report, FlushReport { sent: 2, requeued: 2, dropped: 0 });
    assert_eq!(bodies(&queue), ["#2", "#4"]);
}

#[test]
fn zero_capacity_still_holds_one() {
    let mut queue = OutboundQueue::new(0, 3);
    queue.push(message(1));
    queue.push(message(2));
    assert_eq!(bodies(&queue), ["#2"]);
}
