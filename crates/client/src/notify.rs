// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! "Token refreshed" notification fan-out.
//!
//! The refresh coordinator emits; the connection manager (and anything else
//! that caches credentials) listens. A listener that panics is logged and
//! skipped so the remaining listeners still run.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, Weak};

use tracing::error;

type Listener = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

#[derive(Clone, Default)]
pub struct RefreshNotifier {
    listeners: Arc<Mutex<Listeners>>,
}

impl RefreshNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener`; it stays registered until the returned handle
    /// is unsubscribed.
    pub fn subscribe<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Arc::new(listener)));
        ListenerHandle {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Calls every registered listener in registration order.
    pub fn emit(&self) {
        // Snapshot so listeners may subscribe or unsubscribe while running.
        let snapshot: Vec<Listener> = {
            let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners.entries.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in snapshot {
            call_isolated("refresh listener", || listener());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entries
            .len()
    }
}

/// Registration returned by [`RefreshNotifier::subscribe`].
#[must_use = "the listener stays registered until unsubscribe() is called"]
pub struct ListenerHandle {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl ListenerHandle {
    /// Removes the listener. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            let mut listeners = listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners.entries.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Runs a caller-supplied callback, logging instead of propagating a panic.
///
/// Returns `false` if the callback panicked.
pub(crate) fn call_isolated<F: FnOnce()>(what: &str, callback: F) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(()) => true,
        Err(payload) => {
            error!(callback = what, panic = %panic_message(payload.as_ref()), "callback panicked");
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
