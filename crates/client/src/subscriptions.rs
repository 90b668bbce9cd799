// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Subscription table.
//!
//! One entry per destination, kept in registration order. Entries outlive
//! the session they were registered on; after every successful connect they
//! are replayed against the new session, which issues fresh live ids.

use std::sync::Arc;

use dama_core::Headers;
use tracing::warn;

use crate::transport::{InboundMessage, Session, SubscriptionId};

/// Handler for messages delivered on a subscription.
pub type MessageCallback = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

pub(crate) struct SubscriptionEntry {
    pub destination: String,
    pub callback: MessageCallback,
    pub headers: Headers,
    /// Id on the current session, if registered there.
    pub live_id: Option<SubscriptionId>,
    /// Distinguishes this registration from a later replacement.
    pub registration: u64,
}

#[derive(Default)]
pub(crate) struct SubscriptionTable {
    entries: Vec<SubscriptionEntry>,
    next_registration: u64,
}

impl SubscriptionTable {
    pub fn get(&self, destination: &str) -> Option<&SubscriptionEntry> {
        self.entries.iter().find(|e| e.destination == destination)
    }

    /// Stores an entry, replacing any existing one for the destination in
    /// place. Returns the new registration id.
    pub fn insert(
        &mut self,
        destination: &str,
        callback: MessageCallback,
        headers: Headers,
        live_id: Option<SubscriptionId>,
    ) -> u64 {
        self.next_registration += 1;
        let entry = SubscriptionEntry {
            destination: destination.to_string(),
            callback,
            headers,
            live_id,
            registration: self.next_registration,
        };
        match self.entries.iter_mut().find(|e| e.destination == destination) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        self.next_registration
    }

    pub fn remove(&mut self, destination: &str) -> Option<SubscriptionEntry> {
        let index = self.entries.iter().position(|e| e.destination == destination)?;
        Some(self.entries.remove(index))
    }

    /// Removes the entry only if it is still the given registration.
    pub fn remove_registration(
        &mut self,
        destination: &str,
        registration: u64,
    ) -> Option<SubscriptionEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.destination == destination && e.registration == registration)?;
        Some(self.entries.remove(index))
    }

    pub fn callback_for(&self, live_id: &str) -> Option<MessageCallback> {
        self.entries
            .iter()
            .find(|e| e.live_id.as_deref() == Some(live_id))
            .map(|e| Arc::clone(&e.callback))
    }

    pub fn destinations(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.destination.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn drain(&mut self) -> Vec<SubscriptionEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Forgets live ids; the session they belonged to is gone.
    pub fn clear_live_ids(&mut self) {
        for entry in &mut self.entries {
            entry.live_id = None;
        }
    }

    /// Registers every entry on `session`, in order.
    ///
    /// Failures are logged and skipped. Returns how many were restored.
    pub fn resubscribe_all(&mut self, session: &dyn Session) -> usize {
        let mut restored = 0;
        for entry in &mut self.entries {
            match session.subscribe(&entry.destination, &entry.headers) {
                Ok(id) => {
                    entry.live_id = Some(id);
                    restored += 1;
                }
                Err(e) => {
                    entry.live_id = None;
                    warn!(destination = %entry.destination, error = %e, "failed to restore subscription");
                }
            }
        }
        restored
    }
}

#[cfg(test)]
#[path = "subscriptions_tests.rs"]
mod tests;
