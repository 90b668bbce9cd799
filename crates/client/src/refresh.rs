// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Token refresh coordination.
//!
//! The backend session expires after roughly half an hour. The coordinator
//! refreshes it proactively on a timer and on demand (for example after a
//! 401), making sure only one refresh request is ever in flight. Callers
//! arriving while a refresh runs wait for, and share, its outcome.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::notify::RefreshNotifier;
use crate::rest::{RestClient, REFRESH_PATH};
use crate::task::ScheduledTask;

/// Error type for token refresh. Cloned to every waiting caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("token refresh failed: {0}")]
    Request(String),

    #[error("token refresh cancelled")]
    Cancelled,
}

type Waiter = oneshot::Sender<Result<(), RefreshError>>;

#[derive(Default)]
struct State {
    timer: Option<ScheduledTask>,
    in_flight: bool,
    waiters: VecDeque<Waiter>,
}

struct Inner {
    rest: Arc<dyn RestClient>,
    interval: Duration,
    notifier: RefreshNotifier,
    state: Mutex<State>,
}

/// Single-flight token refresh with a proactive timer.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TokenRefreshCoordinator {
    inner: Arc<Inner>,
}

impl TokenRefreshCoordinator {
    /// `rest` must not route 401s back through this coordinator.
    pub fn new(rest: Arc<dyn RestClient>, interval: Duration) -> Self {
        TokenRefreshCoordinator {
            inner: Arc::new(Inner {
                rest,
                interval,
                notifier: RefreshNotifier::new(),
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Emits after every successful refresh.
    pub fn notifier(&self) -> &RefreshNotifier {
        &self.inner.notifier
    }

    /// (Re)arms the periodic refresh timer.
    pub fn start(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let timer = ScheduledTask::every(self.inner.interval, move || {
            let weak = weak.clone();
            async move {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let coordinator = TokenRefreshCoordinator { inner };
                if let Err(e) = coordinator.refresh_token().await {
                    warn!(error = %e, "scheduled token refresh failed");
                }
            }
        });

        let previous = self.lock().timer.replace(timer);
        drop(previous);
        info!(
            interval_secs = self.inner.interval.as_secs(),
            "token refresh timer started"
        );
    }

    /// Cancels the periodic timer. Idempotent.
    pub fn stop(&self) {
        let timer = self.lock().timer.take();
        if timer.is_some() {
            debug!("token refresh timer stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().timer.is_some()
    }

    /// Refreshes the session, or joins the refresh already in flight.
    ///
    /// Every caller waiting on the same refresh receives the same outcome,
    /// in the order they arrived. A failed refresh stops the timer.
    pub async fn refresh_token(&self) -> Result<(), RefreshError> {
        let (tx, rx) = oneshot::channel();
        let lead = {
            let mut state = self.lock();
            state.waiters.push_back(tx);
            !std::mem::replace(&mut state.in_flight, true)
        };

        if lead {
            debug!("starting token refresh");
            // Own task, so a caller that gives up cannot leave the flag set.
            tokio::spawn(run_refresh(Arc::clone(&self.inner)));
        } else {
            debug!("token refresh in flight, waiting for its outcome");
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(RefreshError::Cancelled),
        }
    }

    /// Entry point for the REST refresh interceptor.
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        self.refresh_token().await
    }

    /// Stops the timer and abandons queued callers, who observe
    /// [`RefreshError::Cancelled`].
    pub fn cleanup(&self) {
        let (timer, waiters) = {
            let mut state = self.lock();
            (state.timer.take(), std::mem::take(&mut state.waiters))
        };
        drop(timer);
        if !waiters.is_empty() {
            debug!(count = waiters.len(), "dropping queued refresh callers");
        }
        drop(waiters);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

async fn run_refresh(inner: Arc<Inner>) {
    let outcome = inner
        .rest
        .post(REFRESH_PATH, None)
        .await
        .map(|_| ())
        .map_err(|e| RefreshError::Request(e.to_string()));

    match &outcome {
        Ok(()) => {
            info!("token refreshed");
            inner.notifier.emit();
        }
        Err(e) => error!(error = %e, "token refresh failed, stopping refresh timer"),
    }

    let (waiters, timer) = {
        let mut state = inner.state.lock().unwrap_or_else(|e| e.into_inner());
        state.in_flight = false;
        let timer = if outcome.is_err() {
            state.timer.take()
        } else {
            None
        };
        (std::mem::take(&mut state.waiters), timer)
    };
    drop(timer);

    for waiter in waiters {
        let _ = waiter.send(outcome.clone());
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
