// Path: crates/account/src/worker.rs

//! The account-update worker.
//!
//! One scheduled task owns all account refreshes: it re-reads the user
//! profile, requests fresh token batches when any handler wants them, and
//! reschedules itself. The baseline cadence is 24 hours, tightened to one
//! hour around subscription boundaries and to ten minutes while the
//! issuer-failing latch is set. Low-inventory triggers from the handlers
//! arrive on a coalescing channel and run an update immediately.

use crate::client::AccountClient;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use veil_access::Registry;
use veil_api::handler::TokenHandler;
use veil_types::account::UserRecord;

/// Baseline update cadence.
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
/// Cadence within a day of a subscription boundary.
pub const UPDATE_INTERVAL_NEAR_BOUNDARY: Duration = Duration::from_secs(60 * 60);
/// Cadence while the issuer-failing latch is set.
pub const UPDATE_RETRY_INTERVAL: Duration = Duration::from_secs(10 * 60);
/// How long a stopping worker may take to wind down.
pub const STOP_GRACE: Duration = Duration::from_secs(60);

/// The account-update worker.
pub struct AccountWorker {
    client: Arc<AccountClient>,
    registry: Arc<Registry>,
    trigger_rx: mpsc::Receiver<()>,
    stop_rx: watch::Receiver<bool>,
}

impl AccountWorker {
    /// Builds the worker over the trigger and stop channels.
    pub fn new(
        client: Arc<AccountClient>,
        registry: Arc<Registry>,
        trigger_rx: mpsc::Receiver<()>,
        stop_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            client,
            registry,
            trigger_rx,
            stop_rx,
        }
    }

    /// Runs until the stop signal fires.
    pub async fn run(mut self) {
        enum Wake {
            Stop,
            Update,
        }
        loop {
            let delay = self.next_delay().await;
            tracing::debug!(delay_secs = delay.as_secs(), "account update scheduled");
            let wake = tokio::select! {
                changed = self.stop_rx.changed() => {
                    match changed {
                        Ok(()) if !*self.stop_rx.borrow() => continue,
                        _ => Wake::Stop,
                    }
                }
                received = self.trigger_rx.recv() => {
                    match received {
                        Some(()) => Wake::Update,
                        None => Wake::Stop,
                    }
                }
                _ = tokio::time::sleep(delay) => Wake::Update,
            };
            match wake {
                Wake::Stop => {
                    tracing::debug!("account worker stopping");
                    return;
                }
                Wake::Update => self.update().await,
            }
        }
    }

    /// One update pass: profile refresh, then token refill if any zone
    /// wants one. Errors are logged; the next pass is scheduled anyway.
    async fn update(&self) {
        match self.client.user().await {
            Ok(Some(user)) if user.is_logged_in() => {}
            _ => {
                tracing::debug!("no logged-in user, skipping account update");
                return;
            }
        }

        if let Err(e) = self.client.update_profile().await {
            tracing::warn!(error = %e, "profile refresh failed");
        }

        let wants_tokens = self
            .registry
            .zones()
            .into_iter()
            .filter_map(|zone| self.registry.get(&zone))
            .any(|handler| handler.should_request());
        if wants_tokens {
            if let Err(e) = self.client.request_tokens(&self.registry).await {
                tracing::warn!(error = %e, "token request failed");
            }
        }
    }

    async fn next_delay(&self) -> Duration {
        if self.client.status().is_failing() {
            return UPDATE_RETRY_INTERVAL;
        }
        let user = self.client.user().await.ok().flatten();
        if user.as_ref().is_some_and(near_subscription_boundary) {
            return UPDATE_INTERVAL_NEAR_BOUNDARY;
        }
        UPDATE_INTERVAL
    }
}

/// Whether now is within a day of the subscription end or the next
/// billing event.
fn near_subscription_boundary(user: &UserRecord) -> bool {
    let Some(subscription) = &user.subscription else {
        return false;
    };
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let day = 24 * 60 * 60;
    [subscription.ends_at, subscription.next_billing_at]
        .into_iter()
        .flatten()
        .any(|at| at.abs_diff(now) <= day)
}

/// Signals the worker to stop and waits out the grace period.
pub async fn stop_worker(stop_tx: &watch::Sender<bool>, handle: JoinHandle<()>) {
    let _ = stop_tx.send(true);
    if tokio::time::timeout(STOP_GRACE, handle).await.is_err() {
        tracing::warn!("account worker did not stop within the grace period");
    }
}
