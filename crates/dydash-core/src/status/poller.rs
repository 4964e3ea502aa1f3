//! Interval loop that feeds backend snapshots into a [`StatusTracker`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{PollerSettings, StatusTracker, StatusUpdate, Transition};
use crate::api::DashboardApi;
use crate::scheduler::Scheduler;

/// Side effects the poller triggers; implemented by whatever owns the views.
#[async_trait]
pub trait PollerHooks: Send + Sync {
    /// Called after every successful tick.
    async fn on_update(&self, update: &StatusUpdate) {
        let _ = update;
    }

    /// Re-list downloaded files.
    async fn refresh_catalog(&self);

    /// Refresh summary statistics (link and file totals).
    async fn refresh_statistics(&self);
}

/// Polls `/api/download/status` on a fixed interval.
pub struct StatusPoller {
    api: Arc<dyn DashboardApi>,
    scheduler: Arc<dyn Scheduler>,
    hooks: Arc<dyn PollerHooks>,
    tracker: StatusTracker,
    deferred: Vec<JoinHandle<()>>,
}

impl StatusPoller {
    /// Create a poller; nothing runs until [`StatusPoller::run`] or
    /// [`StatusPoller::tick`] is called.
    #[must_use]
    pub fn new(
        api: Arc<dyn DashboardApi>,
        scheduler: Arc<dyn Scheduler>,
        hooks: Arc<dyn PollerHooks>,
        settings: PollerSettings,
    ) -> Self {
        Self {
            api,
            scheduler,
            hooks,
            tracker: StatusTracker::new(settings),
            deferred: Vec::new(),
        }
    }

    /// Reconciler state.
    #[must_use]
    pub const fn tracker(&self) -> &StatusTracker {
        &self.tracker
    }

    /// Fetch one snapshot and apply it. A failed fetch is logged and skipped.
    pub async fn tick(&mut self) -> Option<StatusUpdate> {
        let snapshot = match self.api.download_status().await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, detail = %err.detail(), "status poll failed; skipping tick");
                return None;
            }
        };
        let update = self.tracker.apply(&snapshot, self.scheduler.now());
        debug!(
            running = update.view.running,
            percent = update.view.percent,
            downloaded = update.view.downloaded,
            "status tick"
        );
        if update.transition == Some(Transition::Stopped) {
            self.after_stop().await;
        }
        self.hooks.on_update(&update).await;
        Some(update)
    }

    /// Tick every `interval` until `shutdown` turns true or its sender is dropped.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        let interval = self.tracker.settings().interval;
        info!(interval_ms = interval.as_millis(), "status polling started");
        while !*shutdown.borrow() {
            let _ = self.tick().await;
            let scheduler = Arc::clone(&self.scheduler);
            tokio::select! {
                () = scheduler.sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        info!("status polling stopped");
    }

    /// Wait for outstanding post-download refreshes.
    pub async fn settle(&mut self) {
        for handle in self.deferred.drain(..) {
            if let Err(err) = handle.await {
                warn!(error = %err, "deferred refresh task failed");
            }
        }
    }

    async fn after_stop(&mut self) {
        self.hooks.refresh_statistics().await;
        let hooks = Arc::clone(&self.hooks);
        let scheduler = Arc::clone(&self.scheduler);
        let delay = self.tracker.settings().settle_delay;
        self.deferred.retain(|handle| !handle.is_finished());
        self.deferred.push(tokio::spawn(async move {
            scheduler.sleep(delay).await;
            debug!("refreshing files after download stopped");
            hooks.refresh_catalog().await;
            hooks.refresh_statistics().await;
        }));
    }
}
