//! Starting and stopping download jobs.

use std::sync::Arc;

use dydash_api_models::{DownloadConfig, DownloadJob, DownloadStartRequest, SelectedLink};
use tracing::{info, warn};

use crate::api::DashboardApi;
use crate::error::{DashError, DashResult};
use crate::links::LinkTable;
use crate::notify::{Notifier, NotifyLevel};

/// Nickname sent for links that never resolved.
pub const UNKNOWN_NICKNAME: &str = "unknown";

/// Build the job for the selected rows of `table`.
///
/// Links without a known, non-zero work count contribute `estimate` works.
///
/// # Errors
///
/// Returns [`DashError::Validation`] when no non-blank row is selected.
pub fn plan_job(config: &DownloadConfig, table: &LinkTable, estimate: u64) -> DashResult<DownloadJob> {
    let selected_link_data: Vec<SelectedLink> = table
        .selected_rows()
        .map(|row| {
            let resolved = row.resolved();
            SelectedLink {
                link: row.raw().to_string(),
                work_count: resolved
                    .and_then(|link| link.work_count.known())
                    .filter(|count| *count > 0)
                    .unwrap_or(estimate),
                nickname: resolved
                    .map(|link| link.display_name.clone())
                    .filter(|name| !name.is_empty())
                    .unwrap_or_else(|| UNKNOWN_NICKNAME.to_string()),
            }
        })
        .collect();
    if selected_link_data.is_empty() {
        return Err(DashError::Validation {
            field: "selection",
            reason: "select at least one link",
        });
    }
    let total_works = selected_link_data
        .iter()
        .map(|link| link.work_count)
        .fold(0_u64, u64::saturating_add);
    let mut config = config.clone();
    config.link = selected_link_data
        .iter()
        .map(|link| link.link.clone())
        .collect();
    Ok(DownloadJob {
        config,
        total_works,
        selected_link_data,
    })
}

/// Sends start/stop requests and reports their outcome.
pub struct DownloadController {
    api: Arc<dyn DashboardApi>,
    notifier: Arc<dyn Notifier>,
    items_per_link_estimate: u64,
}

impl DownloadController {
    /// Controller assuming `items_per_link_estimate` works for links whose
    /// count is unknown.
    #[must_use]
    pub fn new(
        api: Arc<dyn DashboardApi>,
        notifier: Arc<dyn Notifier>,
        items_per_link_estimate: u64,
    ) -> Self {
        Self {
            api,
            notifier,
            items_per_link_estimate,
        }
    }

    /// Start downloading the selected links with `config`.
    ///
    /// # Errors
    ///
    /// Returns [`DashError::Validation`] without contacting the backend when
    /// nothing is selected, [`DashError::Rejected`] when the backend refuses,
    /// and [`DashError::Api`] on transport failure.
    pub async fn start(&self, config: &DownloadConfig, table: &LinkTable) -> DashResult<DownloadJob> {
        let job = match plan_job(config, table, self.items_per_link_estimate) {
            Ok(job) => job,
            Err(err) => {
                self.notifier
                    .notify(NotifyLevel::Warning, "select at least one link to download");
                return Err(err);
            }
        };
        let request = DownloadStartRequest { config: job };
        match self.api.start_download(&request).await {
            Ok(ack) if ack.success => {
                let job = request.config;
                info!(
                    links = job.selected_link_data.len(),
                    total_works = job.total_works,
                    "download started"
                );
                self.notifier.notify(
                    NotifyLevel::Success,
                    &format!(
                        "download started: {} links, about {} works",
                        job.selected_link_data.len(),
                        job.total_works
                    ),
                );
                Ok(job)
            }
            Ok(ack) => {
                let message = ack
                    .message
                    .unwrap_or_else(|| "failed to start download".to_string());
                warn!(%message, "download start rejected");
                self.notifier.notify(NotifyLevel::Error, &message);
                Err(DashError::Rejected {
                    operation: "start download",
                    message,
                })
            }
            Err(err) => {
                warn!(error = %err, detail = %err.detail(), "download start failed");
                self.notifier
                    .notify(NotifyLevel::Error, "failed to start download");
                Err(DashError::api("start download", err))
            }
        }
    }

    /// Ask the backend to stop the running job.
    ///
    /// # Errors
    ///
    /// Returns [`DashError::Rejected`] when the backend refuses and
    /// [`DashError::Api`] on transport failure.
    pub async fn stop(&self) -> DashResult<()> {
        match self.api.stop_download().await {
            Ok(ack) if ack.success => {
                info!("download stop requested");
                self.notifier.notify(NotifyLevel::Success, "download stopped");
                Ok(())
            }
            Ok(ack) => {
                let message = ack
                    .message
                    .unwrap_or_else(|| "failed to stop download".to_string());
                warn!(%message, "download stop rejected");
                self.notifier.notify(NotifyLevel::Error, &message);
                Err(DashError::Rejected {
                    operation: "stop download",
                    message,
                })
            }
            Err(err) => {
                warn!(error = %err, detail = %err.detail(), "download stop failed");
                self.notifier
                    .notify(NotifyLevel::Error, "failed to stop download");
                Err(DashError::api("stop download", err))
            }
        }
    }
}
