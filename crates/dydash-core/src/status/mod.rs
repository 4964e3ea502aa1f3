//! Download status reconciliation.
//!
//! [`StatusTracker`] turns each backend snapshot into a [`ProgressView`] and
//! detects running/stopped edges; [`StatusPoller`] drives it on an interval.
//! All arithmetic lives here so it can be tested without I/O.

mod poller;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dydash_api_models::DownloadStatus;
use serde::Serialize;
use tracing::info;

use crate::catalog::FileType;

pub use poller::{PollerHooks, StatusPoller};

/// Placeholder shown when the ETA cannot be computed.
pub const UNKNOWN_ETA: &str = "--:--";
const WAITING_CAPTION: &str = "waiting to start...";

/// Tunables for status polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    /// Delay between status requests.
    pub interval: Duration,
    /// Assumed works per link when the backend reports no total.
    pub items_per_link_estimate: u64,
    /// Delay before re-listing files after a download stops.
    pub settle_delay: Duration,
    /// Entries kept in the recent-downloads log.
    pub recent_capacity: usize,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            items_per_link_estimate: 10,
            settle_delay: Duration::from_secs(1),
            recent_capacity: 10,
        }
    }
}

/// Edge of the `running` flag between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// A download started.
    Started,
    /// A download stopped or finished.
    Stopped,
}

/// Item the backend reports working on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentItem {
    /// File name, or the raw task text when no file name is present.
    pub name: String,
    /// Type of the file, when a file name was found.
    pub file_type: Option<FileType>,
}

/// Sticky data derived from snapshots, shown alongside the progress bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressView {
    /// Whether a download is active.
    pub running: bool,
    /// Whether the live panel is shown.
    pub panel_visible: bool,
    /// Progress in percent, within `[0, 100]`.
    pub percent: f64,
    /// Caption under the progress bar.
    pub caption: String,
    /// Files downloaded.
    pub downloaded: u64,
    /// Files failed.
    pub failed: u64,
    /// Works, or links when no work total is known, still outstanding.
    pub remaining: u64,
    /// Expected total works, when known.
    pub total_works: Option<u64>,
    /// Works per second since the download started.
    pub speed: f64,
    /// Estimated time left, or [`UNKNOWN_ETA`].
    pub eta: String,
    /// Link being processed.
    pub current_link: Option<String>,
    /// Item being processed.
    pub current_item: Option<CurrentItem>,
    /// Recent downloads, oldest first.
    pub recent: Vec<CurrentItem>,
}

/// Result of applying one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusUpdate {
    /// Derived view for this snapshot.
    pub view: ProgressView,
    /// Edge detected against the previous snapshot.
    pub transition: Option<Transition>,
}

fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10_f64.powi(digits);
    (value * scale).round() / scale
}

#[allow(clippy::cast_precision_loss)]
fn ratio_percent(part: u64, whole: u64) -> f64 {
    round_to(part as f64 / whole as f64 * 100.0, 1)
}

/// Progress in percent for `snapshot`.
///
/// Priority: downloaded/total works when both are known; else downloaded over
/// `links × items_per_link`; else completed/total links. A stopped download
/// whose links are all complete is always 100.
#[must_use]
pub fn progress_percent(snapshot: &DownloadStatus, items_per_link: u64) -> f64 {
    let downloaded = snapshot.downloaded_files;
    let estimated = snapshot.total_links.saturating_mul(items_per_link);
    let percent = if snapshot.total_works > 0 && downloaded > 0 {
        ratio_percent(downloaded, snapshot.total_works).min(100.0)
    } else if downloaded > 0 && estimated > 0 {
        ratio_percent(downloaded, estimated).min(100.0)
    } else if snapshot.total_links > 0 {
        ratio_percent(snapshot.completed_links, snapshot.total_links)
    } else {
        0.0
    };
    if !snapshot.running
        && snapshot.total_links > 0
        && snapshot.completed_links >= snapshot.total_links
    {
        return 100.0;
    }
    percent.clamp(0.0, 100.0)
}

/// Outstanding works when a total is known, else outstanding links.
#[must_use]
pub const fn remaining_items(snapshot: &DownloadStatus) -> u64 {
    if snapshot.total_works > 0 {
        snapshot.total_works.saturating_sub(snapshot.downloaded_files)
    } else {
        snapshot.total_links.saturating_sub(snapshot.completed_links)
    }
}

/// Speed in works per second (two decimals) and seconds left, if computable.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn throughput(downloaded: u64, total_works: u64, elapsed: Duration) -> (f64, Option<f64>) {
    let seconds = elapsed.as_secs_f64();
    if downloaded == 0 || seconds <= 0.0 {
        return (0.0, None);
    }
    let rate = downloaded as f64 / seconds;
    let eta = (total_works > 0)
        .then(|| total_works.saturating_sub(downloaded) as f64 / rate);
    (round_to(rate, 2), eta)
}

/// `M:SS` below an hour, `H:MM` from an hour up, [`UNKNOWN_ETA`] otherwise.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_eta(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds.filter(|value| value.is_finite() && *value >= 0.0) else {
        return UNKNOWN_ETA.to_string();
    };
    let whole = seconds.floor() as u64;
    if whole < 3600 {
        format!("{}:{:02}", whole / 60, whole % 60)
    } else {
        format!("{}:{:02}", whole / 3600, (whole % 3600) / 60)
    }
}

/// Caption under the progress bar.
#[must_use]
pub fn task_caption(snapshot: &DownloadStatus, percent: f64) -> String {
    let task = snapshot
        .current_task
        .as_deref()
        .filter(|task| !task.trim().is_empty())
        .unwrap_or(WAITING_CAPTION);
    let downloaded = snapshot.downloaded_files;
    if snapshot.total_works > 0 && downloaded > 0 {
        format!(
            "downloaded {downloaded}/{} works ({percent:.1}%)",
            snapshot.total_works
        )
    } else if downloaded > 0 {
        format!("downloaded {downloaded} files")
    } else if snapshot.total_links > 0 {
        format!(
            "link {}/{}: {task}",
            snapshot.current_link_index + 1,
            snapshot.total_links
        )
    } else {
        task.to_string()
    }
}

/// Extract the file being downloaded from a task text such as `下载: clip.mp4`.
/// Returns the item and whether a file name was found.
#[must_use]
pub fn parse_current_task(task: &str) -> (CurrentItem, bool) {
    let file_name = task.find("下载").and_then(|at| {
        let rest = &task[at + "下载".len()..];
        rest.strip_prefix(':')
            .or_else(|| rest.strip_prefix('：'))
            .map(str::trim)
            .filter(|name| !name.is_empty())
    });
    match file_name {
        Some(name) => (
            CurrentItem {
                name: name.to_string(),
                file_type: Some(FileType::from_name(name)),
            },
            true,
        ),
        None => (
            CurrentItem {
                name: task.to_string(),
                file_type: None,
            },
            false,
        ),
    }
}

/// Reconciles snapshots into a [`ProgressView`] and detects edges.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    settings: PollerSettings,
    running: Option<bool>,
    started_at: Option<Instant>,
    recent: VecDeque<CurrentItem>,
}

impl StatusTracker {
    /// Tracker that has not seen any snapshot yet.
    #[must_use]
    pub fn new(settings: PollerSettings) -> Self {
        Self {
            settings,
            running: None,
            started_at: None,
            recent: VecDeque::with_capacity(settings.recent_capacity),
        }
    }

    /// Settings in use.
    #[must_use]
    pub const fn settings(&self) -> &PollerSettings {
        &self.settings
    }

    /// Running flag of the last snapshot, `None` before the first one.
    #[must_use]
    pub const fn last_running(&self) -> Option<bool> {
        self.running
    }

    /// Apply a snapshot observed at `now`. The snapshot replaces the previous
    /// one entirely; only the start time and recent log carry over.
    pub fn apply(&mut self, snapshot: &DownloadStatus, now: Instant) -> StatusUpdate {
        let was_running = self.running.unwrap_or(false);
        let transition = match (was_running, snapshot.running) {
            (false, true) => Some(Transition::Started),
            (true, false) => Some(Transition::Stopped),
            _ => None,
        };
        match transition {
            Some(Transition::Started) => {
                info!(links = snapshot.total_links, works = snapshot.total_works, "download started");
                self.started_at = Some(now);
                self.recent.clear();
            }
            Some(Transition::Stopped) => {
                info!(
                    downloaded = snapshot.downloaded_files,
                    failed = snapshot.failed_files,
                    "download stopped"
                );
                self.started_at = None;
                self.recent.clear();
            }
            None => {}
        }
        self.running = Some(snapshot.running);

        let current_item = snapshot.current_task.as_deref().map(|task| {
            let (item, is_file) = parse_current_task(task);
            if snapshot.running && is_file {
                self.remember(&item);
            }
            item
        });

        let percent = progress_percent(snapshot, self.settings.items_per_link_estimate);
        let (speed, eta) = match self.started_at {
            Some(started) if snapshot.running => throughput(
                snapshot.downloaded_files,
                snapshot.total_works,
                now.saturating_duration_since(started),
            ),
            _ => (0.0, None),
        };

        StatusUpdate {
            view: ProgressView {
                running: snapshot.running,
                panel_visible: snapshot.running,
                percent,
                caption: task_caption(snapshot, percent),
                downloaded: snapshot.downloaded_files,
                failed: snapshot.failed_files,
                remaining: remaining_items(snapshot),
                total_works: (snapshot.total_works > 0).then_some(snapshot.total_works),
                speed,
                eta: format_eta(eta),
                current_link: snapshot.current_link.clone(),
                current_item,
                recent: self.recent.iter().cloned().collect(),
            },
            transition,
        }
    }

    fn remember(&mut self, item: &CurrentItem) {
        if self.recent.back().is_some_and(|last| last.name == item.name) {
            return;
        }
        if self.settings.recent_capacity == 0 {
            return;
        }
        while self.recent.len() >= self.settings.recent_capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(item.clone());
    }
}
