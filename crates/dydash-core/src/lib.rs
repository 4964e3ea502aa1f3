#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::redundant_pub_crate)]

//! Client-side state for the downloader dashboard.
//!
//! Layout:
//! - `api.rs`: the [`DashboardApi`] transport seam (one method per endpoint)
//! - `scheduler.rs`: the [`Scheduler`] timer seam used by every polling loop
//! - `config_store.rs`: loaded/collected configuration with layered form input
//! - `links.rs`: link table rows and their asynchronous enrichment
//! - `catalog/`: file listing, derived attributes, filter/sort/paginate
//! - `status/`: download status reconciliation and the polling loop
//! - `thumbnail.rs`: per-video thumbnail state machine
//! - `download.rs`: start/stop of download jobs
//! - `logs.rs`: backend log retrieval and severity classification
//!
//! Every component owns its state and mutates it only through its own
//! methods; collections are replaced wholesale rather than merged.

pub mod api;
pub mod catalog;
pub mod config_store;
pub mod download;
pub mod error;
pub mod links;
pub mod logs;
pub mod notify;
pub mod scheduler;
pub mod status;
pub mod thumbnail;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{DashboardApi, MediaKind, ThumbnailFetch};
pub use catalog::{
    FileCatalog, FileRecord, FileStats, FileType, FilterState, PageView, SortKey, preview_target,
};
pub use config_store::{ConfigForm, ConfigStore, CountInputs};
pub use download::{DownloadController, plan_job};
pub use error::{ApiError, ApiResult, DashError, DashResult};
pub use links::{LinkEnricher, LinkKind, LinkRow, LinkTable, Resolution, WorkCount};
pub use logs::{LogLine, LogSeverity, classify_log_line, fetch_log_lines};
pub use notify::{Notifier, NotifyLevel, TracingNotifier};
pub use scheduler::{Scheduler, TokioScheduler};
pub use status::{
    PollerHooks, PollerSettings, ProgressView, StatusPoller, StatusTracker, StatusUpdate,
    Transition,
};
pub use thumbnail::{
    ThumbnailError, ThumbnailPlan, ThumbnailResolver, ThumbnailSettings, ThumbnailState,
};
