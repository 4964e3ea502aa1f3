#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
//! Shared HTTP DTOs for the downloader dashboard API.
//!
//! These types are used by the core components and the CLI transport for
//! request/response encoding so the wire contract lives in one place. Field
//! names follow the backend's JSON exactly; Rust-side names are only changed
//! where the wire name is not a valid identifier.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default download directory used by the backend when none is configured.
pub const DEFAULT_DOWNLOAD_PATH: &str = "./Downloaded/";
/// Default worker thread count for the backend downloader.
pub const DEFAULT_THREADS: u32 = 5;

/// Generic `{success, message?}` acknowledgement returned by mutating endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ApiAck {
    /// Whether the backend accepted the request.
    #[serde(default)]
    pub success: bool,
    /// Optional human-readable detail, usually present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Download mode selectable in the configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMode {
    /// Works published by the user.
    Post,
    /// Works liked by the user.
    Like,
    /// Collections (mixes).
    Mix,
}

impl DownloadMode {
    /// Render the mode as its wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Like => "like",
            Self::Mix => "mix",
        }
    }
}

/// Per-mode download limits; zero means "no limit".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DownloadCounts {
    /// Limit for published works.
    #[serde(default)]
    pub post: u32,
    /// Limit for liked works.
    #[serde(default)]
    pub like: u32,
    /// Limit for "all collections" mode.
    #[serde(default)]
    pub allmix: u32,
    /// Limit for a single collection.
    #[serde(default)]
    pub mix: u32,
    /// Limit for music downloads.
    #[serde(default)]
    pub music: u32,
}

/// Per-mode incremental download switches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct IncrementalFlags {
    /// Incremental mode for published works.
    #[serde(default)]
    pub post: bool,
    /// Incremental mode for liked works.
    #[serde(default)]
    pub like: bool,
    /// Incremental mode for "all collections".
    #[serde(default)]
    pub allmix: bool,
    /// Incremental mode for a single collection.
    #[serde(default)]
    pub mix: bool,
    /// Incremental mode for music.
    #[serde(default)]
    pub music: bool,
}

/// Session cookies forwarded to the upstream platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CookieSettings {
    /// `msToken` cookie.
    #[serde(rename = "msToken", default)]
    pub ms_token: String,
    /// `ttwid` cookie.
    #[serde(default)]
    pub ttwid: String,
    /// `odin_tt` cookie.
    #[serde(default)]
    pub odin_tt: String,
    /// `passport_csrf_token` cookie.
    #[serde(default)]
    pub passport_csrf_token: String,
    /// `sid_guard` cookie.
    #[serde(default)]
    pub sid_guard: String,
}

/// Downloader configuration as stored by the backend (`/api/config`).
///
/// Keys the client does not model are kept in [`DownloadConfig::extra`] so a
/// load/save round trip never drops backend-owned settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DownloadConfig {
    /// Ordered link list; index positions map 1:1 to link table rows.
    pub link: Vec<String>,
    /// Download directory on the backend host.
    pub path: String,
    /// Download background music.
    pub music: bool,
    /// Download cover images.
    pub cover: bool,
    /// Download author avatars.
    pub avatar: bool,
    /// Write per-work JSON metadata.
    pub json: bool,
    /// Store each work in its own folder.
    pub folderstyle: bool,
    /// Enabled download modes.
    pub mode: Vec<DownloadMode>,
    /// Per-mode download limits.
    pub number: DownloadCounts,
    /// Track downloaded works in the backend database.
    pub database: bool,
    /// Per-mode incremental switches.
    pub increase: IncrementalFlags,
    /// Backend worker thread count.
    pub thread: u32,
    /// Upstream session cookies.
    pub cookies: CookieSettings,
    /// Keys not modelled by this client, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            link: Vec::new(),
            path: DEFAULT_DOWNLOAD_PATH.to_string(),
            music: false,
            cover: false,
            avatar: false,
            json: false,
            folderstyle: false,
            mode: vec![DownloadMode::Post, DownloadMode::Mix],
            number: DownloadCounts::default(),
            database: true,
            increase: IncrementalFlags {
                post: true,
                like: false,
                allmix: true,
                mix: true,
                music: false,
            },
            thread: DEFAULT_THREADS,
            cookies: CookieSettings::default(),
            extra: Map::new(),
        }
    }
}

/// Body for `POST /api/link/parse`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkParseRequest {
    /// Raw link text as entered by the user.
    pub link: String,
}

/// Kind of entity a link resolved to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// A user profile.
    User,
    /// A single video.
    Video,
    /// A collection.
    Mix,
    /// Anything the backend reports that the client does not recognise.
    #[serde(other)]
    Unknown,
}

/// Response from `POST /api/link/parse`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LinkParseResponse {
    /// Whether the link was understood.
    #[serde(default)]
    pub success: bool,
    /// Display name of the resolved entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Resolved entity kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<LinkType>,
    /// User identifier for profile links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sec_uid: Option<String>,
    /// Video identifier for single-video links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aweme_id: Option<String>,
    /// Collection identifier for mix links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mix_id: Option<String>,
    /// Work count when the backend already knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_count: Option<u64>,
    /// Failure detail when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LinkParseResponse {
    /// First external identifier present, in `sec_uid`, `aweme_id`, `mix_id` order.
    #[must_use]
    pub fn external_id(&self) -> Option<&str> {
        self.sec_uid
            .as_deref()
            .or(self.aweme_id.as_deref())
            .or(self.mix_id.as_deref())
    }
}

/// Body for `POST /api/user/work-count`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkCountRequest {
    /// User identifier obtained from link parsing.
    pub sec_uid: String,
}

/// Response from `POST /api/user/work-count`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WorkCountResponse {
    /// Whether the count lookup succeeded.
    #[serde(default)]
    pub success: bool,
    /// Number of works published by the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_count: Option<u64>,
    /// Failure detail when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Per-link summary attached to a download job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedLink {
    /// Link text.
    pub link: String,
    /// Known or estimated work count for the link.
    pub work_count: u64,
    /// Resolved display name, or a placeholder.
    pub nickname: String,
}

/// Configuration copy submitted with a download start request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadJob {
    /// Configuration with `link` narrowed to the selected links.
    #[serde(flatten)]
    pub config: DownloadConfig,
    /// Expected number of works across all selected links.
    pub total_works: u64,
    /// Per-link breakdown of `total_works`.
    pub selected_link_data: Vec<SelectedLink>,
}

/// Body for `POST /api/download/start`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadStartRequest {
    /// Job description.
    pub config: DownloadJob,
}

/// Snapshot returned by `GET /api/download/status`.
///
/// Every numeric field defaults to zero when omitted so partially populated
/// snapshots (e.g. before the first download) still decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DownloadStatus {
    /// Whether a download job is active.
    pub running: bool,
    /// Free-form description of the current step.
    pub current_task: Option<String>,
    /// Backend-side progress estimate (informational only).
    pub progress: f64,
    /// Files written so far in this job.
    pub downloaded_files: u64,
    /// Files that failed in this job.
    pub failed_files: u64,
    /// Links submitted with the job.
    pub total_links: u64,
    /// Links fully processed.
    pub completed_links: u64,
    /// Zero-based index of the link currently processed.
    pub current_link_index: u64,
    /// Link currently processed.
    pub current_link: Option<String>,
    /// Expected number of works, zero when unknown.
    pub total_works: u64,
    /// Opaque backend start marker; only its presence is significant.
    pub start_time: Option<Value>,
}

/// Entry returned by `GET /api/files`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEntry {
    /// File name including extension.
    pub name: String,
    /// Path relative to the download directory.
    pub path: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// ISO-8601 modification timestamp.
    #[serde(default)]
    pub modified: String,
}

/// Thumbnail status values reported by `GET /api/file/thumbnail/status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailStatusKind {
    /// Thumbnail exists and is newer than the video.
    Ready,
    /// No thumbnail generated yet.
    NotGenerated,
    /// Thumbnail older than the video.
    Outdated,
    /// Video file missing.
    FileNotFound,
    /// Path does not name a video.
    NotVideo,
    /// Backend failed while checking.
    Error,
    /// Unrecognised status string.
    #[serde(other)]
    Unknown,
}

impl ThumbnailStatusKind {
    /// Render the status as its wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::NotGenerated => "not_generated",
            Self::Outdated => "outdated",
            Self::FileNotFound => "file_not_found",
            Self::NotVideo => "not_video",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

/// Response from `GET /api/file/thumbnail/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThumbnailStatusResponse {
    /// Reported status.
    pub status: ThumbnailStatusKind,
    /// Echoed path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Optional detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn config_preserves_unknown_keys() -> Result<()> {
        let raw = json!({
            "link": ["https://v.douyin.com/abc"],
            "path": "/data/dl",
            "mode": ["post"],
            "thread": 8,
            "end_time": "2024-01-01",
            "start_time": ""
        });
        let config: DownloadConfig = serde_json::from_value(raw)?;
        assert_eq!(config.link, vec!["https://v.douyin.com/abc".to_string()]);
        assert_eq!(config.thread, 8);
        assert_eq!(config.mode, vec![DownloadMode::Post]);
        assert_eq!(config.extra.get("end_time"), Some(&json!("2024-01-01")));

        let back = serde_json::to_value(&config)?;
        assert_eq!(back["end_time"], json!("2024-01-01"));
        assert_eq!(back["cookies"]["msToken"], json!(""));
        Ok(())
    }

    #[test]
    fn missing_config_fields_fall_back_to_defaults() -> Result<()> {
        let config: DownloadConfig = serde_json::from_value(json!({}))?;
        assert_eq!(config, DownloadConfig::default());
        assert_eq!(config.path, DEFAULT_DOWNLOAD_PATH);
        assert!(config.database);
        Ok(())
    }

    #[test]
    fn unknown_link_type_decodes_as_unknown() -> Result<()> {
        let response: LinkParseResponse = serde_json::from_value(json!({
            "success": true,
            "nickname": "someone",
            "link_type": "live_room"
        }))?;
        assert_eq!(response.link_type, Some(LinkType::Unknown));
        Ok(())
    }

    #[test]
    fn external_id_prefers_sec_uid() {
        let response = LinkParseResponse {
            success: true,
            sec_uid: Some("MS4wLjABAAAA".into()),
            mix_id: Some("72000".into()),
            ..LinkParseResponse::default()
        };
        assert_eq!(response.external_id(), Some("MS4wLjABAAAA"));
    }

    #[test]
    fn sparse_status_snapshot_decodes() -> Result<()> {
        let status: DownloadStatus =
            serde_json::from_value(json!({"running": false, "current_task": null}))?;
        assert!(!status.running);
        assert_eq!(status.total_links, 0);
        assert!(status.start_time.is_none());
        Ok(())
    }

    #[test]
    fn download_job_flattens_config() -> Result<()> {
        let job = DownloadStartRequest {
            config: DownloadJob {
                config: DownloadConfig {
                    link: vec!["a".into()],
                    ..DownloadConfig::default()
                },
                total_works: 10,
                selected_link_data: vec![SelectedLink {
                    link: "a".into(),
                    work_count: 10,
                    nickname: "unknown".into(),
                }],
            },
        };
        let value = serde_json::to_value(&job)?;
        assert_eq!(value["config"]["link"], json!(["a"]));
        assert_eq!(value["config"]["total_works"], json!(10));
        assert_eq!(value["config"]["selected_link_data"][0]["work_count"], json!(10));
        Ok(())
    }
}
