//! Transport seam between dashboard components and the backend HTTP API.

use async_trait::async_trait;
use dydash_api_models::{
    ApiAck, DownloadConfig, DownloadStartRequest, DownloadStatus, FileEntry, LinkParseResponse,
    ThumbnailStatusResponse, WorkCountResponse,
};

use crate::error::ApiResult;

/// Endpoint paths served by the backend.
pub mod endpoints {
    /// Configuration read/write.
    pub const CONFIG: &str = "/api/config";
    /// Link parsing.
    pub const LINK_PARSE: &str = "/api/link/parse";
    /// User work count lookup.
    pub const WORK_COUNT: &str = "/api/user/work-count";
    /// Download start.
    pub const DOWNLOAD_START: &str = "/api/download/start";
    /// Download stop.
    pub const DOWNLOAD_STOP: &str = "/api/download/stop";
    /// Download status snapshot.
    pub const DOWNLOAD_STATUS: &str = "/api/download/status";
    /// File listing.
    pub const FILES: &str = "/api/files";
    /// Thumbnail bytes or generation request.
    pub const THUMBNAIL: &str = "/api/file/thumbnail";
    /// Thumbnail status check.
    pub const THUMBNAIL_STATUS: &str = "/api/file/thumbnail/status";
    /// Image preview bytes.
    pub const PREVIEW: &str = "/api/file/preview";
    /// Video stream bytes.
    pub const VIDEO: &str = "/api/file/video";
    /// Backend log lines.
    pub const LOGS: &str = "/api/logs";
}

/// Outcome of requesting a thumbnail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailFetch {
    /// The thumbnail exists; body bytes attached.
    Ready(Vec<u8>),
    /// The backend accepted a generation request (HTTP 202).
    Pending,
}

/// Raw media endpoints for inline previews.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Full-size image preview.
    Image,
    /// Video stream.
    Video,
}

impl MediaKind {
    /// Endpoint serving this media kind.
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Image => endpoints::PREVIEW,
            Self::Video => endpoints::VIDEO,
        }
    }
}

/// One method per backend endpoint. Implementations own encoding, base URL and
/// timeouts; callers only see typed payloads and [`crate::ApiError`].
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// `GET /api/config`.
    async fn fetch_config(&self) -> ApiResult<DownloadConfig>;

    /// `POST /api/config`.
    async fn save_config(&self, config: &DownloadConfig) -> ApiResult<ApiAck>;

    /// `POST /api/link/parse`.
    async fn parse_link(&self, link: &str) -> ApiResult<LinkParseResponse>;

    /// `POST /api/user/work-count`.
    async fn fetch_work_count(&self, sec_uid: &str) -> ApiResult<WorkCountResponse>;

    /// `POST /api/download/start`.
    async fn start_download(&self, request: &DownloadStartRequest) -> ApiResult<ApiAck>;

    /// `POST /api/download/stop`.
    async fn stop_download(&self) -> ApiResult<ApiAck>;

    /// `GET /api/download/status`.
    async fn download_status(&self) -> ApiResult<DownloadStatus>;

    /// `GET /api/files`.
    async fn list_files(&self) -> ApiResult<Vec<FileEntry>>;

    /// `GET /api/file/thumbnail?path=…`.
    async fn fetch_thumbnail(&self, path: &str) -> ApiResult<ThumbnailFetch>;

    /// `GET /api/file/thumbnail/status?path=…`.
    async fn thumbnail_status(&self, path: &str) -> ApiResult<ThumbnailStatusResponse>;

    /// `GET /api/file/preview?path=…` or `GET /api/file/video?path=…`.
    async fn fetch_media(&self, kind: MediaKind, path: &str) -> ApiResult<Vec<u8>>;

    /// `GET /api/logs`.
    async fn fetch_logs(&self) -> ApiResult<Vec<String>>;
}
