//! Scripted doubles shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dydash_api_models::{
    ApiAck, DownloadConfig, DownloadStartRequest, DownloadStatus, FileEntry, LinkParseResponse,
    ThumbnailStatusKind, ThumbnailStatusResponse, WorkCountResponse,
};

use crate::api::{DashboardApi, MediaKind, ThumbnailFetch, endpoints};
use crate::error::{ApiError, ApiResult};
use crate::notify::{Notifier, NotifyLevel};
use crate::scheduler::Scheduler;

pub(crate) fn transport_error(endpoint: &str) -> ApiError {
    ApiError::Transport {
        endpoint: endpoint.to_string(),
        detail: "connection refused".to_string(),
    }
}

pub(crate) fn ack(success: bool, message: Option<&str>) -> ApiAck {
    ApiAck {
        success,
        message: message.map(str::to_string),
    }
}

pub(crate) fn entry(path: &str, size: u64, modified: &str) -> FileEntry {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path).to_string();
    FileEntry {
        name,
        path: path.to_string(),
        size,
        modified: modified.to_string(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Scripted [`DashboardApi`]; every endpoint answers from its slot and
/// records the call.
pub(crate) struct FakeApi {
    pub(crate) config: Mutex<ApiResult<DownloadConfig>>,
    pub(crate) save_result: Mutex<ApiResult<ApiAck>>,
    pub(crate) saved: Mutex<Vec<DownloadConfig>>,
    pub(crate) parses: Mutex<HashMap<String, ApiResult<LinkParseResponse>>>,
    pub(crate) work_counts: Mutex<HashMap<String, ApiResult<WorkCountResponse>>>,
    pub(crate) start_result: Mutex<ApiResult<ApiAck>>,
    pub(crate) started: Mutex<Vec<DownloadStartRequest>>,
    pub(crate) stop_result: Mutex<ApiResult<ApiAck>>,
    pub(crate) statuses: Mutex<VecDeque<ApiResult<DownloadStatus>>>,
    pub(crate) files: Mutex<ApiResult<Vec<FileEntry>>>,
    pub(crate) thumbnail_statuses: Mutex<VecDeque<ApiResult<ThumbnailStatusKind>>>,
    pub(crate) thumbnail_status_fallback: Mutex<ApiResult<ThumbnailStatusKind>>,
    pub(crate) thumbnail_fetch: Mutex<ApiResult<ThumbnailFetch>>,
    pub(crate) logs: Mutex<ApiResult<Vec<String>>>,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            config: Mutex::new(Ok(DownloadConfig::default())),
            save_result: Mutex::new(Ok(ack(true, None))),
            saved: Mutex::new(Vec::new()),
            parses: Mutex::new(HashMap::new()),
            work_counts: Mutex::new(HashMap::new()),
            start_result: Mutex::new(Ok(ack(true, None))),
            started: Mutex::new(Vec::new()),
            stop_result: Mutex::new(Ok(ack(true, None))),
            statuses: Mutex::new(VecDeque::new()),
            files: Mutex::new(Ok(Vec::new())),
            thumbnail_statuses: Mutex::new(VecDeque::new()),
            thumbnail_status_fallback: Mutex::new(Ok(ThumbnailStatusKind::NotGenerated)),
            thumbnail_fetch: Mutex::new(Ok(ThumbnailFetch::Pending)),
            logs: Mutex::new(Ok(Vec::new())),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeApi {
    pub(crate) fn set<T>(slot: &Mutex<T>, value: T) {
        *lock(slot) = value;
    }

    pub(crate) fn script_parse(&self, link: &str, result: ApiResult<LinkParseResponse>) {
        lock(&self.parses).insert(link.to_string(), result);
    }

    pub(crate) fn script_work_count(&self, sec_uid: &str, result: ApiResult<WorkCountResponse>) {
        lock(&self.work_counts).insert(sec_uid.to_string(), result);
    }

    pub(crate) fn push_status(&self, status: ApiResult<DownloadStatus>) {
        lock(&self.statuses).push_back(status);
    }

    pub(crate) fn push_thumbnail_status(&self, status: ApiResult<ThumbnailStatusKind>) {
        lock(&self.thumbnail_statuses).push_back(status);
    }

    pub(crate) fn saved(&self) -> Vec<DownloadConfig> {
        lock(&self.saved).clone()
    }

    pub(crate) fn started(&self) -> Vec<DownloadStartRequest> {
        lock(&self.started).clone()
    }

    pub(crate) fn call_count(&self, endpoint: &str) -> usize {
        lock(&self.calls).iter().filter(|call| *call == endpoint).count()
    }

    fn record(&self, endpoint: &str) {
        lock(&self.calls).push(endpoint.to_string());
    }
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn fetch_config(&self) -> ApiResult<DownloadConfig> {
        self.record(endpoints::CONFIG);
        lock(&self.config).clone()
    }

    async fn save_config(&self, config: &DownloadConfig) -> ApiResult<ApiAck> {
        self.record(endpoints::CONFIG);
        lock(&self.saved).push(config.clone());
        lock(&self.save_result).clone()
    }

    async fn parse_link(&self, link: &str) -> ApiResult<LinkParseResponse> {
        self.record(endpoints::LINK_PARSE);
        lock(&self.parses)
            .get(link)
            .cloned()
            .unwrap_or_else(|| Err(transport_error(endpoints::LINK_PARSE)))
    }

    async fn fetch_work_count(&self, sec_uid: &str) -> ApiResult<WorkCountResponse> {
        self.record(endpoints::WORK_COUNT);
        lock(&self.work_counts)
            .get(sec_uid)
            .cloned()
            .unwrap_or_else(|| Err(transport_error(endpoints::WORK_COUNT)))
    }

    async fn start_download(&self, request: &DownloadStartRequest) -> ApiResult<ApiAck> {
        self.record(endpoints::DOWNLOAD_START);
        lock(&self.started).push(request.clone());
        lock(&self.start_result).clone()
    }

    async fn stop_download(&self) -> ApiResult<ApiAck> {
        self.record(endpoints::DOWNLOAD_STOP);
        lock(&self.stop_result).clone()
    }

    async fn download_status(&self) -> ApiResult<DownloadStatus> {
        self.record(endpoints::DOWNLOAD_STATUS);
        lock(&self.statuses)
            .pop_front()
            .unwrap_or_else(|| Ok(DownloadStatus::default()))
    }

    async fn list_files(&self) -> ApiResult<Vec<FileEntry>> {
        self.record(endpoints::FILES);
        lock(&self.files).clone()
    }

    async fn fetch_thumbnail(&self, _path: &str) -> ApiResult<ThumbnailFetch> {
        self.record(endpoints::THUMBNAIL);
        lock(&self.thumbnail_fetch).clone()
    }

    async fn thumbnail_status(&self, path: &str) -> ApiResult<ThumbnailStatusResponse> {
        self.record(endpoints::THUMBNAIL_STATUS);
        let next = lock(&self.thumbnail_statuses)
            .pop_front()
            .unwrap_or_else(|| lock(&self.thumbnail_status_fallback).clone());
        next.map(|status| ThumbnailStatusResponse {
            status,
            path: Some(path.to_string()),
            message: None,
        })
    }

    async fn fetch_media(&self, kind: MediaKind, _path: &str) -> ApiResult<Vec<u8>> {
        self.record(kind.endpoint());
        Ok(b"media".to_vec())
    }

    async fn fetch_logs(&self) -> ApiResult<Vec<String>> {
        self.record(endpoints::LOGS);
        lock(&self.logs).clone()
    }
}

/// Virtual clock: `sleep` advances time instantly and counts the call.
pub(crate) struct ManualScheduler {
    origin: Instant,
    offset: Mutex<Duration>,
    sleeps: AtomicUsize,
}

impl ManualScheduler {
    pub(crate) fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
            sleeps: AtomicUsize::new(0),
        }
    }

    pub(crate) fn advance(&self, by: Duration) {
        *lock(&self.offset) += by;
    }

    pub(crate) fn sleeps(&self) -> usize {
        self.sleeps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scheduler for ManualScheduler {
    fn now(&self) -> Instant {
        self.origin + *lock(&self.offset)
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
    }
}

/// Notifier that keeps everything it receives.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    entries: Mutex<Vec<(NotifyLevel, String)>>,
}

impl RecordingNotifier {
    pub(crate) fn entries(&self) -> Vec<(NotifyLevel, String)> {
        lock(&self.entries).clone()
    }

    pub(crate) fn levels(&self) -> Vec<NotifyLevel> {
        lock(&self.entries).iter().map(|(level, _)| *level).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        lock(&self.entries).push((level, message.to_string()));
    }
}
