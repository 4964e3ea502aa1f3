//! HTTP transport, CLI error type, and the stderr notification sink.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use dydash_api_models::{
    ApiAck, DownloadConfig, DownloadStartRequest, DownloadStatus, FileEntry, LinkParseRequest,
    LinkParseResponse, ThumbnailStatusResponse, WorkCountRequest, WorkCountResponse,
};
use dydash_core::api::endpoints;
use dydash_core::{
    ApiError, ApiResult, DashError, DashboardApi, MediaKind, Notifier, NotifyLevel, Scheduler,
    ThumbnailFetch, TokioScheduler,
};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<DashError> for CliError {
    fn from(err: DashError) -> Self {
        let message = err.user_message();
        match err {
            DashError::Validation { .. } | DashError::Unsupported { .. } => {
                Self::Validation(message)
            }
            DashError::Api { .. } | DashError::Rejected { .. } => Self::Failure(anyhow!(message)),
        }
    }
}

/// Shared handles passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) api: Arc<dyn DashboardApi>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl AppContext {
    pub(crate) fn new(api: HttpDashboardApi) -> Self {
        Self {
            api: Arc::new(api),
            notifier: Arc::new(StderrNotifier),
            scheduler: Arc::new(TokioScheduler),
        }
    }
}

/// Prints notifications to stderr so stdout stays machine readable.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        eprintln!("{}: {message}", level.label());
    }
}

/// [`DashboardApi`] over `reqwest`.
#[derive(Clone)]
pub(crate) struct HttpDashboardApi {
    client: Client,
    base_url: Url,
}

impl HttpDashboardApi {
    pub(crate) const fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Build a client with the invocation's request id attached to every call.
    pub(crate) fn connect(base_url: Url, timeout: Duration, trace_id: &str) -> CliResult<Self> {
        let mut default_headers = HeaderMap::new();
        let request_id = HeaderValue::from_str(trace_id).map_err(|_| {
            CliError::failure(anyhow!("trace identifier contains invalid characters"))
        })?;
        default_headers.insert(HEADER_REQUEST_ID, request_id);

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()
            .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))?;
        Ok(Self::new(client, base_url))
    }

    fn url(&self, endpoint: &str) -> ApiResult<Url> {
        self.base_url
            .join(endpoint)
            .map_err(|err| ApiError::Transport {
                endpoint: endpoint.to_string(),
                detail: format!("invalid base URL: {err}"),
            })
    }

    fn url_for_path(&self, endpoint: &str, path: &str) -> ApiResult<Url> {
        let mut url = self.url(endpoint)?;
        url.query_pairs_mut().append_pair("path", path);
        Ok(url)
    }
}

async fn send(endpoint: &str, request: RequestBuilder) -> ApiResult<Response> {
    debug!(endpoint, "sending request");
    request.send().await.map_err(|err| transport_error(endpoint, &err))
}

fn transport_error(endpoint: &str, err: &reqwest::Error) -> ApiError {
    ApiError::Transport {
        endpoint: endpoint.to_string(),
        detail: err.to_string(),
    }
}

fn status_error(endpoint: &str, status: StatusCode, body: &[u8]) -> ApiError {
    ApiError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body: String::from_utf8_lossy(body).trim().to_string(),
    }
}

fn decode_error(endpoint: &str, err: &serde_json::Error) -> ApiError {
    ApiError::Decode {
        endpoint: endpoint.to_string(),
        detail: err.to_string(),
    }
}

async fn read_body(endpoint: &str, response: Response) -> ApiResult<(StatusCode, Vec<u8>)> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|err| transport_error(endpoint, &err))?;
    Ok((status, body.to_vec()))
}

async fn decode_json<T: DeserializeOwned>(endpoint: &str, response: Response) -> ApiResult<T> {
    let (status, body) = read_body(endpoint, response).await?;
    if !status.is_success() {
        return Err(status_error(endpoint, status, &body));
    }
    serde_json::from_slice(&body).map_err(|err| decode_error(endpoint, &err))
}

/// Decode a `{success, message?}` body whatever the HTTP status. The backend
/// reports refusals in the body, sometimes alongside a 4xx/5xx code.
async fn decode_outcome<T: DeserializeOwned>(endpoint: &str, response: Response) -> ApiResult<T> {
    let (status, body) = read_body(endpoint, response).await?;
    match serde_json::from_slice(&body) {
        Ok(outcome) => Ok(outcome),
        Err(_) if !status.is_success() => Err(status_error(endpoint, status, &body)),
        Err(err) => Err(decode_error(endpoint, &err)),
    }
}

async fn read_bytes(endpoint: &str, response: Response) -> ApiResult<Vec<u8>> {
    let (status, body) = read_body(endpoint, response).await?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(status_error(endpoint, status, &body))
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn fetch_config(&self) -> ApiResult<DownloadConfig> {
        let endpoint = endpoints::CONFIG;
        let response = send(endpoint, self.client.get(self.url(endpoint)?)).await?;
        decode_json(endpoint, response).await
    }

    async fn save_config(&self, config: &DownloadConfig) -> ApiResult<ApiAck> {
        let endpoint = endpoints::CONFIG;
        let request = self.client.post(self.url(endpoint)?).json(config);
        decode_outcome(endpoint, send(endpoint, request).await?).await
    }

    async fn parse_link(&self, link: &str) -> ApiResult<LinkParseResponse> {
        let endpoint = endpoints::LINK_PARSE;
        let body = LinkParseRequest {
            link: link.to_string(),
        };
        let request = self.client.post(self.url(endpoint)?).json(&body);
        decode_outcome(endpoint, send(endpoint, request).await?).await
    }

    async fn fetch_work_count(&self, sec_uid: &str) -> ApiResult<WorkCountResponse> {
        let endpoint = endpoints::WORK_COUNT;
        let body = WorkCountRequest {
            sec_uid: sec_uid.to_string(),
        };
        let request = self.client.post(self.url(endpoint)?).json(&body);
        decode_outcome(endpoint, send(endpoint, request).await?).await
    }

    async fn start_download(&self, request: &DownloadStartRequest) -> ApiResult<ApiAck> {
        let endpoint = endpoints::DOWNLOAD_START;
        let request = self.client.post(self.url(endpoint)?).json(request);
        decode_outcome(endpoint, send(endpoint, request).await?).await
    }

    async fn stop_download(&self) -> ApiResult<ApiAck> {
        let endpoint = endpoints::DOWNLOAD_STOP;
        let request = self.client.post(self.url(endpoint)?);
        decode_outcome(endpoint, send(endpoint, request).await?).await
    }

    async fn download_status(&self) -> ApiResult<DownloadStatus> {
        let endpoint = endpoints::DOWNLOAD_STATUS;
        let response = send(endpoint, self.client.get(self.url(endpoint)?)).await?;
        decode_json(endpoint, response).await
    }

    async fn list_files(&self) -> ApiResult<Vec<FileEntry>> {
        let endpoint = endpoints::FILES;
        let response = send(endpoint, self.client.get(self.url(endpoint)?)).await?;
        decode_json(endpoint, response).await
    }

    async fn fetch_thumbnail(&self, path: &str) -> ApiResult<ThumbnailFetch> {
        let endpoint = endpoints::THUMBNAIL;
        let url = self.url_for_path(endpoint, path)?;
        let response = send(endpoint, self.client.get(url)).await?;
        if response.status() == StatusCode::ACCEPTED {
            return Ok(ThumbnailFetch::Pending);
        }
        read_bytes(endpoint, response).await.map(ThumbnailFetch::Ready)
    }

    async fn thumbnail_status(&self, path: &str) -> ApiResult<ThumbnailStatusResponse> {
        let endpoint = endpoints::THUMBNAIL_STATUS;
        let url = self.url_for_path(endpoint, path)?;
        decode_json(endpoint, send(endpoint, self.client.get(url)).await?).await
    }

    async fn fetch_media(&self, kind: MediaKind, path: &str) -> ApiResult<Vec<u8>> {
        let endpoint = kind.endpoint();
        let url = self.url_for_path(endpoint, path)?;
        read_bytes(endpoint, send(endpoint, self.client.get(url)).await?).await
    }

    async fn fetch_logs(&self) -> ApiResult<Vec<String>> {
        let endpoint = endpoints::LOGS;
        let response = send(endpoint, self.client.get(self.url(endpoint)?)).await?;
        decode_json(endpoint, response).await
    }
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}


#[cfg(test)]
mod tests {
    use super::test_support::api_for;
    use super::*;
    use anyhow::Result;
    use dydash_api_models::{LinkType, ThumbnailStatusKind};
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn connect_attaches_request_id() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/logs")
                .header(HEADER_REQUEST_ID, "trace-1");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!(["[INFO] ready"]));
        });

        let base_url = parse_url(&server.base_url()).map_err(|err| anyhow!(err))?;
        let api = HttpDashboardApi::connect(base_url, Duration::from_secs(5), "trace-1")
            .map_err(|err| anyhow!(err.display_message()))?;
        let lines = api.fetch_logs().await?;
        assert_eq!(lines, vec!["[INFO] ready".to_string()]);
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn refusal_bodies_decode_despite_error_status() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/download/stop");
            then.status(400)
                .header("content-type", "application/json")
                .json_body(json!({"success": false, "message": "nothing running"}));
        });

        let ack = api_for(&server)?.stop_download().await?;
        assert!(!ack.success);
        assert_eq!(ack.message.as_deref(), Some("nothing running"));
        Ok(())
    }

    #[tokio::test]
    async fn unparseable_error_bodies_become_status_errors() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/files");
            then.status(500).body("backend exploded");
        });

        let err = api_for(&server)?
            .list_files()
            .await
            .err()
            .ok_or_else(|| anyhow!("listing should fail"))?;
        assert_eq!(
            err,
            ApiError::Status {
                endpoint: "/api/files".into(),
                status: 500,
                body: "backend exploded".into(),
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn malformed_success_bodies_are_decode_errors() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/download/status");
            then.status(200).body("not json");
        });

        let err = api_for(&server)?
            .download_status()
            .await
            .err()
            .ok_or_else(|| anyhow!("status should fail"))?;
        assert!(matches!(err, ApiError::Decode { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn link_requests_send_their_payloads() -> Result<()> {
        let server = MockServer::start_async().await;
        let parse = server.mock(|when, then| {
            when.method(POST)
                .path("/api/link/parse")
                .json_body(json!({"link": "https://v.douyin.com/abc"}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "success": true,
                    "nickname": "alice",
                    "link_type": "user",
                    "sec_uid": "MS4wLjABAAAA"
                }));
        });
        let count = server.mock(|when, then| {
            when.method(POST)
                .path("/api/user/work-count")
                .json_body(json!({"sec_uid": "MS4wLjABAAAA"}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true, "work_count": 42}));
        });

        let api = api_for(&server)?;
        let parsed = api.parse_link("https://v.douyin.com/abc").await?;
        assert_eq!(parsed.link_type, Some(LinkType::User));
        let counted = api.fetch_work_count("MS4wLjABAAAA").await?;
        assert_eq!(counted.work_count, Some(42));
        parse.assert();
        count.assert();
        Ok(())
    }

    #[tokio::test]
    async fn thumbnail_fetch_distinguishes_pending_from_ready() -> Result<()> {
        let server = MockServer::start_async().await;
        let pending = server.mock(|when, then| {
            when.method(GET)
                .path("/api/file/thumbnail")
                .query_param("path", "user_a/clip one.mp4");
            then.status(202);
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/file/thumbnail")
                .query_param("path", "user_a/done.mp4");
            then.status(200).body("jpeg-bytes");
        });

        let api = api_for(&server)?;
        assert_eq!(
            api.fetch_thumbnail("user_a/clip one.mp4").await?,
            ThumbnailFetch::Pending
        );
        assert_eq!(
            api.fetch_thumbnail("user_a/done.mp4").await?,
            ThumbnailFetch::Ready(b"jpeg-bytes".to_vec())
        );
        pending.assert();
        Ok(())
    }

    #[tokio::test]
    async fn thumbnail_status_and_media_use_path_query() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/file/thumbnail/status")
                .query_param("path", "user_a/clip.mp4");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"status": "outdated"}));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/file/preview")
                .query_param("path", "user_a/cover.jpg");
            then.status(200).body("png");
        });

        let api = api_for(&server)?;
        let status = api.thumbnail_status("user_a/clip.mp4").await?;
        assert_eq!(status.status, ThumbnailStatusKind::Outdated);
        let bytes = api.fetch_media(MediaKind::Image, "user_a/cover.jpg").await?;
        assert_eq!(bytes, b"png".to_vec());
        Ok(())
    }

    #[test]
    fn endpoint_urls_replace_base_path_and_encode_file_paths() -> Result<()> {
        assert!(parse_url("not a url").is_err());

        let base = parse_url("http://127.0.0.1:5000/dashboard/").map_err(|err| anyhow!(err))?;
        let api = HttpDashboardApi::new(Client::new(), base);
        assert_eq!(
            api.url(endpoints::CONFIG)?.as_str(),
            "http://127.0.0.1:5000/api/config"
        );
        let url = api.url_for_path(endpoints::VIDEO, "用户 a/clip 1.mp4")?;
        assert_eq!(url.path(), "/api/file/video");
        assert_eq!(
            url.query_pairs().next().map(|(key, value)| (key.into_owned(), value.into_owned())),
            Some(("path".to_string(), "用户 a/clip 1.mp4".to_string()))
        );
        Ok(())
    }

    #[test]
    fn dashboard_errors_map_to_exit_codes() {
        let validation = CliError::from(DashError::Validation {
            field: "link",
            reason: "link already exists",
        });
        assert_eq!(validation.exit_code(), 2);
        assert_eq!(validation.display_message(), "link: link already exists");

        let rejected = CliError::from(DashError::Rejected {
            operation: "start download",
            message: "busy".into(),
        });
        assert_eq!(rejected.exit_code(), 3);
        assert_eq!(
            rejected.display_message(),
            "start download rejected: busy"
        );
    }
}
