//! Per-video thumbnail state machine.
//!
//! `Unchecked → Checking → {Ready | Generating(n) | Error}`, and
//! `Generating(n) → {Ready | Error}` by polling. Terminal states never retry on
//! their own; a new resolver is the only way to try again.

use std::sync::Arc;
use std::time::Duration;

use dydash_api_models::ThumbnailStatusKind;
use serde::Serialize;
use tracing::{debug, warn};

use crate::api::{DashboardApi, ThumbnailFetch};
use crate::catalog::FileType;
use crate::error::ApiError;
use crate::scheduler::Scheduler;

/// Polling limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailSettings {
    /// Status requests issued after a generation request, at most.
    pub max_polls: u32,
    /// Delay before each status request.
    pub interval: Duration,
}

impl Default for ThumbnailSettings {
    fn default() -> Self {
        Self {
            max_polls: 30,
            interval: Duration::from_secs(1),
        }
    }
}

/// How a file card gets its picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailPlan {
    /// Videos go through [`ThumbnailResolver`].
    Resolve,
    /// Images load directly from the thumbnail endpoint.
    Direct,
    /// Everything else shows a type icon.
    Icon,
}

impl ThumbnailPlan {
    /// Plan for a file of `file_type`.
    #[must_use]
    pub const fn for_type(file_type: FileType) -> Self {
        match file_type {
            FileType::Video => Self::Resolve,
            FileType::Image => Self::Direct,
            FileType::Audio | FileType::Data | FileType::Other => Self::Icon,
        }
    }
}

/// Why a thumbnail could not be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailError {
    /// The video no longer exists.
    FileNotFound,
    /// The backend refused to generate a thumbnail.
    GenerationFailed,
    /// A status check or generation request never got an answer.
    RequestFailed,
    /// Polling hit its cap without the thumbnail becoming ready.
    Timeout,
    /// A status request failed while polling.
    PollError,
    /// The backend reported a status this client does not act on.
    Unexpected(ThumbnailStatusKind),
}

impl ThumbnailError {
    /// Inline message for the file card.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::FileNotFound => "file not found",
            Self::GenerationFailed => "generation failed",
            Self::RequestFailed => "request failed",
            Self::Timeout => "generation timed out",
            Self::PollError => "status check failed",
            Self::Unexpected(_) => "unknown error",
        }
    }
}

/// Thumbnail state of one video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ThumbnailState {
    /// Nothing requested yet.
    Unchecked,
    /// Initial status check in flight.
    Checking,
    /// Generation requested; `polls` status checks issued so far.
    Generating {
        /// Status checks issued since generation was requested.
        polls: u32,
    },
    /// Thumbnail available.
    Ready,
    /// Terminal failure.
    Error {
        /// Failure reason.
        reason: ThumbnailError,
    },
}

impl ThumbnailState {
    /// Whether the machine has stopped.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Error { .. })
    }
}

/// Drives one video's thumbnail to a terminal state.
pub struct ThumbnailResolver {
    api: Arc<dyn DashboardApi>,
    scheduler: Arc<dyn Scheduler>,
    settings: ThumbnailSettings,
    path: String,
    state: ThumbnailState,
}

impl ThumbnailResolver {
    /// Resolver for the video at `path` (as listed by the backend).
    #[must_use]
    pub fn new(
        api: Arc<dyn DashboardApi>,
        scheduler: Arc<dyn Scheduler>,
        settings: ThumbnailSettings,
        path: impl Into<String>,
    ) -> Self {
        Self {
            api,
            scheduler,
            settings,
            path: path.into(),
            state: ThumbnailState::Unchecked,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ThumbnailState {
        self.state
    }

    /// Video path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run to a terminal state, reporting every transition to `observer`.
    /// Calling it again after a terminal state returns that state unchanged.
    pub async fn resolve<F>(&mut self, mut observer: F) -> ThumbnailState
    where
        F: FnMut(ThumbnailState) + Send,
    {
        if self.state.is_terminal() {
            return self.state;
        }
        self.enter(ThumbnailState::Checking, &mut observer);
        let status = match self.api.thumbnail_status(&self.path).await {
            Ok(response) => response.status,
            Err(err) => {
                return self.fail(ThumbnailError::RequestFailed, Some(&err), &mut observer);
            }
        };
        match status {
            ThumbnailStatusKind::Ready => self.enter(ThumbnailState::Ready, &mut observer),
            ThumbnailStatusKind::NotGenerated | ThumbnailStatusKind::Outdated => {
                self.generate(&mut observer).await
            }
            ThumbnailStatusKind::FileNotFound => {
                self.fail(ThumbnailError::FileNotFound, None, &mut observer)
            }
            other => self.fail(ThumbnailError::Unexpected(other), None, &mut observer),
        }
    }

    async fn generate<F>(&mut self, observer: &mut F) -> ThumbnailState
    where
        F: FnMut(ThumbnailState) + Send,
    {
        self.enter(ThumbnailState::Generating { polls: 0 }, observer);
        match self.api.fetch_thumbnail(&self.path).await {
            Ok(ThumbnailFetch::Ready(_)) => self.enter(ThumbnailState::Ready, observer),
            Ok(ThumbnailFetch::Pending) => self.poll(observer).await,
            Err(err @ ApiError::Status { .. }) => {
                self.fail(ThumbnailError::GenerationFailed, Some(&err), observer)
            }
            Err(err) => self.fail(ThumbnailError::RequestFailed, Some(&err), observer),
        }
    }

    async fn poll<F>(&mut self, observer: &mut F) -> ThumbnailState
    where
        F: FnMut(ThumbnailState) + Send,
    {
        for polls in 1..=self.settings.max_polls {
            self.scheduler.sleep(self.settings.interval).await;
            match self.api.thumbnail_status(&self.path).await {
                Ok(response) if response.status == ThumbnailStatusKind::Ready => {
                    return self.enter(ThumbnailState::Ready, observer);
                }
                Ok(_) => {
                    self.enter(ThumbnailState::Generating { polls }, observer);
                }
                Err(err) => return self.fail(ThumbnailError::PollError, Some(&err), observer),
            }
        }
        self.fail(ThumbnailError::Timeout, None, observer)
    }

    fn enter<F>(&mut self, next: ThumbnailState, observer: &mut F) -> ThumbnailState
    where
        F: FnMut(ThumbnailState),
    {
        debug!(path = %self.path, from = ?self.state, to = ?next, "thumbnail transition");
        self.state = next;
        observer(next);
        next
    }

    fn fail<F>(
        &mut self,
        reason: ThumbnailError,
        cause: Option<&ApiError>,
        observer: &mut F,
    ) -> ThumbnailState
    where
        F: FnMut(ThumbnailState),
    {
        match cause {
            Some(err) => warn!(
                path = %self.path,
                reason = reason.message(),
                error = %err,
                detail = %err.detail(),
                "thumbnail failed"
            ),
            None => warn!(path = %self.path, reason = reason.message(), "thumbnail failed"),
        }
        self.enter(ThumbnailState::Error { reason }, observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoints;
    use crate::testing::{FakeApi, ManualScheduler, transport_error};

    fn resolver(api: &Arc<FakeApi>, scheduler: &Arc<ManualScheduler>) -> ThumbnailResolver {
        ThumbnailResolver::new(
            api.clone(),
            scheduler.clone(),
            ThumbnailSettings::default(),
            "user_a/clip.mp4",
        )
    }

    #[tokio::test]
    async fn ready_status_short_circuits() {
        let api = Arc::new(FakeApi::default());
        api.push_thumbnail_status(Ok(ThumbnailStatusKind::Ready));
        let scheduler = Arc::new(ManualScheduler::new());
        let mut states = Vec::new();
        let end = resolver(&api, &scheduler).resolve(|state| states.push(state)).await;
        assert_eq!(end, ThumbnailState::Ready);
        assert_eq!(states, vec![ThumbnailState::Checking, ThumbnailState::Ready]);
        assert_eq!(api.call_count(endpoints::THUMBNAIL), 0);
    }

    #[tokio::test]
    async fn outdated_thumbnail_is_regenerated_and_polled() {
        let api = Arc::new(FakeApi::default());
        api.push_thumbnail_status(Ok(ThumbnailStatusKind::Outdated));
        api.push_thumbnail_status(Ok(ThumbnailStatusKind::NotGenerated));
        api.push_thumbnail_status(Ok(ThumbnailStatusKind::Ready));
        let scheduler = Arc::new(ManualScheduler::new());
        let mut states = Vec::new();
        let end = resolver(&api, &scheduler).resolve(|state| states.push(state)).await;
        assert_eq!(end, ThumbnailState::Ready);
        assert_eq!(
            states,
            vec![
                ThumbnailState::Checking,
                ThumbnailState::Generating { polls: 0 },
                ThumbnailState::Generating { polls: 1 },
                ThumbnailState::Ready
            ]
        );
        assert_eq!(scheduler.sleeps(), 2);
    }

    #[tokio::test]
    async fn polling_stops_at_cap_with_timeout() {
        let api = Arc::new(FakeApi::default());
        FakeApi::set(
            &api.thumbnail_status_fallback,
            Ok(ThumbnailStatusKind::NotGenerated),
        );
        let scheduler = Arc::new(ManualScheduler::new());
        let mut resolver = resolver(&api, &scheduler);
        let end = resolver.resolve(|_| {}).await;

        assert_eq!(
            end,
            ThumbnailState::Error {
                reason: ThumbnailError::Timeout
            }
        );
        assert_eq!(api.call_count(endpoints::THUMBNAIL_STATUS), 1 + 30);
        assert_eq!(api.call_count(endpoints::THUMBNAIL), 1);
        assert_eq!(scheduler.sleeps(), 30);

        assert_eq!(resolver.resolve(|_| {}).await, end);
        assert_eq!(api.call_count(endpoints::THUMBNAIL_STATUS), 31);
    }

    #[tokio::test]
    async fn failures_map_to_distinct_reasons() {
        let cases = [
            (
                vec![Ok(ThumbnailStatusKind::FileNotFound)],
                Ok(ThumbnailFetch::Pending),
                ThumbnailError::FileNotFound,
            ),
            (
                vec![Ok(ThumbnailStatusKind::NotVideo)],
                Ok(ThumbnailFetch::Pending),
                ThumbnailError::Unexpected(ThumbnailStatusKind::NotVideo),
            ),
            (
                vec![Err(transport_error(endpoints::THUMBNAIL_STATUS))],
                Ok(ThumbnailFetch::Pending),
                ThumbnailError::RequestFailed,
            ),
            (
                vec![Ok(ThumbnailStatusKind::NotGenerated)],
                Err(ApiError::Status {
                    endpoint: endpoints::THUMBNAIL.into(),
                    status: 500,
                    body: String::new(),
                }),
                ThumbnailError::GenerationFailed,
            ),
            (
                vec![Ok(ThumbnailStatusKind::NotGenerated)],
                Err(transport_error(endpoints::THUMBNAIL)),
                ThumbnailError::RequestFailed,
            ),
            (
                vec![
                    Ok(ThumbnailStatusKind::NotGenerated),
                    Err(transport_error(endpoints::THUMBNAIL_STATUS)),
                ],
                Ok(ThumbnailFetch::Pending),
                ThumbnailError::PollError,
            ),
        ];
        for (statuses, fetch, expected) in cases {
            let api = Arc::new(FakeApi::default());
            for status in statuses {
                api.push_thumbnail_status(status);
            }
            FakeApi::set(&api.thumbnail_fetch, fetch);
            let scheduler = Arc::new(ManualScheduler::new());
            let end = resolver(&api, &scheduler).resolve(|_| {}).await;
            assert_eq!(end, ThumbnailState::Error { reason: expected });
        }
    }

    #[tokio::test]
    async fn immediate_bytes_mean_ready_without_polling() {
        let api = Arc::new(FakeApi::default());
        api.push_thumbnail_status(Ok(ThumbnailStatusKind::NotGenerated));
        FakeApi::set(&api.thumbnail_fetch, Ok(ThumbnailFetch::Ready(vec![0xFF, 0xD8])));
        let scheduler = Arc::new(ManualScheduler::new());
        let end = resolver(&api, &scheduler).resolve(|_| {}).await;
        assert_eq!(end, ThumbnailState::Ready);
        assert_eq!(scheduler.sleeps(), 0);
    }

    #[test]
    fn plans_by_type() {
        assert_eq!(ThumbnailPlan::for_type(FileType::Video), ThumbnailPlan::Resolve);
        assert_eq!(ThumbnailPlan::for_type(FileType::Image), ThumbnailPlan::Direct);
        assert_eq!(ThumbnailPlan::for_type(FileType::Audio), ThumbnailPlan::Icon);
        assert_eq!(ThumbnailError::Timeout.message(), "generation timed out");
    }
}
