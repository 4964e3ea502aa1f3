//! Backend log lines and their display severity.

use serde::Serialize;
use tracing::warn;

use crate::api::DashboardApi;
use crate::error::{DashError, DashResult};

/// Display severity of a log line. Purely cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    /// Failure lines.
    Error,
    /// Warning lines.
    Warning,
    /// Success lines.
    Success,
    /// Informational lines.
    Info,
    /// Anything unmarked.
    Default,
}

const MARKERS: &[(LogSeverity, &[&str])] = &[
    (LogSeverity::Error, &["[ERROR]", "错误"]),
    (LogSeverity::Warning, &["[WARNING]", "警告"]),
    (LogSeverity::Success, &["[SUCCESS]", "成功"]),
    (LogSeverity::Info, &["[INFO]", "信息"]),
];

/// Classify `line` by the first marker it contains, checked in severity order.
#[must_use]
pub fn classify_log_line(line: &str) -> LogSeverity {
    MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|marker| line.contains(marker)))
        .map_or(LogSeverity::Default, |(severity, _)| *severity)
}

/// A trimmed log line with its severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    /// Line text without surrounding whitespace.
    pub text: String,
    /// Display severity.
    pub severity: LogSeverity,
}

impl From<&str> for LogLine {
    fn from(raw: &str) -> Self {
        let text = raw.trim().to_string();
        let severity = classify_log_line(&text);
        Self { text, severity }
    }
}

/// Fetch and classify the backend log, in backend order.
///
/// # Errors
///
/// Returns [`DashError::Api`] when the log cannot be fetched.
pub async fn fetch_log_lines(api: &dyn DashboardApi) -> DashResult<Vec<LogLine>> {
    let lines = api.fetch_logs().await.map_err(|err| {
        warn!(error = %err, detail = %err.detail(), "log fetch failed");
        DashError::api("fetch logs", err)
    })?;
    Ok(lines.iter().map(|line| LogLine::from(line.as_str())).collect())
}
