//! # Design
//!
//! - Keep transport failures separate from dashboard-level rejections so callers
//!   can tell "the backend said no" apart from "the backend never answered".
//! - Messages stay constant; context travels in fields.

use thiserror::Error;

/// Result type for transport calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for dashboard operations.
pub type DashResult<T> = Result<T, DashError>;

/// Failures raised by a [`crate::DashboardApi`] implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("api transport failure")]
    Transport {
        /// Endpoint path that was requested.
        endpoint: String,
        /// Transport-level detail.
        detail: String,
    },
    /// A response arrived but its body could not be decoded.
    #[error("api decode failure")]
    Decode {
        /// Endpoint path that was requested.
        endpoint: String,
        /// Decoder detail.
        detail: String,
    },
    /// The backend answered with a non-success HTTP status.
    #[error("api status failure")]
    Status {
        /// Endpoint path that was requested.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },
}

impl ApiError {
    /// Endpoint the failing request targeted.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Decode { endpoint, .. }
            | Self::Status { endpoint, .. } => endpoint,
        }
    }

    /// Human-readable detail for notifications.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Transport { detail, .. } | Self::Decode { detail, .. } => detail.clone(),
            Self::Status { status, body, .. } if body.is_empty() => format!("HTTP {status}"),
            Self::Status { status, body, .. } => format!("HTTP {status}: {body}"),
        }
    }

    /// Whether the failure happened before any response was received.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Errors surfaced by dashboard components.
#[derive(Debug, Error)]
pub enum DashError {
    /// The underlying API call failed.
    #[error("dashboard api failure")]
    Api {
        /// Operation that issued the call.
        operation: &'static str,
        /// Transport error.
        #[source]
        source: ApiError,
    },
    /// The backend answered but refused the request.
    #[error("dashboard request rejected")]
    Rejected {
        /// Operation that was rejected.
        operation: &'static str,
        /// Backend-provided message.
        message: String,
    },
    /// Local validation refused the input before any request was made.
    #[error("dashboard invalid input")]
    Validation {
        /// Field or argument that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
    },
    /// The requested operation does not apply to the target.
    #[error("dashboard unsupported operation")]
    Unsupported {
        /// Operation that was requested.
        operation: &'static str,
        /// Target the operation was requested for.
        target: String,
    },
}

impl DashError {
    pub(crate) const fn api(operation: &'static str, source: ApiError) -> Self {
        Self::Api { operation, source }
    }

    /// Short message suitable for a notification or a CLI error line.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { operation, source } => format!("{operation} failed: {}", source.detail()),
            Self::Rejected { operation, message } => format!("{operation} rejected: {message}"),
            Self::Validation { field, reason } => format!("{field}: {reason}"),
            Self::Unsupported { operation, target } => {
                format!("{operation} is not supported for {target}")
            }
        }
    }
}
