//! User-facing notifications.
//!
//! Components report outcomes of user-initiated actions through a [`Notifier`]
//! instead of returning them to a UI layer directly.

use tracing::{error, info, warn};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyLevel {
    /// Neutral information.
    Info,
    /// An action completed.
    Success,
    /// An action was refused or partially applied.
    Warning,
    /// An action failed.
    Error,
}

impl NotifyLevel {
    /// Lowercase label used in rendered output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Sink for user-facing notifications.
pub trait Notifier: Send + Sync {
    /// Deliver one notification.
    fn notify(&self, level: NotifyLevel, message: &str);
}

/// Notifier that forwards to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info | NotifyLevel::Success => {
                info!(level = level.label(), "{message}");
            }
            NotifyLevel::Warning => warn!("{message}"),
            NotifyLevel::Error => error!("{message}"),
        }
    }
}
