//! Subscriber installation for the `dydash` binary.
//!
//! Events go to stderr; stdout is reserved for rendered command output.
//! `RUST_LOG`, when set, replaces the configured level entirely.

use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Level used when neither `--log-level` nor `RUST_LOG` is given.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// HTTP internals stay at `warn` unless `RUST_LOG` asks otherwise.
const QUIET_TARGETS: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "rustls=warn"];

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Install the global subscriber described by `config`.
///
/// # Errors
///
/// Fails when `config.level` is not a valid filter directive or when a global
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig<'_>) -> Result<()> {
    let _ = BUILD_SHA.set(config.build_sha.to_string());
    let filter = env_filter(config.level)?;

    let (json, pretty) = match config.format {
        LogFormat::Json => (
            Some(fmt::layer().json().with_writer(std::io::stderr).with_target(false)),
            None,
        ),
        LogFormat::Pretty => (
            None,
            Some(fmt::layer().with_writer(std::io::stderr).with_target(false)),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

/// Build identifier recorded by [`init_logging`], `dev` before that.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

/// Root span of one CLI invocation.
#[must_use]
pub fn command_span(command: &'static str, trace_id: &str) -> Span {
    tracing::info_span!("command", command, trace_id, build = build_sha())
}

/// What [`init_logging`] installs.
#[derive(Debug, Clone, Copy)]
pub struct LoggingConfig<'a> {
    /// Filter directive such as `info` or `dydash_core=debug`.
    pub level: &'a str,
    /// Event encoding.
    pub format: LogFormat,
    /// Build identifier attached to every command span.
    pub build_sha: &'a str,
}

/// Event encoding on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Human-readable lines.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(format!("unknown log format '{other}' (expected json or pretty)")),
        }
    }
}

fn env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let mut directives = vec![level.trim()];
    directives.extend_from_slice(QUIET_TARGETS);
    EnvFilter::try_new(directives.join(","))
        .with_context(|| format!("invalid log level '{level}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_variants() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("Pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!(" text ".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn build_sha_is_never_empty() {
        assert!(!build_sha().is_empty());
    }

    #[test]
    fn level_directives_are_validated() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        assert!(env_filter("debug").is_ok());
        assert!(env_filter("dydash_core=trace").is_ok());
        assert!(env_filter("dydash_core=loud").is_err());
    }

    #[test]
    fn subscriber_installs_once() {
        let config = LoggingConfig {
            level: "info",
            format: LogFormat::Pretty,
            build_sha: "abc123",
        };
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
        assert_eq!(build_sha(), "abc123");
    }
}
