#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
//! Logging primitives shared across the dydash workspace.
//!
//! The CLI installs the subscriber once at start-up; library crates only emit
//! `tracing` events and never configure output themselves.

mod init;

pub use init::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, command_span, init_logging,
};
