//! Command handlers grouped by concern. Each handler builds the core
//! component it needs from the shared [`crate::client::AppContext`].

pub(crate) mod config;
pub(crate) mod download;
pub(crate) mod files;
pub(crate) mod links;
pub(crate) mod logs;
pub(crate) mod status;
