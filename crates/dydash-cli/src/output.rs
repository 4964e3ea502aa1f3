//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use dydash_api_models::{CookieSettings, DownloadConfig, DownloadJob, DownloadMode};
use dydash_core::catalog::{PageLink, PageWindow};
use dydash_core::status::CurrentItem;
use dydash_core::{
    FileStats, LinkRow, LinkTable, LogLine, LogSeverity, PageView, ProgressView, Resolution,
    StatusUpdate, ThumbnailState, Transition, WorkCount,
};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

pub(crate) fn render_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_config(config: &DownloadConfig, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => render_json(config)?,
        OutputFormat::Table => {
            println!("links: {}", config.link.len());
            for (index, link) in config.link.iter().enumerate() {
                println!("  {index:>3} {link}");
            }
            println!("path: {}", config.path);
            println!("modes: {}", join_modes(&config.mode));
            let counts = &config.number;
            println!(
                "limits: post {} / like {} / allmix {} / mix {} / music {}",
                counts.post, counts.like, counts.allmix, counts.mix, counts.music
            );
            let increase = &config.increase;
            let incremental: Vec<&str> = [
                ("post", increase.post),
                ("like", increase.like),
                ("allmix", increase.allmix),
                ("mix", increase.mix),
                ("music", increase.music),
            ]
            .into_iter()
            .filter_map(|(name, enabled)| enabled.then_some(name))
            .collect();
            println!("incremental: {}", join_or_none(&incremental));
            println!(
                "media: music {} / cover {} / avatar {} / json {}",
                on_off(config.music),
                on_off(config.cover),
                on_off(config.avatar),
                on_off(config.json)
            );
            println!("folder per work: {}", on_off(config.folderstyle));
            println!("database: {}", on_off(config.database));
            println!("threads: {}", config.thread);
            println!("cookies: {} of 5 set", cookies_set(&config.cookies));
        }
    }
    Ok(())
}

fn join_modes(modes: &[DownloadMode]) -> String {
    let names: Vec<&str> = modes.iter().map(|mode| mode.as_str()).collect();
    join_or_none(&names)
}

fn join_or_none(items: &[&str]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

const fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn cookies_set(cookies: &CookieSettings) -> usize {
    [
        &cookies.ms_token,
        &cookies.ttwid,
        &cookies.odin_tt,
        &cookies.passport_csrf_token,
        &cookies.sid_guard,
    ]
    .into_iter()
    .filter(|value| !value.trim().is_empty())
    .count()
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct LinkRowView {
    pub(crate) index: usize,
    pub(crate) link: String,
    pub(crate) selected: bool,
    pub(crate) state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) work_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) detail: Option<String>,
}

impl LinkRowView {
    pub(crate) fn from_row(index: usize, row: &LinkRow) -> Self {
        let mut view = Self {
            index,
            link: row.raw().to_string(),
            selected: row.is_selected(),
            state: resolution_label(row.resolution()),
            kind: None,
            name: None,
            external_id: None,
            work_count: None,
            detail: None,
        };
        match row.resolution() {
            Resolution::Resolved(resolved) => {
                view.kind = Some(resolved.kind.label());
                view.name = Some(resolved.display_name.clone());
                view.external_id.clone_from(&resolved.external_id);
                view.work_count = resolved.work_count.known();
                view.detail = match &resolved.work_count {
                    WorkCount::Failed(message) => Some(format!("count failed: {message}")),
                    WorkCount::NetworkError(detail) => Some(format!("count unavailable: {detail}")),
                    _ => None,
                };
            }
            Resolution::Failed { message } => view.detail = Some(message.clone()),
            Resolution::NetworkError { detail } => view.detail = Some(detail.clone()),
            Resolution::Skipped | Resolution::Pending | Resolution::Resolving => {}
        }
        view
    }
}

pub(crate) const fn resolution_label(resolution: &Resolution) -> &'static str {
    match resolution {
        Resolution::Skipped => "skipped",
        Resolution::Pending => "pending",
        Resolution::Resolving => "resolving",
        Resolution::Resolved(_) => "resolved",
        Resolution::Failed { .. } => "failed",
        Resolution::NetworkError { .. } => "network_error",
    }
}

pub(crate) fn render_link_table(table: &LinkTable, format: OutputFormat) -> CliResult<()> {
    let rows: Vec<LinkRowView> = table
        .rows()
        .iter()
        .enumerate()
        .map(|(index, row)| LinkRowView::from_row(index, row))
        .collect();
    match format {
        OutputFormat::Json => render_json(&rows)?,
        OutputFormat::Table => {
            println!(
                "{:>3} {:<3} {:<13} {:<10} {:>7} {:<20} LINK",
                "#", "SEL", "STATE", "KIND", "WORKS", "NAME"
            );
            for row in &rows {
                let works = row
                    .work_count
                    .map_or_else(|| "-".to_string(), |count| count.to_string());
                println!(
                    "{:>3} {:<3} {:<13} {:<10} {:>7} {:<20} {}",
                    row.index,
                    if row.selected { "x" } else { "" },
                    row.state,
                    row.kind.unwrap_or("-"),
                    works,
                    row.name.as_deref().unwrap_or("-"),
                    row.link
                );
                if let Some(detail) = &row.detail {
                    println!("    {detail}");
                }
            }
        }
    }
    Ok(())
}

pub(crate) fn render_file_page(page: &PageView<'_>, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => render_json(page)?,
        OutputFormat::Table => {
            println!(
                "{:<6} {:>10} {:<16} {:<20} PATH",
                "TYPE", "SIZE", "MODIFIED", "SOURCE"
            );
            for record in &page.items {
                let modified = record.modified_at.map_or_else(
                    || record.modified_raw.clone(),
                    |at| at.format("%Y-%m-%d %H:%M").to_string(),
                );
                println!(
                    "{:<6} {:>10} {:<16} {:<20} {}",
                    record.file_type.as_str(),
                    format_size(record.size_bytes),
                    modified,
                    record.source,
                    record.relative_path
                );
            }
            match page.showing {
                Some((first, last)) => println!(
                    "showing {first}-{last} of {} (page {}/{})",
                    page.visible_total, page.page, page.total_pages
                ),
                None => println!("no files match"),
            }
            let window = format_window(&page.window);
            if !window.is_empty() {
                println!("{window}");
            }
        }
    }
    Ok(())
}

/// Render the pagination control as `< 1 ... 4 [5] 6 ... 9 >`.
pub(crate) fn format_window(window: &PageWindow) -> String {
    let mut parts = Vec::with_capacity(window.links.len() + 2);
    if window.previous.is_some() {
        parts.push("<".to_string());
    }
    for link in &window.links {
        parts.push(match link {
            PageLink::Page {
                number,
                current: true,
            } => format!("[{number}]"),
            PageLink::Page { number, .. } => number.to_string(),
            PageLink::Ellipsis => "...".to_string(),
        });
    }
    if window.next.is_some() {
        parts.push(">".to_string());
    }
    parts.join(" ")
}

#[derive(Serialize)]
struct StatsView<'a> {
    stats: &'a FileStats,
    sources: &'a [String],
}

pub(crate) fn render_stats(
    stats: &FileStats,
    sources: &[String],
    format: OutputFormat,
) -> CliResult<()> {
    match format {
        OutputFormat::Json => render_json(&StatsView { stats, sources })?,
        OutputFormat::Table => {
            println!("{}", stats_line(stats));
            if !sources.is_empty() {
                println!("sources: {}", sources.join(", "));
            }
        }
    }
    Ok(())
}

pub(crate) fn stats_line(stats: &FileStats) -> String {
    format!(
        "files: {} total ({} video, {} image, {} audio, {} other)",
        stats.total, stats.video, stats.image, stats.audio, stats.other
    )
}

pub(crate) fn render_status_update(update: &StatusUpdate, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => render_json(update)?,
        OutputFormat::Table => {
            match update.transition {
                Some(Transition::Started) => println!("download started"),
                Some(Transition::Stopped) => println!("download finished"),
                None => {}
            }
            render_progress_table(&update.view);
        }
    }
    Ok(())
}

fn render_progress_table(view: &ProgressView) {
    if !view.panel_visible {
        println!("idle");
        return;
    }
    println!("[{}] {:>5.1}%  {}", progress_bar(view.percent, 30), view.percent, view.caption);
    println!(
        "downloaded {} / failed {} / remaining {}  speed {:.2}/s  eta {}",
        view.downloaded, view.failed, view.remaining, view.speed, view.eta
    );
    if let Some(link) = &view.current_link {
        println!("link: {link}");
    }
    if let Some(item) = &view.current_item {
        println!("now: {}", describe_item(item));
    }
    if !view.recent.is_empty() {
        let recent: Vec<String> = view.recent.iter().rev().map(describe_item).collect();
        println!("recent: {}", recent.join(", "));
    }
}

fn describe_item(item: &CurrentItem) -> String {
    item.file_type.map_or_else(
        || item.name.clone(),
        |file_type| format!("{} ({})", item.name, file_type.as_str()),
    )
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "#".repeat(filled), "-".repeat(width - filled))
}

pub(crate) fn render_job(job: &DownloadJob, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => render_json(job)?,
        OutputFormat::Table => {
            println!(
                "started {} links, about {} works",
                job.selected_link_data.len(),
                job.total_works
            );
            println!("{:>7} {:<20} LINK", "WORKS", "NAME");
            for selected in &job.selected_link_data {
                println!(
                    "{:>7} {:<20} {}",
                    selected.work_count, selected.nickname, selected.link
                );
            }
        }
    }
    Ok(())
}

pub(crate) fn render_logs(lines: &[LogLine], format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => render_json(lines)?,
        OutputFormat::Table => {
            for line in lines {
                println!("{:<8} {}", severity_label(line.severity), line.text);
            }
        }
    }
    Ok(())
}

pub(crate) const fn severity_label(severity: LogSeverity) -> &'static str {
    match severity {
        LogSeverity::Error => "error",
        LogSeverity::Warning => "warning",
        LogSeverity::Success => "success",
        LogSeverity::Info => "info",
        LogSeverity::Default => "",
    }
}

pub(crate) fn describe_thumbnail(state: ThumbnailState) -> String {
    match state {
        ThumbnailState::Unchecked => "not checked".to_string(),
        ThumbnailState::Checking => "checking".to_string(),
        ThumbnailState::Generating { polls: 0 } => "generating".to_string(),
        ThumbnailState::Generating { polls } => format!("generating (check {polls})"),
        ThumbnailState::Ready => "ready".to_string(),
        ThumbnailState::Error { reason } => format!("error: {}", reason.message()),
    }
}

/// Human-readable size with binary units, trailing zeros trimmed (`1.5 KB`).
#[must_use]
pub(crate) fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }
    let mut value = bytes_to_f64(bytes);
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} {}", UNITS[unit])
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}
