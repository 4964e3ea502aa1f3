//! File catalog: the full listing plus a filtered, sorted, paginated view.
//!
//! The visible subset is always recomputed from the full listing; it is never
//! narrowed incrementally from a previous visible subset.

mod paging;
mod record;

use std::collections::BTreeSet;
use std::str::FromStr;

use dydash_api_models::FileEntry;
use serde::Serialize;
use tracing::{debug, warn};

use crate::api::{DashboardApi, MediaKind};
use crate::error::{DashError, DashResult};

pub use paging::{
    DEFAULT_PAGE_SIZE, DEFAULT_VISIBLE_PAGES, PageLink, PageWindow, page_bounds, page_count,
    page_window,
};
pub use record::{FileRecord, FileType, UNKNOWN_SOURCE, derive_source, parse_modified};

/// Sort order of the visible subset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Newest first.
    #[default]
    DateDesc,
    /// Oldest first.
    DateAsc,
    /// Name, A to Z.
    NameAsc,
    /// Name, Z to A.
    NameDesc,
    /// Largest first.
    SizeDesc,
}

impl SortKey {
    /// Label accepted by [`SortKey::from_str`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DateDesc => "date-desc",
            Self::DateAsc => "date-asc",
            Self::NameAsc => "name-asc",
            Self::NameDesc => "name-desc",
            Self::SizeDesc => "size-desc",
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "date-desc" => Ok(Self::DateDesc),
            "date-asc" => Ok(Self::DateAsc),
            "name-asc" => Ok(Self::NameAsc),
            "name-desc" => Ok(Self::NameDesc),
            "size-desc" => Ok(Self::SizeDesc),
            other => Err(format!("unsupported sort key '{other}'")),
        }
    }
}

/// Filter controls. `None` filters mean "all".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Only files of this type.
    pub type_filter: Option<FileType>,
    /// Only files from this source.
    pub source_filter: Option<String>,
    /// Sort order.
    pub sort_key: SortKey,
    /// Case-insensitive substring of the file name; empty matches everything.
    pub search_text: String,
}

impl FilterState {
    fn matches(&self, record: &FileRecord, needle: &str) -> bool {
        self.type_filter
            .is_none_or(|wanted| record.file_type == wanted)
            && self
                .source_filter
                .as_deref()
                .is_none_or(|wanted| record.source == wanted)
            && (needle.is_empty() || record.name.to_lowercase().contains(needle))
    }
}

/// Indices into `all` that pass `state`, in `state.sort_key` order.
///
/// Sorting is stable, so records with equal keys keep their listing order.
#[must_use]
pub fn filter_and_sort(all: &[FileRecord], state: &FilterState) -> Vec<usize> {
    let needle = state.search_text.to_lowercase();
    let mut visible: Vec<usize> = all
        .iter()
        .enumerate()
        .filter(|(_, record)| state.matches(record, &needle))
        .map(|(index, _)| index)
        .collect();
    match state.sort_key {
        SortKey::DateDesc => visible.sort_by(|a, b| all[*b].modified_at.cmp(&all[*a].modified_at)),
        SortKey::DateAsc => visible.sort_by(|a, b| all[*a].modified_at.cmp(&all[*b].modified_at)),
        SortKey::NameAsc => visible.sort_by(|a, b| all[*a].name.cmp(&all[*b].name)),
        SortKey::NameDesc => visible.sort_by(|a, b| all[*b].name.cmp(&all[*a].name)),
        SortKey::SizeDesc => visible.sort_by(|a, b| all[*b].size_bytes.cmp(&all[*a].size_bytes)),
    }
    visible
}

/// Counts by type over the full listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileStats {
    /// Every file.
    pub total: usize,
    /// Videos.
    pub video: usize,
    /// Images.
    pub image: usize,
    /// Audio tracks.
    pub audio: usize,
    /// Everything that is not video, image or audio.
    pub other: usize,
}

/// Media endpoint and path for an inline preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTarget {
    /// Endpoint family.
    pub kind: MediaKind,
    /// Path with `/` separators.
    pub path: String,
}

/// Resolve how `record` can be previewed inline.
///
/// # Errors
///
/// Returns [`DashError::Unsupported`] for anything other than videos and
/// images, and for files under a `temp` directory.
pub fn preview_target(record: &FileRecord) -> DashResult<PreviewTarget> {
    let path = record.normalized_path();
    let in_temp = path
        .split('/')
        .rev()
        .skip(1)
        .any(|segment| segment.eq_ignore_ascii_case("temp"));
    let kind = match record.file_type {
        FileType::Video if !in_temp => MediaKind::Video,
        FileType::Image if !in_temp => MediaKind::Image,
        _ => {
            return Err(DashError::Unsupported {
                operation: "preview",
                target: record.relative_path.clone(),
            });
        }
    };
    Ok(PreviewTarget { kind, path })
}

/// One page of the visible subset with its surrounding controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageView<'a> {
    /// Current page, 1-based.
    pub page: usize,
    /// Pages in the visible subset.
    pub total_pages: usize,
    /// Files on this page.
    pub items: Vec<&'a FileRecord>,
    /// 1-based inclusive item range shown, `None` when nothing is visible.
    pub showing: Option<(usize, usize)>,
    /// Size of the visible subset.
    pub visible_total: usize,
    /// Pagination control.
    pub window: PageWindow,
}

/// Full listing plus the derived visible subset.
#[derive(Debug, Clone)]
pub struct FileCatalog {
    all: Vec<FileRecord>,
    filters: FilterState,
    visible: Vec<usize>,
    page: usize,
    page_size: usize,
}

impl Default for FileCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl FileCatalog {
    /// Empty catalog showing `page_size` files per page (zero is treated as
    /// the default).
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            all: Vec::new(),
            filters: FilterState::default(),
            visible: Vec::new(),
            page: 1,
            page_size: if page_size == 0 {
                DEFAULT_PAGE_SIZE
            } else {
                page_size
            },
        }
    }

    /// Fetch the listing and replace the catalog contents.
    ///
    /// # Errors
    ///
    /// Returns [`DashError::Api`] when the listing cannot be fetched; the
    /// catalog keeps its previous contents.
    pub async fn refresh(&mut self, api: &dyn DashboardApi) -> DashResult<usize> {
        let entries = api.list_files().await.map_err(|err| {
            warn!(error = %err, detail = %err.detail(), "file listing failed");
            DashError::api("list files", err)
        })?;
        self.replace(entries);
        Ok(self.all.len())
    }

    /// Replace the full listing. The source filter survives only if that
    /// source still exists; filters are then re-applied.
    pub fn replace(&mut self, entries: Vec<FileEntry>) {
        self.all = entries.into_iter().map(FileRecord::from).collect();
        let mut filters = self.filters.clone();
        if let Some(source) = filters.source_filter.as_deref()
            && !self.all.iter().any(|record| record.source == source)
        {
            filters.source_filter = None;
        }
        debug!(files = self.all.len(), "file catalog replaced");
        self.apply_filters(filters);
    }

    /// Replace the filter state, recompute the visible subset from the full
    /// listing, and go back to page 1.
    pub fn apply_filters(&mut self, state: FilterState) {
        self.visible = filter_and_sort(&self.all, &state);
        self.filters = state;
        self.page = 1;
    }

    /// Change only the sort order.
    pub fn sort(&mut self, key: SortKey) {
        let state = FilterState {
            sort_key: key,
            ..self.filters.clone()
        };
        self.apply_filters(state);
    }

    /// Current filter state.
    #[must_use]
    pub const fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Every file from the last listing, in listing order.
    #[must_use]
    pub fn all_files(&self) -> &[FileRecord] {
        &self.all
    }

    /// Files passing the current filters, in sort order.
    pub fn filtered(&self) -> impl Iterator<Item = &FileRecord> {
        self.visible.iter().map(|index| &self.all[*index])
    }

    /// Number of files passing the current filters.
    #[must_use]
    pub fn filtered_len(&self) -> usize {
        self.visible.len()
    }

    /// Current page, 1-based.
    #[must_use]
    pub const fn page(&self) -> usize {
        self.page
    }

    /// Files per page.
    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Pages in the visible subset.
    #[must_use]
    pub fn total_pages(&self) -> usize {
        page_count(self.visible.len(), self.page_size)
    }

    /// Move to `page` with `page_size` files per page and return its files.
    ///
    /// Pages below 1, a zero page size, or pages past the last one yield an
    /// empty slice and leave the current page unchanged.
    pub fn paginate(&mut self, page: i64, page_size: usize) -> Vec<&FileRecord> {
        let Ok(page) = usize::try_from(page) else {
            return Vec::new();
        };
        if page == 0 || page > page_count(self.visible.len(), page_size) {
            return Vec::new();
        }
        self.page = page;
        self.page_size = page_size;
        self.page_items()
    }

    /// The current page with its controls.
    #[must_use]
    pub fn current_page(&self) -> PageView<'_> {
        let total = self.visible.len();
        let (start, end) = page_bounds(self.page, self.page_size, total);
        PageView {
            page: self.page,
            total_pages: self.total_pages(),
            items: self.page_items(),
            showing: (end > start).then_some((start + 1, end)),
            visible_total: total,
            window: page_window(self.page, self.total_pages(), DEFAULT_VISIBLE_PAGES),
        }
    }

    /// Type counts over the full listing.
    #[must_use]
    pub fn stats(&self) -> FileStats {
        self.all.iter().fold(
            FileStats {
                total: self.all.len(),
                ..FileStats::default()
            },
            |mut stats, record| {
                match record.file_type {
                    FileType::Video => stats.video += 1,
                    FileType::Image => stats.image += 1,
                    FileType::Audio => stats.audio += 1,
                    FileType::Data | FileType::Other => stats.other += 1,
                }
                stats
            },
        )
    }

    /// Distinct sources, sorted, excluding [`UNKNOWN_SOURCE`].
    #[must_use]
    pub fn sources(&self) -> Vec<String> {
        self.all
            .iter()
            .map(|record| record.source.as_str())
            .filter(|source| *source != UNKNOWN_SOURCE)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Find a file by its reported path.
    #[must_use]
    pub fn find(&self, path: &str) -> Option<&FileRecord> {
        self.all.iter().find(|record| record.relative_path == path)
    }

    fn page_items(&self) -> Vec<&FileRecord> {
        let (start, end) = page_bounds(self.page, self.page_size, self.visible.len());
        self.visible[start..end]
            .iter()
            .map(|index| &self.all[*index])
            .collect()
    }
}
