//! Link table rows and their asynchronous enrichment.
//!
//! Each non-blank row resolves through `/api/link/parse`; user links then
//! fetch their work count through a second, independent request. Results come
//! back as [`LinkPatch`]es tagged with the row identity and generation they
//! were issued for, so a row edited or removed while a request was in flight
//! simply drops the stale answer.

use std::sync::Arc;

use dydash_api_models::{LinkParseResponse, LinkType, WorkCountResponse};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::DashboardApi;
use crate::error::ApiResult;

const MISSING_SEC_UID: &str = "user id missing from parse result";

/// Stable identity of a link row across edits and reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(u64);

/// Kind of entity a link resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    /// User profile.
    User,
    /// Single video.
    Video,
    /// Collection.
    Collection,
    /// Anything else.
    Unknown,
}

impl LinkKind {
    /// Badge text for the kind.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Video => "video",
            Self::Collection => "collection",
            Self::Unknown => "unknown",
        }
    }
}

impl From<Option<LinkType>> for LinkKind {
    fn from(value: Option<LinkType>) -> Self {
        match value {
            Some(LinkType::User) => Self::User,
            Some(LinkType::Video) => Self::Video,
            Some(LinkType::Mix) => Self::Collection,
            Some(LinkType::Unknown) | None => Self::Unknown,
        }
    }
}

/// Work count cell of a resolved row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkCount {
    /// The link kind has no work count.
    NotApplicable,
    /// A count request is in flight.
    Loading,
    /// Count reported by the backend.
    Known(u64),
    /// The backend refused the count lookup.
    Failed(String),
    /// The count lookup never got an answer.
    NetworkError(String),
}

impl WorkCount {
    /// Known count, if any.
    #[must_use]
    pub const fn known(&self) -> Option<u64> {
        match self {
            Self::Known(count) => Some(*count),
            _ => None,
        }
    }
}

/// Successful parse result attached to a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    /// Display name of the resolved entity.
    pub display_name: String,
    /// Entity kind.
    pub kind: LinkKind,
    /// First external identifier the backend returned.
    pub external_id: Option<String>,
    /// Work count cell.
    pub work_count: WorkCount,
}

/// Resolution state of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The row is blank and never resolved.
    Skipped,
    /// Waiting for enrichment to be started.
    Pending,
    /// A parse request is in flight.
    Resolving,
    /// Parse succeeded.
    Resolved(ResolvedLink),
    /// The backend could not parse the link.
    Failed {
        /// Backend message.
        message: String,
    },
    /// The parse request never got an answer.
    NetworkError {
        /// Transport detail.
        detail: String,
    },
}

/// One row of the link table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRow {
    id: RowId,
    generation: u64,
    raw: String,
    selected: bool,
    resolution: Resolution,
}

impl LinkRow {
    /// Row identity.
    #[must_use]
    pub const fn id(&self) -> RowId {
        self.id
    }

    /// Raw link text exactly as stored in the configuration.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Whether the row is selected for download.
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    /// Current resolution state.
    #[must_use]
    pub const fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Whether the link text is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }

    /// Resolved data, when the parse succeeded.
    #[must_use]
    pub const fn resolved(&self) -> Option<&ResolvedLink> {
        match &self.resolution {
            Resolution::Resolved(resolved) => Some(resolved),
            _ => None,
        }
    }

    fn initial_resolution(raw: &str) -> Resolution {
        if raw.trim().is_empty() {
            Resolution::Skipped
        } else {
            Resolution::Pending
        }
    }
}

/// Tri-state of the "select all" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    /// No row selected.
    None,
    /// Some rows selected.
    Partial,
    /// Every row selected.
    All,
}

/// Ordered link rows; row `i` mirrors `config.link[i]`.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    rows: Vec<LinkRow>,
    next_id: u64,
}

impl LinkTable {
    /// Build a table from the configured links. Every row starts selected.
    #[must_use]
    pub fn from_links(links: &[String]) -> Self {
        let mut table = Self::default();
        for link in links {
            table.push(link);
        }
        table
    }

    /// All rows in display order.
    #[must_use]
    pub fn rows(&self) -> &[LinkRow] {
        &self.rows
    }

    /// Row at `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&LinkRow> {
        self.rows.get(index)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Raw link texts in row order.
    #[must_use]
    pub fn links(&self) -> Vec<String> {
        self.rows.iter().map(|row| row.raw.clone()).collect()
    }

    /// Append a row and return its index.
    pub fn push(&mut self, link: &str) -> usize {
        let id = RowId(self.next_id);
        self.next_id += 1;
        self.rows.push(LinkRow {
            id,
            generation: 0,
            raw: link.to_string(),
            selected: true,
            resolution: LinkRow::initial_resolution(link),
        });
        self.rows.len() - 1
    }

    /// Replace the text of row `index`; results for the old text are discarded
    /// and the row goes back to pending. Returns `false` when out of range.
    pub fn update(&mut self, index: usize, link: &str) -> bool {
        let Some(row) = self.rows.get_mut(index) else {
            return false;
        };
        row.generation += 1;
        link.clone_into(&mut row.raw);
        row.resolution = LinkRow::initial_resolution(link);
        true
    }

    /// Remove and return row `index`.
    pub fn remove(&mut self, index: usize) -> Option<LinkRow> {
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }

    /// Remove every row.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Select or deselect row `index`. Returns `false` when out of range.
    pub fn set_selected(&mut self, index: usize, selected: bool) -> bool {
        self.rows
            .get_mut(index)
            .map(|row| row.selected = selected)
            .is_some()
    }

    /// Select or deselect every row.
    pub fn select_all(&mut self, selected: bool) {
        for row in &mut self.rows {
            row.selected = selected;
        }
    }

    /// Keep only the rows at `indices` selected.
    pub fn select_only(&mut self, indices: &[usize]) {
        for (index, row) in self.rows.iter_mut().enumerate() {
            row.selected = indices.contains(&index);
        }
    }

    /// State of the "select all" control.
    #[must_use]
    pub fn selection_state(&self) -> SelectionState {
        let selected = self.rows.iter().filter(|row| row.selected).count();
        match selected {
            0 => SelectionState::None,
            n if n == self.rows.len() => SelectionState::All,
            _ => SelectionState::Partial,
        }
    }

    /// Selected, non-blank rows in table order.
    pub fn selected_rows(&self) -> impl Iterator<Item = &LinkRow> {
        self.rows
            .iter()
            .filter(|row| row.selected && !row.is_blank())
    }

    /// Mark every pending row as resolving and return what to request for each.
    fn take_pending(&mut self) -> Vec<(RowId, u64, String)> {
        self.rows
            .iter_mut()
            .filter(|row| row.resolution == Resolution::Pending)
            .map(|row| {
                row.resolution = Resolution::Resolving;
                (row.id, row.generation, row.raw.clone())
            })
            .collect()
    }

    /// Apply an enrichment result. Returns the index of the patched row, or
    /// `None` when the row is gone or was edited after the request was issued.
    pub fn apply(&mut self, patch: LinkPatch) -> Option<usize> {
        let Some(index) = self.rows.iter().position(|row| row.id == patch.row) else {
            debug!(row = patch.row.0, "dropping result for removed link row");
            return None;
        };
        let row = &mut self.rows[index];
        if row.generation != patch.generation {
            debug!(
                row = patch.row.0,
                issued = patch.generation,
                current = row.generation,
                "dropping stale link result"
            );
            return None;
        }
        match patch.outcome {
            PatchOutcome::Parsed(result) => {
                row.resolution = resolution_from_parse(result);
            }
            PatchOutcome::Counted(result) => {
                let Resolution::Resolved(resolved) = &mut row.resolution else {
                    return None;
                };
                resolved.work_count = work_count_from_lookup(result);
            }
        }
        Some(index)
    }
}

/// Result of one enrichment request, addressed to the row it was issued for.
#[derive(Debug, Clone)]
pub struct LinkPatch {
    row: RowId,
    generation: u64,
    outcome: PatchOutcome,
}

#[derive(Debug, Clone)]
enum PatchOutcome {
    Parsed(ApiResult<LinkParseResponse>),
    Counted(ApiResult<WorkCountResponse>),
}

fn resolution_from_parse(result: ApiResult<LinkParseResponse>) -> Resolution {
    match result {
        Ok(response) if response.success => {
            let kind = LinkKind::from(response.link_type);
            let work_count = match (response.work_count, kind) {
                (Some(count), _) => WorkCount::Known(count),
                (None, LinkKind::User) if response.sec_uid.is_some() => WorkCount::Loading,
                (None, LinkKind::User) => WorkCount::Failed(MISSING_SEC_UID.to_string()),
                (None, _) => WorkCount::NotApplicable,
            };
            Resolution::Resolved(ResolvedLink {
                display_name: response.nickname.clone().unwrap_or_default(),
                kind,
                external_id: response.external_id().map(str::to_string),
                work_count,
            })
        }
        Ok(response) => Resolution::Failed {
            message: response
                .message
                .unwrap_or_else(|| "link could not be parsed".to_string()),
        },
        Err(err) => Resolution::NetworkError {
            detail: err.detail(),
        },
    }
}

fn work_count_from_lookup(result: ApiResult<WorkCountResponse>) -> WorkCount {
    match result {
        Ok(response) if response.success => {
            response.work_count.map_or_else(
                || WorkCount::Failed("work count missing".to_string()),
                WorkCount::Known,
            )
        }
        Ok(response) => WorkCount::Failed(
            response
                .message
                .unwrap_or_else(|| "work count lookup failed".to_string()),
        ),
        Err(err) => WorkCount::NetworkError(err.detail()),
    }
}

/// Issues parse and work-count requests for link rows.
#[derive(Clone)]
pub struct LinkEnricher {
    api: Arc<dyn DashboardApi>,
}

impl LinkEnricher {
    /// Create an enricher backed by `api`.
    #[must_use]
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self { api }
    }

    /// Start enrichment for every pending row. Each row gets its own task; the
    /// task sends its parse result and, for user links, a second work-count
    /// result on `patches`. Returns the number of rows started.
    pub fn spawn_pending(
        &self,
        table: &mut LinkTable,
        patches: &mpsc::UnboundedSender<LinkPatch>,
    ) -> usize {
        let pending = table.take_pending();
        let started = pending.len();
        for (row, generation, link) in pending {
            let api = Arc::clone(&self.api);
            let patches = patches.clone();
            tokio::spawn(async move {
                let parsed = api.parse_link(&link).await;
                if let Err(err) = &parsed {
                    warn!(error = %err, detail = %err.detail(), "link parse request failed");
                }
                let follow_up = match &parsed {
                    Ok(response)
                        if response.success && response.link_type == Some(LinkType::User) =>
                    {
                        response.sec_uid.clone()
                    }
                    _ => None,
                };
                let parsed = LinkPatch {
                    row,
                    generation,
                    outcome: PatchOutcome::Parsed(parsed),
                };
                if patches.send(parsed).is_err() {
                    debug!(row = row.0, "link table gone; parse result dropped");
                    return;
                }
                if let Some(sec_uid) = follow_up {
                    let counted = LinkPatch {
                        row,
                        generation,
                        outcome: PatchOutcome::Counted(api.fetch_work_count(&sec_uid).await),
                    };
                    if patches.send(counted).is_err() {
                        debug!(row = row.0, "link table gone; work count dropped");
                    }
                }
            });
        }
        started
    }

    /// Enrich every pending row and wait until all requests settle. `observer`
    /// sees each row as soon as a result lands on it.
    pub async fn enrich_all<F>(&self, table: &mut LinkTable, mut observer: F)
    where
        F: FnMut(usize, &LinkRow),
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let started = self.spawn_pending(table, &tx);
        drop(tx);
        debug!(started, "link enrichment started");
        while let Some(patch) = rx.recv().await {
            if let Some(index) = table.apply(patch) {
                observer(index, &table.rows[index]);
            }
        }
    }
}
