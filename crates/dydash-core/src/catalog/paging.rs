//! Pagination arithmetic shared by the catalog views.

use serde::Serialize;

/// Default number of files per page.
pub const DEFAULT_PAGE_SIZE: usize = 15;
/// Default number of numbered links in the pagination control.
pub const DEFAULT_VISIBLE_PAGES: usize = 5;

/// Number of pages needed for `total` items.
#[must_use]
pub const fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        0
    } else {
        total.div_ceil(page_size)
    }
}

/// Index range `[start, end)` of `page` (1-based), clamped to `total`.
#[must_use]
pub fn page_bounds(page: usize, page_size: usize, total: usize) -> (usize, usize) {
    let start = page.saturating_sub(1).saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);
    (start, end)
}

/// One entry in the pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageLink {
    /// A numbered page.
    Page {
        /// 1-based page number.
        number: usize,
        /// Whether this is the page being shown.
        current: bool,
    },
    /// Elided run of pages.
    Ellipsis,
}

/// Pagination control state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageWindow {
    /// Target of the "previous" control, if enabled.
    pub previous: Option<usize>,
    /// Target of the "next" control, if enabled.
    pub next: Option<usize>,
    /// Numbered links with first/last anchors and ellipses.
    pub links: Vec<PageLink>,
}

/// Build the pagination control for `current` of `total_pages`.
///
/// Shows up to `max_visible` consecutive pages centred on `current`, plus the
/// first and last page with ellipses for gaps. A single page renders nothing.
#[must_use]
pub fn page_window(current: usize, total_pages: usize, max_visible: usize) -> PageWindow {
    if total_pages <= 1 || max_visible == 0 {
        return PageWindow {
            previous: None,
            next: None,
            links: Vec::new(),
        };
    }
    let current = current.clamp(1, total_pages);
    let mut start = current.saturating_sub(max_visible / 2).max(1);
    let end = (start + max_visible - 1).min(total_pages);
    if end + 1 - start < max_visible {
        start = (end + 1).saturating_sub(max_visible).max(1);
    }

    let mut links = Vec::with_capacity(max_visible + 4);
    if start > 1 {
        links.push(PageLink::Page {
            number: 1,
            current: false,
        });
        if start > 2 {
            links.push(PageLink::Ellipsis);
        }
    }
    links.extend((start..=end).map(|number| PageLink::Page {
        number,
        current: number == current,
    }));
    if end < total_pages {
        if end + 1 < total_pages {
            links.push(PageLink::Ellipsis);
        }
        links.push(PageLink::Page {
            number: total_pages,
            current: false,
        });
    }

    PageWindow {
        previous: (current > 1).then(|| current - 1),
        next: (current < total_pages).then(|| current + 1),
        links,
    }
}
