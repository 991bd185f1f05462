//! Page range expressions
//!
//! Turns free text like `"1-3, 5, 8-10"` into zero-based page indices.
//! Parsing never fails: malformed segments are skipped and out-of-bounds
//! references are clamped or dropped.

use std::collections::BTreeSet;

/// Parse a range expression against a document with `total_pages` pages.
///
/// Returns ascending, duplicate-free, zero-based indices. An empty or fully
/// malformed expression yields an empty list; callers decide whether that
/// means "nothing" or "everything" (see [`resolve_selection`]).
pub fn parse_page_range(expr: &str, total_pages: u32) -> Vec<u32> {
    let mut pages = BTreeSet::new();

    if total_pages == 0 {
        return Vec::new();
    }

    for part in expr.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        match parse_segment(part) {
            Some(Segment::Single(page)) => {
                if (1..=total_pages).contains(&page) {
                    pages.insert(page - 1);
                }
            }
            Some(Segment::Span(start, end)) => {
                let start = start.max(1);
                let end = end.min(total_pages);
                for page in start..=end {
                    pages.insert(page - 1);
                }
            }
            None => {
                tracing::debug!(segment = part, "skipping malformed range segment");
            }
        }
    }

    pages.into_iter().collect()
}

enum Segment {
    Single(u32),
    Span(u32, u32),
}

fn parse_segment(part: &str) -> Option<Segment> {
    match part.split_once('-') {
        Some((start, end)) => {
            let start: u32 = start.trim().parse().ok()?;
            let end: u32 = end.trim().parse().ok()?;
            // "5-3" is treated as a typo, not a reversed range
            if start > end {
                return None;
            }
            Some(Segment::Span(start, end))
        }
        None => part.parse().ok().map(Segment::Single),
    }
}

/// Outcome of applying a range expression to a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSelection {
    /// Expression was blank: every page
    All(Vec<u32>),
    /// Expression selected these pages
    Subset(Vec<u32>),
    /// Expression was non-blank but matched nothing
    Nothing,
}

impl PageSelection {
    /// The selected indices, empty for [`PageSelection::Nothing`]
    pub fn indices(&self) -> &[u32] {
        match self {
            PageSelection::All(pages) | PageSelection::Subset(pages) => pages,
            PageSelection::Nothing => &[],
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, PageSelection::Nothing)
    }
}

/// Apply the "blank expression means every page" rule on top of the parser
pub fn resolve_selection(expr: &str, total_pages: u32) -> PageSelection {
    if expr.trim().is_empty() {
        return PageSelection::All((0..total_pages).collect());
    }

    let pages = parse_page_range(expr, total_pages);
    if pages.is_empty() {
        PageSelection::Nothing
    } else {
        PageSelection::Subset(pages)
    }
}
