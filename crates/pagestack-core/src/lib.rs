//! Client-side PDF assembly
//!
//! Combines PDFs and raster images into a single PDF, in a user-chosen order
//! and with optional per-file page ranges. Everything runs in memory using
//! lopdf; the wasm app wraps [`Session`] for the browser.
//!
//! The flow is linear: intake → probe → (reorder / set ranges) → assemble →
//! deliver.

pub mod assemble;
pub mod config;
pub mod delivery;
pub mod entry;
pub mod error;
pub mod image_page;
pub mod intake;
pub mod notify;
pub mod page_info;
pub mod probe;
pub mod range;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use assemble::{assemble, AssemblyMetrics, AssemblyOptions, AssemblyReport, EntryOutcome};
pub use config::{EmptySelectionPolicy, IntakePolicy, PageSize, SessionConfig};
pub use delivery::{output_filename, Deliverable};
pub use entry::{Entry, EntryId, EntryKind, EntryList, EntrySummary};
pub use error::PageStackError;
pub use notify::{Notification, NotificationLevel};
pub use range::{parse_page_range, resolve_selection, PageSelection};
pub use session::{Session, SessionStatus};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PageStackError> {
    probe::probe_pdf(bytes).map(|info| info.page_count)
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}
