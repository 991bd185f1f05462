//! Stateful assembly session
//!
//! Owns the entry list, the tool configuration and the notification queue.
//! The page layer keeps one `Session` per tool and calls into it for every
//! user action; nothing here is global.

use crate::assemble::{assemble, AssemblyMetrics, AssemblyOptions};
use crate::config::{EmptySelectionPolicy, SessionConfig};
use crate::delivery::{output_filename, Deliverable};
use crate::entry::{Entry, EntryId, EntryKind, EntryList, EntrySummary};
use crate::error::PageStackError;
use crate::format_bytes;
use crate::intake::{admit, FileKind};
use crate::notify::{Notification, Notifier};
use crate::page_info::PageInfo;
use crate::probe::{probe_image, probe_pdf};
use crate::range::PageSelection;
use serde::Serialize;

/// Idle → Ready → Processing → Idle | Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    /// No files waiting, or the last run finished
    Idle,
    /// Files added or edited since the last run
    Ready,
    Processing,
    /// The last run produced nothing
    Error,
}

pub struct Session {
    config: SessionConfig,
    entries: EntryList,
    notifier: Notifier,
    status: SessionStatus,
    output_name: String,
    last_metrics: Option<AssemblyMetrics>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            notifier: Notifier::new(config.notification_ms),
            config,
            entries: EntryList::new(),
            status: SessionStatus::Idle,
            output_name: String::new(),
            last_metrics: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Accept one file; rejected files produce a notification and an error
    pub fn add_file(
        &mut self,
        name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<EntryId, PageStackError> {
        match self.probe(name, mime, &bytes) {
            Ok(kind) => {
                let id = self.entries.push(name, mime, bytes, kind);
                tracing::debug!(entry = name, id = id.0, "file accepted");
                self.mark_edited();
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(entry = name, error = %e, "file rejected");
                self.notifier.error(format!("{}: {}", name, e));
                Err(e)
            }
        }
    }

    fn probe(&self, name: &str, mime: &str, bytes: &[u8]) -> Result<EntryKind, PageStackError> {
        let kind = admit(
            self.config.intake,
            self.config.max_file_bytes,
            name,
            mime,
            bytes,
        )?;

        match kind {
            FileKind::Pdf => {
                let info = probe_pdf(bytes)?;
                if info.encrypted {
                    return Err(PageStackError::UnsupportedFileType(
                        "password-protected PDFs are not supported".into(),
                    ));
                }
                Ok(EntryKind::Document(info))
            }
            FileKind::Image => Ok(EntryKind::Image(probe_image(bytes)?)),
        }
    }

    pub fn remove(&mut self, id: EntryId) -> Result<(), PageStackError> {
        self.entries.remove(id)?;
        self.mark_edited();
        Ok(())
    }

    /// Drag-and-drop move within the list
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<(), PageStackError> {
        self.entries.move_entry(from, to)?;
        self.mark_edited();
        Ok(())
    }

    pub fn reorder(&mut self, new_order: &[usize]) -> Result<(), PageStackError> {
        self.entries.reorder(new_order)?;
        self.mark_edited();
        Ok(())
    }

    /// Set an entry's range text; malformed input is accepted as typed
    pub fn set_range(&mut self, id: EntryId, range: &str) -> Result<PageSelection, PageStackError> {
        let selection = self.entries.set_range(id, range)?;
        self.mark_edited();
        Ok(selection)
    }

    pub fn set_output_name(&mut self, name: &str) {
        self.output_name = name.to_string();
    }

    /// Name the download will get if the run succeeds now
    pub fn output_file_name(&self) -> String {
        let first = self.entries.iter().next().map(|e| e.name.as_str());
        output_filename(Some(&self.output_name), first, &self.config.output_suffix)
    }

    pub fn can_run(&self) -> bool {
        self.status != SessionStatus::Processing && !self.entries.is_empty()
    }

    /// Assemble every entry in list order
    ///
    /// Skipped entries are reported as notifications. Fails, with exactly one
    /// error notification, when nothing could be assembled.
    pub fn run(&mut self) -> Result<Deliverable, PageStackError> {
        self.status = SessionStatus::Processing;

        let options = AssemblyOptions {
            max_page_size: self.config.max_page_size,
            empty_selection: self.config.empty_selection,
        };
        let report = assemble(self.entries.as_slice(), &options);

        for outcome in &report.outcomes {
            match &outcome.result {
                Err(e) => self
                    .notifier
                    .error(format!("Skipped {}: {}", outcome.name, e)),
                Ok(entry) if entry.fell_back_to_all_pages => self.notifier.warning(format!(
                    "{}: page range matched nothing, using all pages",
                    outcome.name
                )),
                Ok(_) => {}
            }
        }

        match report.result {
            Ok(assembled) => {
                let file_name = self.output_file_name();
                self.notifier.success(format!(
                    "Created {} ({} pages, {})",
                    file_name,
                    assembled.metrics.page_count,
                    format_bytes(assembled.metrics.output_size_bytes)
                ));
                self.last_metrics = Some(assembled.metrics);
                self.status = SessionStatus::Idle;
                Ok(Deliverable::pdf(file_name, assembled.bytes))
            }
            Err(e) => {
                self.notifier.error(e.to_string());
                self.last_metrics = None;
                self.status = SessionStatus::Error;
                Err(e)
            }
        }
    }

    /// Surface a failure that happened after the run, e.g. the save dialog
    pub fn report_failure(&mut self, message: &str) {
        self.notifier.error(message);
    }

    /// Drop every entry and pending notification
    pub fn reset(&mut self) {
        self.entries.clear();
        self.notifier.clear();
        self.output_name.clear();
        self.last_metrics = None;
        self.status = SessionStatus::Idle;
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifier.drain()
    }

    pub fn entries(&self) -> &EntryList {
        &self.entries
    }

    pub fn summaries(&self) -> Vec<EntrySummary> {
        self.entries.iter().map(|e| e.summary()).collect()
    }

    /// Pages the output would have with the current ranges
    pub fn selected_page_count(&self) -> u32 {
        self.entries
            .iter()
            .map(|e| self.pages_for(e).len() as u32)
            .sum()
    }

    /// Zero-based pages a run would take from one entry right now
    pub fn effective_pages(&self, id: EntryId) -> Result<Vec<u32>, PageStackError> {
        let entry = self
            .entries
            .get(id)
            .ok_or(PageStackError::EntryNotFound(id.0))?;
        Ok(self.pages_for(entry))
    }

    fn pages_for(&self, entry: &Entry) -> Vec<u32> {
        match entry.selection() {
            PageSelection::All(pages) | PageSelection::Subset(pages) => pages,
            PageSelection::Nothing => match self.config.empty_selection {
                EmptySelectionPolicy::AllPages => (0..entry.kind.page_count()).collect(),
                EmptySelectionPolicy::SkipEntry => Vec::new(),
            },
        }
    }

    pub fn last_metrics(&self) -> Option<&AssemblyMetrics> {
        self.last_metrics.as_ref()
    }

    /// Geometry of one page of a document entry (1-indexed)
    pub fn page_info(&self, id: EntryId, page_num: u32) -> Result<PageInfo, PageStackError> {
        let entry = self
            .entries
            .get(id)
            .ok_or(PageStackError::EntryNotFound(id.0))?;
        match entry.kind {
            EntryKind::Document(_) => {
                let doc = lopdf::Document::load_mem(&entry.bytes)
                    .map_err(|e| PageStackError::ParseError(e.to_string()))?;
                PageInfo::from_document(&doc, page_num)
            }
            EntryKind::Image(_) => Err(PageStackError::OperationError(
                "page info is only available for PDF entries".into(),
            )),
        }
    }

    fn mark_edited(&mut self) {
        self.status = if self.entries.is_empty() {
            SessionStatus::Idle
        } else {
            SessionStatus::Ready
        };
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntakePolicy;
    use crate::notify::NotificationLevel;
    use crate::test_support::{create_test_pdf, create_test_png, page_texts};
    use pretty_assertions::assert_eq;

    fn add_pdf(session: &mut Session, name: &str, pages: u32) -> EntryId {
        let prefix = name.trim_end_matches(".pdf");
        session
            .add_file(name, "application/pdf", create_test_pdf(pages, prefix))
            .unwrap()
    }

    #[test]
    fn test_new_session_is_idle_and_empty() {
        let session = Session::default();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(!session.can_run());
        assert_eq!(session.selected_page_count(), 0);
    }

    #[test]
    fn test_add_file_moves_to_ready() {
        let mut session = Session::default();
        add_pdf(&mut session, "a.pdf", 3);
        assert_eq!(session.status(), SessionStatus::Ready);
        assert!(session.can_run());
        assert_eq!(session.selected_page_count(), 3);
    }

    #[test]
    fn test_wrong_type_rejected_with_notification() {
        let mut session = Session::new(SessionConfig::pdf_merge());
        let result = session.add_file("cat.png", "image/png", create_test_png(2, 2));
        assert!(matches!(result, Err(PageStackError::UnsupportedFileType(_))));
        assert_eq!(session.entries().len(), 0);

        let notes = session.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
        assert!(notes[0].message.starts_with("cat.png"));
    }

    #[test]
    fn test_corrupt_pdf_rejected_at_intake() {
        let mut session = Session::default();
        let result = session.add_file("bad.pdf", "application/pdf", b"%PDF-1.7 junk".to_vec());
        assert!(result.is_err());
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_run_with_no_files_fails_once() {
        let mut session = Session::default();
        let result = session.run();
        assert!(matches!(result, Err(PageStackError::NothingAssembled(_))));
        assert_eq!(session.status(), SessionStatus::Error);

        let notes = session.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
    }

    #[test]
    fn test_run_produces_named_deliverable() {
        let mut session = Session::default();
        add_pdf(&mut session, "first.pdf", 2);
        add_pdf(&mut session, "second.pdf", 1);

        let deliverable = session.run().unwrap();
        assert_eq!(deliverable.file_name, "first_merged.pdf");
        assert_eq!(deliverable.mime_type, "application/pdf");
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.last_metrics().unwrap().page_count, 3);

        let notes = session.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Success);
    }

    #[test]
    fn test_user_output_name_used() {
        let mut session = Session::default();
        add_pdf(&mut session, "a.pdf", 1);
        session.set_output_name("bundle");
        assert_eq!(session.run().unwrap().file_name, "bundle.pdf");
    }

    #[test]
    fn test_move_then_run_follows_new_order() {
        let mut session = Session::default();
        add_pdf(&mut session, "DocA.pdf", 1);
        add_pdf(&mut session, "DocB.pdf", 1);
        add_pdf(&mut session, "DocC.pdf", 1);
        session.move_entry(2, 0).unwrap();

        let deliverable = session.run().unwrap();
        assert_eq!(
            page_texts(&deliverable.bytes),
            vec!["DocC-Page-1", "DocA-Page-1", "DocB-Page-1"]
        );
    }

    #[test]
    fn test_range_fallback_warns() {
        let mut session = Session::default();
        let id = add_pdf(&mut session, "a.pdf", 2);
        session.set_range(id, "x-y").unwrap();

        session.run().unwrap();
        let levels: Vec<_> = session
            .drain_notifications()
            .into_iter()
            .map(|n| n.level)
            .collect();
        assert_eq!(
            levels,
            vec![NotificationLevel::Warning, NotificationLevel::Success]
        );
    }

    #[test]
    fn test_undecodable_image_skipped_and_run_continues() {
        let mut session = Session::default();
        add_pdf(&mut session, "a.pdf", 1);

        // Header survives so intake accepts it; pixel data does not
        let png = create_test_png(64, 64);
        let cut = png[..png.len() / 2].to_vec();
        session.add_file("cut.png", "image/png", cut).unwrap();

        let deliverable = session.run().unwrap();
        assert_eq!(page_texts(&deliverable.bytes), vec!["a-Page-1"]);
        assert_eq!(session.status(), SessionStatus::Idle);

        let notes = session.drain_notifications();
        let levels: Vec<_> = notes.iter().map(|n| n.level).collect();
        assert_eq!(
            levels,
            vec![NotificationLevel::Error, NotificationLevel::Success]
        );
        assert!(notes[0].message.starts_with("Skipped cut.png"));
        assert!(notes[1].message.contains("a_merged.pdf"));
    }

    #[test]
    fn test_effective_pages_follow_empty_selection_policy() {
        let mut session = Session::default();
        let id = add_pdf(&mut session, "a.pdf", 3);
        session.set_range(id, "2-3").unwrap();
        assert_eq!(session.effective_pages(id).unwrap(), vec![1, 2]);

        session.set_range(id, "9").unwrap();
        assert_eq!(session.effective_pages(id).unwrap(), vec![0, 1, 2]);
        assert_eq!(session.selected_page_count(), 3);

        let mut strict = Session::new(SessionConfig {
            empty_selection: EmptySelectionPolicy::SkipEntry,
            ..SessionConfig::default()
        });
        let id = add_pdf(&mut strict, "b.pdf", 3);
        strict.set_range(id, "9").unwrap();
        assert!(strict.effective_pages(id).unwrap().is_empty());
        assert_eq!(strict.selected_page_count(), 0);

        assert!(matches!(
            strict.effective_pages(EntryId(99)),
            Err(PageStackError::EntryNotFound(99))
        ));
    }

    #[test]
    fn test_remove_last_entry_returns_to_idle() {
        let mut session = Session::default();
        let id = add_pdf(&mut session, "a.pdf", 1);
        session.remove(id).unwrap();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.remove(id).is_err());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = Session::default();
        add_pdf(&mut session, "a.pdf", 1);
        session.set_output_name("x");
        let _ = session.add_file("bad.txt", "text/plain", b"hello".to_vec());

        session.reset();
        assert_eq!(session.entries().len(), 0);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.drain_notifications().is_empty());
        assert_eq!(session.output_file_name(), "document_merged.pdf");
    }

    #[test]
    fn test_images_accepted_by_default_policy() {
        let mut session = Session::default();
        assert_eq!(session.config().intake, IntakePolicy::PdfAndImages);
        session
            .add_file("photo.png", "image/png", create_test_png(20, 10))
            .unwrap();
        let summaries = session.summaries();
        assert_eq!(summaries[0].kind, "image");
        assert_eq!(summaries[0].width, Some(20));
    }

    #[test]
    fn test_report_failure_queues_error() {
        let mut session = Session::default();
        session.report_failure("Download failed");
        let notes = session.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].level, NotificationLevel::Error);
    }

    #[test]
    fn test_page_info_for_document_entry() {
        let mut session = Session::default();
        let id = add_pdf(&mut session, "a.pdf", 2);
        let info = session.page_info(id, 1).unwrap();
        assert_eq!(info.width, 612.0);
    }
}
