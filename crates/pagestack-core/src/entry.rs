//! Managed file entries and the ordered list that holds them

use crate::error::PageStackError;
use crate::probe::{DocumentInfo, ImageInfo};
use crate::range::{resolve_selection, PageSelection};
use serde::Serialize;

/// Session-unique entry identifier; never reused after removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntryId(pub u32);

/// What an entry contributes to the output
#[derive(Debug, Clone, PartialEq)]
pub enum EntryKind {
    /// A multi-page PDF, copied page by page
    Document(DocumentInfo),
    /// A raster image, drawn onto its own page
    Image(ImageInfo),
}

impl EntryKind {
    /// Pages the entry has before any range is applied
    pub fn page_count(&self) -> u32 {
        match self {
            EntryKind::Document(info) => info.page_count,
            EntryKind::Image(_) => 1,
        }
    }
}

/// One user-added file awaiting assembly
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: EntryId,
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub kind: EntryKind,
    /// Page range expression; blank means every page
    pub range: String,
}

impl Entry {
    pub fn selection(&self) -> PageSelection {
        resolve_selection(&self.range, self.kind.page_count())
    }

    pub fn summary(&self) -> EntrySummary {
        let (kind, width, height) = match &self.kind {
            EntryKind::Document(_) => ("document", None, None),
            EntryKind::Image(info) => ("image", Some(info.width), Some(info.height)),
        };
        EntrySummary {
            id: self.id,
            name: self.name.clone(),
            kind,
            page_count: self.kind.page_count(),
            selected_pages: self.selection().indices().len() as u32,
            size_bytes: self.bytes.len(),
            range: self.range.clone(),
            width,
            height,
        }
    }
}

/// Serializable row for the file list UI
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub id: EntryId,
    pub name: String,
    pub kind: &'static str,
    pub page_count: u32,
    pub selected_pages: u32,
    pub size_bytes: usize,
    pub range: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Ordered entries; insertion order is presentation order until reordered
#[derive(Debug, Default)]
pub struct EntryList {
    entries: Vec<Entry>,
    next_id: u32,
}

impl EntryList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(
        &mut self,
        name: &str,
        mime: &str,
        bytes: Vec<u8>,
        kind: EntryKind,
    ) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            name: name.to_string(),
            mime: mime.to_string(),
            bytes,
            kind,
            range: String::new(),
        });
        id
    }

    pub fn remove(&mut self, id: EntryId) -> Result<Entry, PageStackError> {
        let index = self.index_of(id)?;
        Ok(self.entries.remove(index))
    }

    /// Drag gesture: take the entry at `from` and drop it at `to`
    pub fn move_entry(&mut self, from: usize, to: usize) -> Result<(), PageStackError> {
        let len = self.entries.len();
        if from >= len || to >= len {
            return Err(PageStackError::InvalidOrder(format!(
                "move {} -> {} out of bounds for {} entries",
                from, to, len
            )));
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        Ok(())
    }

    /// Apply a full permutation; `new_order[i]` is the current index that
    /// should end up at position `i`
    pub fn reorder(&mut self, new_order: &[usize]) -> Result<(), PageStackError> {
        let len = self.entries.len();
        if new_order.len() != len {
            return Err(PageStackError::InvalidOrder(
                "wrong number of indices".into(),
            ));
        }

        let mut seen = vec![false; len];
        for &idx in new_order {
            if idx >= len {
                return Err(PageStackError::InvalidOrder("index out of bounds".into()));
            }
            if seen[idx] {
                return Err(PageStackError::InvalidOrder("duplicate index".into()));
            }
            seen[idx] = true;
        }

        let mut slots: Vec<Option<Entry>> = self.entries.drain(..).map(Some).collect();
        self.entries = new_order
            .iter()
            .filter_map(|&idx| slots[idx].take())
            .collect();
        Ok(())
    }

    pub fn set_range(&mut self, id: EntryId, range: &str) -> Result<PageSelection, PageStackError> {
        let index = self.index_of(id)?;
        let entry = &mut self.entries[index];
        entry.range = range.to_string();
        Ok(entry.selection())
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<EntryId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    fn index_of(&self, id: EntryId) -> Result<usize, PageStackError> {
        self.entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(PageStackError::EntryNotFound(id.0))
    }
}
