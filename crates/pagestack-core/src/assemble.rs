//! Assembly: many entries in, one PDF out
//!
//! The algorithm:
//! 1. Create a fresh destination document with an empty page tree
//! 2. For each entry, in list order:
//!    a. Document: resolve the page selection, copy inherited attributes
//!       down onto the selected pages, collect every object those pages
//!       reach (construction by whitelist), import the set under fresh
//!       object ids and re-parent the pages
//!    b. Image: decode and draw onto a new page (see [`crate::image_page`])
//!    c. Record the per-entry result; a failure skips only that entry
//! 3. If nothing was added, fail without output
//! 4. Write the page tree and catalog, compress and serialize

use crate::config::{EmptySelectionPolicy, PageSize};
use crate::entry::{Entry, EntryId, EntryKind};
use crate::error::PageStackError;
use crate::image_page::add_image_page;
use crate::page_info::{inherited_attribute, INHERITABLE_KEYS};
use crate::range::PageSelection;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Knobs that shape one assembly run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblyOptions {
    pub max_page_size: PageSize,
    pub empty_selection: EmptySelectionPolicy,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            max_page_size: crate::config::A4,
            empty_selection: EmptySelectionPolicy::AllPages,
        }
    }
}

/// What a successfully assembled entry contributed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryReport {
    pub pages_added: u32,
    /// The range matched nothing and every page was used instead
    pub fell_back_to_all_pages: bool,
}

/// Per-entry result of an assembly run
#[derive(Debug, Clone, PartialEq)]
pub struct EntryOutcome {
    pub id: EntryId,
    pub name: String,
    pub result: Result<EntryReport, PageStackError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub page_count: u32,
    pub entries_assembled: usize,
    pub entries_skipped: usize,
}

#[derive(Debug, Clone)]
pub struct AssembledDocument {
    pub bytes: Vec<u8>,
    pub metrics: AssemblyMetrics,
}

/// Outcomes for every entry plus the overall result
#[derive(Debug, Clone)]
pub struct AssemblyReport {
    pub outcomes: Vec<EntryOutcome>,
    pub result: Result<AssembledDocument, PageStackError>,
}

impl AssemblyReport {
    pub fn skipped(&self) -> impl Iterator<Item = (&EntryOutcome, &PageStackError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o, e)))
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, PageStackError> {
        self.result.map(|doc| doc.bytes)
    }
}

/// Compose one PDF from `entries` in order
pub fn assemble(entries: &[Entry], options: &AssemblyOptions) -> AssemblyReport {
    tracing::info!(entries = entries.len(), "assembly started");

    if entries.is_empty() {
        return AssemblyReport {
            outcomes: Vec::new(),
            result: Err(PageStackError::NothingAssembled("no files added".into())),
        };
    }

    let mut dest = Document::with_version("1.7");
    let pages_id = dest.new_object_id();
    let mut kids: Vec<ObjectId> = Vec::new();
    let mut outcomes = Vec::with_capacity(entries.len());

    for entry in entries {
        let result = assemble_entry(&mut dest, pages_id, entry, options).map(|(page_ids, report)| {
            kids.extend(page_ids);
            report
        });

        if let Err(ref e) = result {
            tracing::warn!(entry = %entry.name, error = %e, "skipping entry");
        }

        outcomes.push(EntryOutcome {
            id: entry.id,
            name: entry.name.clone(),
            result,
        });
    }

    let entries_assembled = outcomes.iter().filter(|o| o.result.is_ok()).count();
    let result = if kids.is_empty() {
        Err(PageStackError::NothingAssembled(
            "none of the files could be added".into(),
        ))
    } else {
        finish_document(dest, pages_id, &kids).map(|bytes| {
            let metrics = AssemblyMetrics {
                input_size_bytes: entries.iter().map(|e| e.bytes.len()).sum(),
                output_size_bytes: bytes.len(),
                page_count: kids.len() as u32,
                entries_assembled,
                entries_skipped: entries.len() - entries_assembled,
            };
            tracing::info!(
                pages = metrics.page_count,
                output_bytes = metrics.output_size_bytes,
                skipped = metrics.entries_skipped,
                "assembly finished"
            );
            AssembledDocument { bytes, metrics }
        })
    };

    AssemblyReport { outcomes, result }
}

fn assemble_entry(
    dest: &mut Document,
    pages_id: ObjectId,
    entry: &Entry,
    options: &AssemblyOptions,
) -> Result<(Vec<ObjectId>, EntryReport), PageStackError> {
    match &entry.kind {
        EntryKind::Image(_) => {
            let page_id = add_image_page(dest, pages_id, &entry.bytes, options.max_page_size)?;
            Ok((
                vec![page_id],
                EntryReport {
                    pages_added: 1,
                    fell_back_to_all_pages: false,
                },
            ))
        }
        EntryKind::Document(info) => {
            let (indices, fell_back) = match entry.selection() {
                PageSelection::All(pages) | PageSelection::Subset(pages) => (pages, false),
                PageSelection::Nothing => match options.empty_selection {
                    EmptySelectionPolicy::AllPages => ((0..info.page_count).collect(), true),
                    EmptySelectionPolicy::SkipEntry => {
                        return Err(PageStackError::OperationError(format!(
                            "range \"{}\" selects no pages",
                            entry.range
                        )))
                    }
                },
            };

            let page_ids = import_pages(dest, pages_id, &entry.bytes, &indices)?;
            Ok((
                page_ids.clone(),
                EntryReport {
                    pages_added: page_ids.len() as u32,
                    fell_back_to_all_pages: fell_back,
                },
            ))
        }
    }
}

/// Copy the pages at zero-based `indices` of the PDF in `bytes` into `dest`
///
/// Returns the new page ids in ascending source order, already parented to
/// `pages_id`.
pub fn import_pages(
    dest: &mut Document,
    pages_id: ObjectId,
    bytes: &[u8],
    indices: &[u32],
) -> Result<Vec<ObjectId>, PageStackError> {
    let mut source =
        Document::load_mem(bytes).map_err(|e| PageStackError::ParseError(e.to_string()))?;

    if source.is_encrypted() {
        return Err(PageStackError::ParseError(
            "encrypted documents are not supported".into(),
        ));
    }

    let source_pages = source.get_pages();
    let mut selected = Vec::with_capacity(indices.len());
    for &index in indices {
        let page_id = source_pages.get(&(index + 1)).copied().ok_or_else(|| {
            PageStackError::OperationError(format!(
                "page {} does not exist (document has {} pages)",
                index + 1,
                source_pages.len()
            ))
        })?;
        selected.push(page_id);
    }

    if selected.is_empty() {
        return Err(PageStackError::EmptyDocument);
    }

    for &page_id in &selected {
        flatten_inherited(&mut source, page_id);
    }

    let all_pages: BTreeSet<ObjectId> = source_pages.values().copied().collect();
    let keep = collect_dependencies(&source, &selected, &all_pages);

    // Fresh ids in the destination for every kept object
    let id_map: BTreeMap<ObjectId, ObjectId> = keep
        .iter()
        .map(|&old_id| (old_id, dest.new_object_id()))
        .collect();

    for (old_id, new_id) in &id_map {
        if let Some(object) = source.objects.remove(old_id) {
            dest.objects.insert(*new_id, remap_object_refs(object, &id_map));
        }
    }

    let mut new_page_ids = Vec::with_capacity(selected.len());
    for old_page_id in selected {
        let new_page_id = id_map[&old_page_id];
        if let Ok(page) = dest
            .get_object_mut(new_page_id)
            .and_then(Object::as_dict_mut)
        {
            page.set("Parent", Object::Reference(pages_id));
        }
        tracing::debug!(?old_page_id, ?new_page_id, "imported page");
        new_page_ids.push(new_page_id);
    }

    Ok(new_page_ids)
}

/// Copy attributes the page inherits from its ancestors onto the page itself
fn flatten_inherited(doc: &mut Document, page_id: ObjectId) {
    let inherited: Vec<(&[u8], Object)> = match doc.get_dictionary(page_id) {
        Ok(page) => INHERITABLE_KEYS
            .iter()
            .filter(|key| page.get(key).is_err())
            .filter_map(|&key| inherited_attribute(doc, page, key).map(|v| (key, v.clone())))
            .collect(),
        Err(_) => return,
    };

    if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }
}

/// Every object reachable from `roots`, not following page `Parent` links
/// and not crossing into pages outside `roots`
fn collect_dependencies(
    doc: &Document,
    roots: &[ObjectId],
    all_pages: &BTreeSet<ObjectId>,
) -> BTreeSet<ObjectId> {
    let wanted_pages: BTreeSet<ObjectId> = roots.iter().copied().collect();
    let mut seen = BTreeSet::new();
    let mut stack: Vec<ObjectId> = roots.to_vec();

    while let Some(id) = stack.pop() {
        if seen.contains(&id) {
            continue;
        }
        // Dangling references stay unmapped and are nulled on remap
        let Ok(object) = doc.get_object(id) else {
            continue;
        };
        seen.insert(id);
        let is_page = all_pages.contains(&id);
        let mut refs = Vec::new();
        match object {
            Object::Dictionary(dict) => collect_dict_refs(dict, is_page, &mut refs),
            Object::Stream(stream) => collect_dict_refs(&stream.dict, is_page, &mut refs),
            other => collect_refs(other, &mut refs),
        }
        for r in refs {
            if all_pages.contains(&r) && !wanted_pages.contains(&r) {
                continue;
            }
            if !seen.contains(&r) {
                stack.push(r);
            }
        }
    }

    seen
}

fn collect_dict_refs(dict: &Dictionary, skip_parent: bool, out: &mut Vec<ObjectId>) {
    for (key, value) in dict.iter() {
        if skip_parent && key.as_slice() == b"Parent" {
            continue;
        }
        collect_refs(value, out);
    }
}

fn collect_refs(obj: &Object, out: &mut Vec<ObjectId>) {
    match obj {
        Object::Reference(id) => out.push(*id),
        Object::Array(arr) => arr.iter().for_each(|o| collect_refs(o, out)),
        Object::Dictionary(dict) => collect_dict_refs(dict, false, out),
        Object::Stream(stream) => collect_dict_refs(&stream.dict, false, out),
        _ => {}
    }
}

/// Rewrite references through `id_map`; anything left behind becomes null
fn remap_object_refs(obj: Object, id_map: &BTreeMap<ObjectId, ObjectId>) -> Object {
    match obj {
        Object::Reference(id) => match id_map.get(&id) {
            Some(&new_id) => Object::Reference(new_id),
            None => Object::Null,
        },
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, id_map))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), id_map);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), id_map);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Write the page tree and catalog, then serialize
fn finish_document(
    mut dest: Document,
    pages_id: ObjectId,
    kids: &[ObjectId],
) -> Result<Vec<u8>, PageStackError> {
    dest.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
            "Count" => kids.len() as i64,
        }),
    );

    let catalog_id = dest.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    dest.trailer.set("Root", Object::Reference(catalog_id));

    dest.compress();

    let mut buffer = Vec::new();
    dest.save_to(&mut buffer).map_err(|e| {
        PageStackError::SerializationError(format!("Failed to save assembled PDF: {}", e))
    })?;

    Ok(buffer)
}
