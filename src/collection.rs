//! The ordered in-memory list of loaded documents.
//!
//! Documents are only ever appended or replaced in place. Removal happens by
//! clearing the whole collection at the start of a new cycle.

use std::cmp::Ordering;

use crate::models::Document;

#[derive(Debug, Clone, Default)]
pub struct ResultCollection {
    docs: Vec<Document>,
}

impl ResultCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn clear(&mut self) {
        self.docs.clear();
    }

    pub fn extend(&mut self, docs: impl IntoIterator<Item = Document>) {
        self.docs.extend(docs);
    }

    pub fn get(&self, index: usize) -> Option<&Document> {
        self.docs.get(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.docs.iter().position(|d| d.id == id)
    }

    /// Replace the entry at `index` if it still holds `doc.id`.
    ///
    /// Returns false when the slot is gone or now holds another document.
    pub fn replace(&mut self, index: usize, doc: Document) -> bool {
        match self.docs.get_mut(index) {
            Some(slot) if slot.id == doc.id => {
                *slot = doc;
                true
            }
            _ => false,
        }
    }

    pub fn to_vec(&self) -> Vec<Document> {
        self.docs.clone()
    }
}

/// Post-process one scanned page before it is appended.
///
/// Drops `_design` documents, then sorts by name. Only the named documents
/// are sorted, within the slots they already occupy; documents without a
/// name keep their positions.
pub fn prepare_page(docs: Vec<Document>) -> Vec<Document> {
    let mut page: Vec<Document> = docs.into_iter().filter(|d| !d.is_design()).collect();

    let slots: Vec<usize> = page
        .iter()
        .enumerate()
        .filter(|(_, d)| d.name.is_some())
        .map(|(i, _)| i)
        .collect();
    let mut named: Vec<Document> = slots.iter().map(|&i| page[i].clone()).collect();
    named.sort_by(|a, b| compare_names(a.name.as_deref(), b.name.as_deref()));

    for (slot, doc) in slots.into_iter().zip(named) {
        page[slot] = doc;
    }
    page
}

/// Case-insensitive name order, falling back to byte order for ties.
fn compare_names(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a
            .to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b)),
        _ => Ordering::Equal,
    }
}
