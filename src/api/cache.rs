//! In-memory cache of the document list.
//!
//! Owned by [`ApiClient`](super::ApiClient). The only invalidation trigger is
//! a successful upload.

use crate::models::DocumentSummary;
use std::collections::HashMap;

/// Snapshot of the last fetched document list, indexed by id.
#[derive(Debug, Default)]
pub struct DocumentCache {
    documents: Option<Vec<DocumentSummary>>,
    by_id: HashMap<String, usize>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached list, if one has been stored since the last invalidation.
    pub fn documents(&self) -> Option<&[DocumentSummary]> {
        self.documents.as_deref()
    }

    /// Look up a cached summary by id.
    pub fn get(&self, id: &str) -> Option<&DocumentSummary> {
        let index = *self.by_id.get(id)?;
        self.documents.as_ref()?.get(index)
    }

    /// Replace the cached list.
    pub fn store(&mut self, documents: Vec<DocumentSummary>) {
        self.by_id = documents
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();
        self.documents = Some(documents);
    }

    /// Drop the cached list so the next read goes to the backend.
    pub fn invalidate(&mut self) {
        self.documents = None;
        self.by_id.clear();
    }

    pub fn is_populated(&self) -> bool {
        self.documents.is_some()
    }
}
