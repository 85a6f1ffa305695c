use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One indexed source file and the passages it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub file_path: String,
    pub file_name: String,
    pub content_type: String,
    pub content_hash: String,
    pub passage_ids: Vec<String>,
}

/// Indexed documents keyed by file path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocStore {
    documents: BTreeMap<String, DocumentRecord>,
}

impl DocStore {
    pub fn get(&self, file_path: &str) -> Option<&DocumentRecord> {
        self.documents.get(file_path)
    }

    pub fn contains(&self, file_path: &str) -> bool {
        self.documents.contains_key(file_path)
    }

    /// Insert or replace a record, returning the one it displaced.
    pub fn insert(&mut self, record: DocumentRecord) -> Option<DocumentRecord> {
        self.documents.insert(record.file_path.clone(), record)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn file_paths(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }
}
