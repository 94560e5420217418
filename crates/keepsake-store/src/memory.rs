//! In-process document store.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::trace;

use crate::document::SessionDocument;
use crate::error::Result;
use crate::filter::Filter;
use crate::store::{
    DeleteResult, DocumentStore, FindOneAndUpdateOptions, ReturnDocument, UpdateOptions,
    UpdateResult,
};
use crate::update::{Update, apply_to_document};

/// Document store held in memory.
///
/// Each operation holds the write lock for its whole duration, which makes
/// it atomic per document. Useful for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<String, SessionDocument>>,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document as-is.
    pub fn insert(&self, doc: SessionDocument) {
        self.documents.write().insert(doc.id.clone(), doc);
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn find_one_and_update(
        &self,
        id: &str,
        update: &Update,
        options: FindOneAndUpdateOptions,
    ) -> Result<Option<SessionDocument>> {
        let mut documents = self.documents.write();
        let existing = documents.get(id).cloned();

        let Some(applied) = apply_to_document(id, existing, update, options.upsert)? else {
            return Ok(None);
        };

        documents.insert(id.to_string(), applied.after.clone());
        trace!(session_id = %id, "find_one_and_update applied");

        Ok(match options.return_document {
            ReturnDocument::Before => applied.before,
            ReturnDocument::After => Some(applied.after),
        })
    }

    fn update_one(
        &self,
        id: &str,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateResult> {
        let mut documents = self.documents.write();
        let existing = documents.get(id).cloned();

        let Some(applied) = apply_to_document(id, existing, update, options.upsert)? else {
            return Ok(UpdateResult {
                acknowledged: true,
                ..UpdateResult::default()
            });
        };

        let upserted = applied.before.is_none();
        documents.insert(id.to_string(), applied.after);

        Ok(UpdateResult {
            acknowledged: true,
            matched_count: u64::from(!upserted),
            modified_count: u64::from(applied.modified && !upserted),
            upserted,
        })
    }

    fn delete_many(&self, filter: &Filter) -> Result<DeleteResult> {
        let mut documents = self.documents.write();
        let before = documents.len();
        documents.retain(|_, doc| !filter.matches(doc));

        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: (before - documents.len()) as u64,
        })
    }

    fn find_one(&self, id: &str) -> Result<Option<SessionDocument>> {
        Ok(self.documents.read().get(id).cloned())
    }

    fn count(&self) -> Result<u64> {
        Ok(self.documents.read().len() as u64)
    }
}
