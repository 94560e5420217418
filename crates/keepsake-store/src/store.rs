//! The document store trait and its option/result types.

use crate::document::SessionDocument;
use crate::error::Result;
use crate::filter::Filter;
use crate::update::Update;

/// Which version of the document `find_one_and_update` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReturnDocument {
    /// The document as it was before the update.
    Before,
    /// The document as it is after the update.
    #[default]
    After,
}

/// Options for [`DocumentStore::find_one_and_update`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOneAndUpdateOptions {
    pub return_document: ReturnDocument,
    /// Create the document when it does not exist.
    pub upsert: bool,
}

impl FindOneAndUpdateOptions {
    /// Return the post-update document, creating it if needed.
    pub fn upsert_returning_after() -> Self {
        Self {
            return_document: ReturnDocument::After,
            upsert: true,
        }
    }
}

/// Options for [`DocumentStore::update_one`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Create the document when it does not exist.
    pub upsert: bool,
}

/// Outcome of [`DocumentStore::update_one`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    /// Set when the update created the document.
    pub upserted: bool,
}

/// Outcome of [`DocumentStore::delete_many`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Primitive operations on session documents.
///
/// Every operation is atomic with respect to a single document. Callers
/// coordinate across requests only through these operations.
pub trait DocumentStore: Send + Sync {
    /// Atomically apply `update` to the document `id` and return it.
    ///
    /// Returns `Ok(None)` when the document does not exist and `upsert` is
    /// off, or when `Before` is requested for a freshly upserted document.
    fn find_one_and_update(
        &self,
        id: &str,
        update: &Update,
        options: FindOneAndUpdateOptions,
    ) -> Result<Option<SessionDocument>>;

    /// Apply `update` to the document `id`.
    fn update_one(&self, id: &str, update: &Update, options: UpdateOptions)
    -> Result<UpdateResult>;

    /// Delete every document selected by `filter`.
    fn delete_many(&self, filter: &Filter) -> Result<DeleteResult>;

    /// Fetch a document without modifying it.
    fn find_one(&self, id: &str) -> Result<Option<SessionDocument>>;

    /// Number of stored documents.
    fn count(&self) -> Result<u64>;
}
