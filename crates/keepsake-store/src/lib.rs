//! Document store boundary for Keepsake session persistence.
//!
//! Sessions are persisted as one document per session identifier. This crate
//! owns that document shape and the primitive operations the persistence
//! layer relies on:
//! - `find_one_and_update` with optional upsert, for reads
//! - non-upserting `update_one`, for writes and destroys
//! - `delete_many` over a store-evaluated [`Filter`], for garbage collection
//!
//! Two stores are provided: [`MemoryDocumentStore`] (tests, single process)
//! and [`SqliteDocumentStore`] (persistent, shared between processes).

mod document;
mod error;
mod filter;
mod memory;
mod sqlite;
mod store;
mod update;

pub use document::{SessionDocument, timestamp_value};
pub use error::{Result, StoreError};
pub use filter::Filter;
pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;
pub use store::{
    DeleteResult, DocumentStore, FindOneAndUpdateOptions, ReturnDocument, UpdateOptions,
    UpdateResult,
};
pub use update::Update;
