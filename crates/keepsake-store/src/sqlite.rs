//! Session document store backed by SQLite.
//!
//! Documents are kept one row per session. Metadata fields get their own
//! columns so garbage collection runs as a single `DELETE ... WHERE`;
//! namespace data is stored as a JSON object. Timestamps are Unix
//! milliseconds.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Transaction, TransactionBehavior, params};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::document::SessionDocument;
use crate::error::{Result, StoreError};
use crate::filter::Filter;
use crate::store::{
    DeleteResult, DocumentStore, FindOneAndUpdateOptions, ReturnDocument, UpdateOptions,
    UpdateResult,
};
use crate::update::{Update, apply_to_document};

/// Current schema version for migrations.
const SCHEMA_VERSION: i32 = 1;

/// SQLite-backed session store.
///
/// Thread-safe via an internal connection mutex. Every operation runs in one
/// immediate transaction, so concurrent processes sharing the database file
/// are serialized by SQLite's write lock.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDocumentStore").finish_non_exhaustive()
    }
}

/// Raw column values of one row, before conversion.
struct SessionRow {
    id: String,
    data: String,
    reads: i64,
    last_read_at: i64,
    updated_at: Option<i64>,
    destroyed_at: Option<i64>,
    lifetime: Option<i64>,
    user_agent: Option<String>,
    destroyed: bool,
}

impl SqliteDocumentStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;

        info!("Session store opened at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        let current_version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if current_version >= SCHEMA_VERSION {
            debug!("Schema up to date (version {})", current_version);
            return Ok(());
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL DEFAULT '{}',
                reads INTEGER NOT NULL DEFAULT 0,
                last_read_at INTEGER NOT NULL,
                updated_at INTEGER,
                destroyed_at INTEGER,
                lifetime INTEGER,
                user_agent TEXT,
                destroyed INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_last_read_at
                ON sessions(last_read_at);

            CREATE INDEX IF NOT EXISTS idx_sessions_destroyed
                ON sessions(destroyed, destroyed_at);
            "#,
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        info!("Schema created (version {})", SCHEMA_VERSION);
        Ok(())
    }

    /// Run `f` inside one immediate transaction.
    fn with_transaction<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn load(conn: &Connection, id: &str) -> Result<Option<SessionDocument>> {
    let row = conn
        .query_row(
            "SELECT id, data, reads, last_read_at, updated_at, destroyed_at, lifetime, user_agent, destroyed
             FROM sessions WHERE id = ?1",
            params![id],
            |row| {
                Ok(SessionRow {
                    id: row.get(0)?,
                    data: row.get(1)?,
                    reads: row.get(2)?,
                    last_read_at: row.get(3)?,
                    updated_at: row.get(4)?,
                    destroyed_at: row.get(5)?,
                    lifetime: row.get(6)?,
                    user_agent: row.get(7)?,
                    destroyed: row.get::<_, i32>(8)? != 0,
                })
            },
        )
        .optional()?;

    row.map(row_to_document).transpose()
}

fn save(conn: &Connection, doc: &SessionDocument) -> Result<()> {
    let data = serde_json::to_string(&Value::Object(doc.data.clone()))?;
    conn.execute(
        "INSERT INTO sessions (id, data, reads, last_read_at, updated_at, destroyed_at, lifetime, user_agent, destroyed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
            data = excluded.data,
            reads = excluded.reads,
            last_read_at = excluded.last_read_at,
            updated_at = excluded.updated_at,
            destroyed_at = excluded.destroyed_at,
            lifetime = excluded.lifetime,
            user_agent = excluded.user_agent,
            destroyed = excluded.destroyed",
        params![
            doc.id,
            data,
            doc.reads,
            doc.last_read_at.timestamp_millis(),
            doc.updated_at.map(|t| t.timestamp_millis()),
            doc.destroyed_at.map(|t| t.timestamp_millis()),
            doc.lifetime,
            doc.user_agent,
            doc.destroyed as i32,
        ],
    )?;
    Ok(())
}

fn row_to_document(row: SessionRow) -> Result<SessionDocument> {
    let data: Map<String, Value> = match serde_json::from_str(&row.data)? {
        Value::Object(map) => map,
        _ => {
            return Err(StoreError::InvalidDocument(format!(
                "data of session {} is not an object",
                row.id
            )));
        }
    };

    Ok(SessionDocument {
        last_read_at: from_millis(&row.id, row.last_read_at)?,
        updated_at: row.updated_at.map(|ms| from_millis(&row.id, ms)).transpose()?,
        destroyed_at: row
            .destroyed_at
            .map(|ms| from_millis(&row.id, ms))
            .transpose()?,
        id: row.id,
        data,
        reads: row.reads,
        lifetime: row.lifetime,
        user_agent: row.user_agent,
        destroyed: row.destroyed,
    })
}

fn from_millis(id: &str, ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::InvalidDocument(format!("session {id}: timestamp {ms} out of range")))
}

impl DocumentStore for SqliteDocumentStore {
    fn find_one_and_update(
        &self,
        id: &str,
        update: &Update,
        options: FindOneAndUpdateOptions,
    ) -> Result<Option<SessionDocument>> {
        self.with_transaction(|tx| {
            let existing = load(tx, id)?;
            let Some(applied) = apply_to_document(id, existing, update, options.upsert)? else {
                return Ok(None);
            };
            save(tx, &applied.after)?;

            Ok(match options.return_document {
                ReturnDocument::Before => applied.before,
                ReturnDocument::After => Some(applied.after),
            })
        })
    }

    fn update_one(
        &self,
        id: &str,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateResult> {
        self.with_transaction(|tx| {
            let existing = load(tx, id)?;
            let Some(applied) = apply_to_document(id, existing, update, options.upsert)? else {
                return Ok(UpdateResult {
                    acknowledged: true,
                    ..UpdateResult::default()
                });
            };

            let upserted = applied.before.is_none();
            if applied.modified {
                save(tx, &applied.after)?;
            }

            Ok(UpdateResult {
                acknowledged: true,
                matched_count: u64::from(!upserted),
                modified_count: u64::from(applied.modified && !upserted),
                upserted,
            })
        })
    }

    fn delete_many(&self, filter: &Filter) -> Result<DeleteResult> {
        let conn = self.conn.lock();

        let deleted = match filter {
            Filter::ById(id) => conn.execute("DELETE FROM sessions WHERE id = ?1", params![id])?,
            Filter::Expired {
                destroyed_before,
                now,
                fallback_lifetime_secs,
            } => conn.execute(
                "DELETE FROM sessions
                 WHERE (destroyed = 1 AND destroyed_at IS NOT NULL AND destroyed_at < ?1)
                    OR (destroyed = 0 AND last_read_at < ?2 - COALESCE(lifetime, ?3) * 1000)",
                params![
                    destroyed_before.timestamp_millis(),
                    now.timestamp_millis(),
                    fallback_lifetime_secs,
                ],
            )?,
        };

        debug!(deleted, "delete_many completed");
        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: deleted as u64,
        })
    }

    fn find_one(&self, id: &str) -> Result<Option<SessionDocument>> {
        let conn = self.conn.lock();
        load(&conn, id)
    }

    fn count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
