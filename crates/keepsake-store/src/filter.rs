//! Store-evaluated document selectors.

use chrono::{DateTime, Utc};

use crate::document::SessionDocument;

/// Selects documents for deletion.
///
/// Filters are evaluated inside the store (as a SQL predicate, or under the
/// memory store's lock), never by fetching documents to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// The document with this identifier.
    ById(String),

    /// Sessions past their retention window.
    ///
    /// Matches documents that are either destroyed with `destroyed_at`
    /// before `destroyed_before`, or not destroyed and not read within their
    /// own persisted lifetime as of `now`.
    Expired {
        destroyed_before: DateTime<Utc>,
        now: DateTime<Utc>,
        fallback_lifetime_secs: i64,
    },
}

impl Filter {
    /// Build the garbage collection predicate for a pass running at `now`.
    ///
    /// `max_lifetime_secs` only bounds destroyed documents; live documents
    /// are judged by their own stored lifetime.
    pub fn expired(now: DateTime<Utc>, max_lifetime_secs: i64, fallback_lifetime_secs: i64) -> Self {
        let destroyed_before = DateTime::from_timestamp_millis(
            now.timestamp_millis()
                .saturating_sub(max_lifetime_secs.saturating_mul(1000)),
        )
        .unwrap_or(DateTime::UNIX_EPOCH);

        Filter::Expired {
            destroyed_before,
            now,
            fallback_lifetime_secs,
        }
    }

    /// Whether `doc` is selected by this filter.
    pub fn matches(&self, doc: &SessionDocument) -> bool {
        match self {
            Filter::ById(id) => doc.id == *id,
            Filter::Expired {
                destroyed_before,
                now,
                fallback_lifetime_secs,
            } => {
                doc.destroyed_before(*destroyed_before)
                    || doc.idle_beyond_lifetime(*now, *fallback_lifetime_secs)
            }
        }
    }
}
