//! CLI command handlers.

pub mod collector;
pub mod config;
pub mod destroy;
pub mod gc;
pub mod lifetime;
pub mod show;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use keepsake_config::{KeepsakeConfig, LoadedConfig, StoreBackend};
use keepsake_session::{LifetimePolicy, SessionBackend};
use keepsake_store::{DocumentStore, MemoryDocumentStore, SqliteDocumentStore};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Discovered configuration.
    pub loaded: LoadedConfig,
    /// Database path given on the command line.
    pub db_override: Option<PathBuf>,
}

impl Context {
    pub fn config(&self) -> &KeepsakeConfig {
        &self.loaded.config
    }

    /// Lifetime policy built from the `[lifetime]` section.
    pub fn policy(&self) -> Result<LifetimePolicy> {
        let lifetime = self.config().lifetime();
        Ok(LifetimePolicy::new()
            .with_max_lifetime(lifetime.max_lifetime_secs)
            .with_bot_lifetime(lifetime.bot_lifetime_secs)
            .with_read_factor(lifetime.read_factor_secs)
            .with_bot_pattern(&lifetime.bot_pattern)?)
    }

    /// Open the configured store. `--db` always selects SQLite.
    pub fn open_store(&self) -> Result<Arc<dyn DocumentStore>> {
        if let Some(ref path) = self.db_override {
            return Ok(Arc::new(SqliteDocumentStore::open(path)?));
        }

        let store = self.config().store();
        match store.backend {
            StoreBackend::Sqlite => Ok(Arc::new(SqliteDocumentStore::open(
                store.resolved_path()?,
            )?)),
            StoreBackend::Memory => {
                tracing::warn!("Using the memory store; nothing persists past this command");
                Ok(Arc::new(MemoryDocumentStore::new()))
            }
        }
    }

    /// Session backend over the configured store and policy.
    pub fn backend(&self) -> Result<SessionBackend<dyn DocumentStore>> {
        Ok(SessionBackend::new(self.open_store()?).with_policy(self.policy()?))
    }
}

/// Human-readable rendering of a lifetime in seconds.
pub fn format_secs(secs: i64) -> String {
    if secs <= 0 {
        return "0s".to_string();
    }
    let (days, rest) = (secs / 86_400, secs % 86_400);
    let (hours, rest) = (rest / 3600, rest % 3600);
    let (minutes, seconds) = (rest / 60, rest % 60);

    [(days, "d"), (hours, "h"), (minutes, "m"), (seconds, "s")]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, unit)| format!("{n}{unit}"))
        .collect::<Vec<_>>()
        .join(" ")
}
