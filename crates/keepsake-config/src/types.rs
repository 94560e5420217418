//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [store]       # where session documents live
//! [lifetime]    # adaptive session lifetime
//! [gc]          # garbage collection schedule
//! [logging]     # log output
//! ```

use std::path::PathBuf;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Default values shared with the session crate's built-in policy.
pub mod defaults {
    pub const MAX_LIFETIME_SECS: i64 = 2_592_000;
    pub const BOT_LIFETIME_SECS: i64 = 30;
    pub const READ_FACTOR_SECS: i64 = 30;
    pub const BOT_PATTERN: &str = "bot|crawl|slurp|spider|mediapartners";
    pub const GC_INTERVAL_SECS: u64 = 300;
    pub const GC_MAX_LIFETIME_SECS: i64 = 3600;
    pub const LOG_LEVEL: &str = "info";
    pub const DATABASE_FILE: &str = "sessions.db";
}

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepsakeConfig {
    /// Document store configuration.
    pub store: Option<StoreConfig>,

    /// Adaptive lifetime configuration.
    pub lifetime: Option<LifetimeConfig>,

    /// Garbage collection configuration.
    pub gc: Option<GcConfig>,

    /// Logging configuration.
    pub logging: Option<LoggingConfig>,
}

impl KeepsakeConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: KeepsakeConfig) {
        if other.store.is_some() {
            self.store = other.store;
        }
        if other.lifetime.is_some() {
            self.lifetime = other.lifetime;
        }
        if other.gc.is_some() {
            self.gc = other.gc;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Effective store section.
    pub fn store(&self) -> StoreConfig {
        self.store.clone().unwrap_or_default()
    }

    /// Effective lifetime section.
    pub fn lifetime(&self) -> LifetimeConfig {
        self.lifetime.clone().unwrap_or_default()
    }

    /// Effective gc section.
    pub fn gc(&self) -> GcConfig {
        self.gc.clone().unwrap_or_default()
    }

    /// Effective logging section.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Check every section for out-of-range or malformed values.
    pub fn validate(&self) -> Result<()> {
        self.lifetime().validate()?;
        self.gc().validate()?;
        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.into(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Which document store backs the sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process only; sessions vanish on exit.
    Memory,
    /// SQLite database file.
    #[default]
    Sqlite,
}

/// Document store configuration.
///
/// ```toml
/// [store]
/// backend = "sqlite"
/// path = "/var/lib/keepsake/sessions.db"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Database file; defaults to the platform data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Database path, falling back to `<data dir>/keepsake/sessions.db`.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => dirs::data_dir()
                .map(|d| d.join("keepsake").join(defaults::DATABASE_FILE))
                .ok_or(ConfigError::NoDatabasePath),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifetime Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Adaptive lifetime configuration.
///
/// ```toml
/// [lifetime]
/// max_lifetime_secs = 2592000
/// bot_lifetime_secs = 30
/// read_factor_secs = 30
/// bot_pattern = "bot|crawl|slurp|spider|mediapartners"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifetimeConfig {
    /// Upper bound on any session lifetime.
    pub max_lifetime_secs: i64,
    /// Fixed lifetime for clients matching `bot_pattern`.
    pub bot_lifetime_secs: i64,
    /// Seconds per cubed read.
    pub read_factor_secs: i64,
    /// Case-insensitive regex identifying bots by user agent.
    pub bot_pattern: String,
}

impl Default for LifetimeConfig {
    fn default() -> Self {
        Self {
            max_lifetime_secs: defaults::MAX_LIFETIME_SECS,
            bot_lifetime_secs: defaults::BOT_LIFETIME_SECS,
            read_factor_secs: defaults::READ_FACTOR_SECS,
            bot_pattern: defaults::BOT_PATTERN.to_string(),
        }
    }
}

impl LifetimeConfig {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("lifetime.max_lifetime_secs", self.max_lifetime_secs),
            ("lifetime.bot_lifetime_secs", self.bot_lifetime_secs),
            ("lifetime.read_factor_secs", self.read_factor_secs),
        ] {
            if value < 0 {
                return Err(invalid(field, "must not be negative"));
            }
        }

        RegexBuilder::new(&self.bot_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| invalid("lifetime.bot_pattern", e.to_string()))?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GC Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Garbage collection configuration.
///
/// ```toml
/// [gc]
/// interval_secs = 300
/// max_lifetime_secs = 3600
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcConfig {
    /// Seconds between collection passes.
    pub interval_secs: u64,
    /// Retention of destroyed sessions.
    pub max_lifetime_secs: i64,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::GC_INTERVAL_SECS,
            max_lifetime_secs: defaults::GC_MAX_LIFETIME_SECS,
        }
    }
}

impl GcConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(invalid("gc.interval_secs", "must be greater than zero"));
        }
        if self.max_lifetime_secs < 0 {
            return Err(invalid("gc.max_lifetime_secs", "must not be negative"));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration.
///
/// ```toml
/// [logging]
/// level = "info"
/// file = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console filter level when not running verbose.
    pub level: String,
    /// Also write JSON logs to a daily rotating file.
    pub file: bool,
    /// Directory for log files; defaults to `<config dir>/logs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            file: true,
            directory: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = KeepsakeConfig::from_toml("").unwrap();
        assert_eq!(config.store().backend, StoreBackend::Sqlite);
        assert_eq!(config.lifetime().max_lifetime_secs, 2_592_000);
        assert_eq!(config.gc().interval_secs, 300);
        assert_eq!(config.logging().level, "info");
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full_config() {
        let config = KeepsakeConfig::from_toml(
            r#"
[store]
backend = "memory"

[lifetime]
bot_lifetime_secs = 10
bot_pattern = "curl|wget"

[gc]
interval_secs = 60
max_lifetime_secs = 120

[logging]
level = "debug"
file = false
"#,
        )
        .unwrap();

        assert_eq!(config.store().backend, StoreBackend::Memory);
        let lifetime = config.lifetime();
        assert_eq!(lifetime.bot_lifetime_secs, 10);
        assert_eq!(lifetime.read_factor_secs, 30);
        assert_eq!(lifetime.bot_pattern, "curl|wget");
        assert_eq!(config.gc().interval(), std::time::Duration::from_secs(60));
        assert!(!config.logging().file);
    }

    #[test]
    fn test_merge_overrides_present_sections() {
        let mut base = KeepsakeConfig::from_toml("[gc]\ninterval_secs = 60\n[logging]\nlevel = \"warn\"").unwrap();
        let project = KeepsakeConfig::from_toml("[gc]\ninterval_secs = 10").unwrap();

        base.merge(project);
        assert_eq!(base.gc().interval_secs, 10);
        assert_eq!(base.logging().level, "warn");
    }

    #[test]
    fn test_round_trip_toml() {
        let config = KeepsakeConfig {
            store: Some(StoreConfig {
                backend: StoreBackend::Sqlite,
                path: Some(PathBuf::from("/tmp/sessions.db")),
            }),
            gc: Some(GcConfig::default()),
            ..KeepsakeConfig::default()
        };

        let parsed = KeepsakeConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = KeepsakeConfig::from_toml("[gc]\ninterval_secs = 0").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "gc.interval_secs"));
    }

    #[test]
    fn test_validate_rejects_bad_pattern() {
        let config = KeepsakeConfig::from_toml("[lifetime]\nbot_pattern = \"(bot\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_lifetime() {
        let config = KeepsakeConfig::from_toml("[lifetime]\nmax_lifetime_secs = -1").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_store_path() {
        let store = StoreConfig {
            backend: StoreBackend::Sqlite,
            path: Some(PathBuf::from("/srv/sessions.db")),
        };
        assert_eq!(store.resolved_path().unwrap(), PathBuf::from("/srv/sessions.db"));
    }
}
