//! Configuration system for Keepsake.
//!
//! Provides TOML-based configuration with:
//! - Store selection (`[store]`: memory or SQLite, database path)
//! - Adaptive lifetime tuning (`[lifetime]`)
//! - Garbage collection schedule (`[gc]`)
//! - Log output (`[logging]`)
//! - Config file layering (user config dir + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
