//! Keepsake - differential session persistence with adaptive lifetimes
//!
//! Main entry point for the Keepsake CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

mod commands;

use commands::{collector, config, destroy, gc, lifetime, show};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Keepsake - differential session persistence with adaptive lifetimes
#[derive(Parser)]
#[command(name = "keepsake")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// User config directory (default: platform config dir or KEEPSAKE_CONFIG_DIR)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// SQLite session database (overrides [store] in config)
    #[arg(long, global = true, env = "KEEPSAKE_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one garbage collection pass
    Gc(gc::GcArgs),

    /// Run garbage collection periodically until interrupted
    Collector(collector::CollectorArgs),

    /// Print a stored session document
    Show(show::ShowArgs),

    /// Mark a session as destroyed
    Destroy(destroy::DestroyArgs),

    /// Compute the lifetime for a read count and user agent
    Lifetime(lifetime::LifetimeArgs),

    /// Show the effective configuration and its sources
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = keepsake_config::load_config_with_options(None, cli.config_dir.as_deref())
        .context("failed to load configuration")?;
    let logging = loaded.config.logging();

    // Initialize tracing: console (human-readable, stderr) + rotating JSON file
    let filter = if cli.verbose {
        "keepsake=debug,keepsake_session=debug,keepsake_store=debug,keepsake_config=debug,info"
            .to_string()
    } else {
        let level = &logging.level;
        format!("keepsake={level},keepsake_session={level},keepsake_store={level},warn")
    };

    let log_dir = match &logging.directory {
        Some(dir) => dir.clone(),
        None => cli
            .config_dir
            .clone()
            .or_else(keepsake_config::xdg_config_dir)
            .map(|d| d.join("logs"))
            .unwrap_or_else(|| PathBuf::from("logs")),
    };
    let (file_writer, _guard) = if logging.file {
        let appender = tracing_appender::rolling::daily(&log_dir, "keepsake.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(writer), Some(guard))
    } else {
        (None, None)
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "keepsake=trace,keepsake_session=trace,keepsake_store=trace,keepsake_config=trace,info",
                ))
        }))
        .init();

    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }
    loaded.config.validate().context("invalid configuration")?;

    let ctx = commands::Context {
        json_output: cli.json,
        loaded,
        db_override: cli.db,
    };

    match cli.command {
        Commands::Gc(args) => gc::run(args, &ctx).await,
        Commands::Collector(args) => collector::run(args, &ctx).await,
        Commands::Show(args) => show::run(args, &ctx).await,
        Commands::Destroy(args) => destroy::run(args, &ctx).await,
        Commands::Lifetime(args) => lifetime::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
