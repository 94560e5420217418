//! Collector command - periodic garbage collection until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use keepsake_session::{Collector, CollectorConfig};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::Context;

/// Arguments for the collector command.
#[derive(Args, Debug)]
pub struct CollectorArgs {
    /// Seconds between passes (default: [gc] interval_secs)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Retention of destroyed sessions in seconds (default: [gc] max_lifetime_secs)
    #[arg(long)]
    pub max_lifetime: Option<i64>,
}

#[derive(Debug, Serialize)]
struct CollectorOutput {
    passes: u64,
    failures: u64,
    deleted: u64,
}

/// Run the collector command.
pub async fn run(args: CollectorArgs, ctx: &Context) -> Result<()> {
    let gc = ctx.config().gc();
    let interval_secs = args.interval.unwrap_or(gc.interval_secs);
    anyhow::ensure!(interval_secs > 0, "--interval must be greater than zero");
    let max_lifetime_secs = args.max_lifetime.unwrap_or(gc.max_lifetime_secs);
    anyhow::ensure!(max_lifetime_secs >= 0, "--max-lifetime must not be negative");

    let config = CollectorConfig::default()
        .with_interval(Duration::from_secs(interval_secs))
        .with_max_lifetime(max_lifetime_secs);

    let backend = Arc::new(ctx.backend()?);
    let collector = Collector::new(backend, config);
    let stats = collector.stats();

    let cancel = CancellationToken::new();
    let handle = collector.spawn(cancel.clone());

    if !ctx.json_output {
        println!("Collecting every {interval_secs}s. Press Ctrl-C to stop.");
    }

    tokio::signal::ctrl_c().await?;
    cancel.cancel();
    handle.await?;

    let output = CollectorOutput {
        passes: stats.passes(),
        failures: stats.failures(),
        deleted: stats.deleted(),
    };
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Stopped after {} pass(es): {} deleted, {} failed",
            output.passes, output.deleted, output.failures
        );
    }

    Ok(())
}
