//! Gc command - one garbage collection pass.

use anyhow::Result;
use clap::Args;
use console::Style;
use serde::Serialize;

use super::Context;

/// Arguments for the gc command.
#[derive(Args, Debug)]
pub struct GcArgs {
    /// Retention of destroyed sessions in seconds (default: [gc] max_lifetime_secs)
    #[arg(long)]
    pub max_lifetime: Option<i64>,
}

#[derive(Debug, Serialize)]
struct GcOutput {
    deleted: u64,
    max_lifetime_secs: i64,
}

/// Run the gc command.
pub async fn run(args: GcArgs, ctx: &Context) -> Result<()> {
    let max_lifetime_secs = args
        .max_lifetime
        .unwrap_or_else(|| ctx.config().gc().max_lifetime_secs);
    anyhow::ensure!(max_lifetime_secs >= 0, "--max-lifetime must not be negative");

    let backend = ctx.backend()?;
    let deleted = backend.try_collect(max_lifetime_secs)?;

    if ctx.json_output {
        let output = GcOutput {
            deleted,
            max_lifetime_secs,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let dim = Style::new().dim();
        println!(
            "Deleted {} expired session(s) {}",
            deleted,
            dim.apply_to(format!("(destroyed retention {}s)", max_lifetime_secs))
        );
    }

    Ok(())
}
