//! Destroy command - mark a session destroyed.

use anyhow::{Result, bail};
use clap::Args;

use super::Context;

/// Arguments for the destroy command.
#[derive(Args, Debug)]
pub struct DestroyArgs {
    /// Session identifier
    pub id: String,
}

/// Run the destroy command.
pub async fn run(args: DestroyArgs, ctx: &Context) -> Result<()> {
    let backend = ctx.backend()?;
    if backend.store().find_one(&args.id)?.is_none() {
        bail!("session '{}' not found", args.id);
    }

    let acknowledged = backend.try_destroy(&args.id)?;

    if ctx.json_output {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "id": args.id,
                "destroyed": acknowledged,
            }))?
        );
    } else if acknowledged {
        println!("Destroyed session {}", args.id);
    } else {
        bail!("store did not acknowledge destroying session '{}'", args.id);
    }

    Ok(())
}
