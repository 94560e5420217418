//! Lifetime command - evaluate the adaptive lifetime policy.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use super::{Context, format_secs};

/// Arguments for the lifetime command.
#[derive(Args, Debug)]
pub struct LifetimeArgs {
    /// Number of times the session has been read
    pub reads: u32,

    /// Client user agent
    #[arg(long, default_value = "")]
    pub user_agent: String,
}

#[derive(Debug, Serialize)]
struct LifetimeOutput {
    reads: u32,
    user_agent: String,
    bot: bool,
    lifetime_secs: i64,
}

/// Run the lifetime command.
pub async fn run(args: LifetimeArgs, ctx: &Context) -> Result<()> {
    let policy = ctx.policy()?;
    let lifetime_secs = policy.calculate(i64::from(args.reads), &args.user_agent);
    let bot = policy.is_bot(&args.user_agent);

    if ctx.json_output {
        let output = LifetimeOutput {
            reads: args.reads,
            user_agent: args.user_agent,
            bot,
            lifetime_secs,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let kind = if bot { " (bot)" } else { "" };
        println!("{lifetime_secs}s = {}{kind}", format_secs(lifetime_secs));
    }

    Ok(())
}
