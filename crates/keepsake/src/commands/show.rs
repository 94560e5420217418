//! Show command - print a stored session document.

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};

use super::{Context, format_secs};

/// Arguments for the show command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Session identifier
    pub id: String,
}

/// Run the show command.
pub async fn run(args: ShowArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let Some(doc) = store.find_one(&args.id)? else {
        bail!("session '{}' not found", args.id);
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let status = if doc.destroyed {
        Style::new().red().apply_to("destroyed")
    } else {
        Style::new().green().apply_to("live")
    };

    println!();
    println!("{}", style(format!("Session {}", doc.id)).bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!("  {} {}", dim.apply_to("Status:"), status);
    println!("  {} {}", dim.apply_to("Reads:"), doc.reads);
    println!("  {} {}", dim.apply_to("Last read:"), doc.last_read_at.to_rfc3339());
    if let Some(updated_at) = doc.updated_at {
        println!("  {} {}", dim.apply_to("Updated:"), updated_at.to_rfc3339());
    }
    if let Some(destroyed_at) = doc.destroyed_at {
        println!("  {} {}", dim.apply_to("Destroyed:"), destroyed_at.to_rfc3339());
    }
    match doc.lifetime {
        Some(lifetime) => println!(
            "  {} {} ({})",
            dim.apply_to("Lifetime:"),
            lifetime,
            format_secs(lifetime)
        ),
        None => println!("  {} {}", dim.apply_to("Lifetime:"), dim.apply_to("never written")),
    }
    if let Some(ref user_agent) = doc.user_agent {
        println!("  {} {}", dim.apply_to("User agent:"), user_agent);
    }
    println!();
    println!("{}", serde_json::to_string_pretty(&doc.data)?);
    println!();

    Ok(())
}
