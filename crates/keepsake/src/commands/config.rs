//! Config command - effective configuration and where it came from.

use anyhow::Result;
use clap::Args;
use keepsake_config::KeepsakeConfig;
use serde::Serialize;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Only list the config files that were checked
    #[arg(long)]
    pub sources: bool,
}

#[derive(Debug, Serialize)]
struct SourceOutput {
    path: String,
    loaded: bool,
}

#[derive(Debug, Serialize)]
struct ConfigOutput {
    sources: Vec<SourceOutput>,
    warnings: Vec<String>,
    config: KeepsakeConfig,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    let config = ctx.config();
    // Fill in defaults so every section is shown.
    let effective = KeepsakeConfig {
        store: Some(config.store()),
        lifetime: Some(config.lifetime()),
        gc: Some(config.gc()),
        logging: Some(config.logging()),
    };

    if ctx.json_output {
        let output = ConfigOutput {
            sources: ctx
                .loaded
                .sources
                .iter()
                .map(|s| SourceOutput {
                    path: s.path.display().to_string(),
                    loaded: s.loaded,
                })
                .collect(),
            warnings: ctx.loaded.warnings.clone(),
            config: effective,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("# Sources (lowest precedence first)");
    for source in &ctx.loaded.sources {
        let marker = if source.loaded { "loaded" } else { "not found" };
        println!("#   {} ({marker})", source.path.display());
    }
    if let Some(ref db) = ctx.db_override {
        println!("#   --db {} overrides [store]", db.display());
    }
    for warning in &ctx.loaded.warnings {
        println!("# warning: {warning}");
    }

    if !args.sources {
        println!();
        print!("{}", effective.to_toml()?);
    }

    Ok(())
}
