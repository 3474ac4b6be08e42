//! init command: Create registries.yaml template
//!
//! Writes the default configuration (public endpoints, empty credentials).
//! Credentials can stay empty in the file and come from the environment.

use crate::config::Config;
use anyhow::{bail, Result};
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args)]
pub struct InitArgs {
    /// Output file path (default: registries.yaml)
    #[arg(short, long, default_value = "registries.yaml")]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub created: String,
    pub file: String,
}

pub async fn run_init(args: InitArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        let error = serde_json::json!({
            "error": "file_exists",
            "message": format!("{} already exists. Use --force to overwrite.", args.output.display()),
            "file": args.output.display().to_string()
        });
        println!("{}", serde_json::to_string(&error)?);
        bail!("File exists");
    }

    let yaml = Config::default().to_yaml()?;
    tokio::fs::write(&args.output, yaml).await?;

    let output = InitOutput {
        created: Utc::now().to_rfc3339(),
        file: args.output.display().to_string(),
    };
    println!("{}", serde_json::to_string(&output)?);

    Ok(())
}
