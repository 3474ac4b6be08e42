//! scan command: Extract case-law citations from text
//!
//! Offline: no registry is contacted. LLM-optimized output - JSON compact only.

use crate::extract::extract_citations;
use crate::schema::CandidateReference;
use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::io::{self, Read};
use tokio::fs;

#[derive(Args)]
pub struct ScanArgs {
    /// Text file to extract citations from
    #[arg(value_name = "FILE")]
    file: Option<String>,

    /// Read text from stdin
    #[arg(long)]
    stdin: bool,
}

/// Extraction report (compact)
#[derive(Debug, Serialize)]
pub struct ScanOutput {
    pub total: usize,
    pub citations: Vec<CandidateReference>,
}

/// Run the scan command
pub async fn run_scan(args: ScanArgs) -> Result<()> {
    let text = read_input(args.file.as_deref(), args.stdin, "scan").await?;
    let citations = extract_citations(&text);

    if citations.is_empty() {
        eprintln!("No citations found.");
        std::process::exit(1);
    }

    let output = ScanOutput {
        total: citations.len(),
        citations,
    };
    println!("{}", serde_json::to_string(&output)?);

    Ok(())
}

/// Text from a file or stdin; prints usage and exits when neither is given
pub(crate) async fn read_input(file: Option<&str>, stdin: bool, command: &str) -> Result<String> {
    if stdin {
        let mut text = String::new();
        io::stdin()
            .lock()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }

    if let Some(file) = file {
        return fs::read_to_string(file)
            .await
            .with_context(|| format!("Failed to read file: {}", file));
    }

    eprintln!("Usage:");
    eprintln!("  jurischeck {} <file>     Read text from file", command);
    eprintln!("  jurischeck {} --stdin    Read text from stdin", command);
    std::process::exit(1);
}
