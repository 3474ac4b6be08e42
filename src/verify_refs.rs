//! verify command: Confirm extracted citations against the registries
//!
//! Every citation found in the input is looked up on each enabled registry:
//! - verified: at least one registry returned a matching decision
//! - not_found: no registry confirmed it (listed with the sources attempted)
//!
//! Configuration problems abort before any input is read.

use crate::config::{Config, CredentialOverrides};
use crate::extract::extract_citations;
use crate::scan::read_input;
use crate::schema::{SourceId, VerificationRecord};
use crate::verifier::VerificationService;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args)]
pub struct VerifyArgs {
    /// Text file to extract and verify citations from
    #[arg(value_name = "FILE")]
    file: Option<String>,

    /// Read text from stdin
    #[arg(long)]
    stdin: bool,

    /// Registry configuration (default: built-in public endpoints)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Judilibre API key
    #[arg(long, env = "JUDILIBRE_API_KEY", hide_env_values = true)]
    judilibre_api_key: Option<String>,

    /// Légifrance OAuth client id
    #[arg(long, env = "LEGIFRANCE_CLIENT_ID", hide_env_values = true)]
    legifrance_client_id: Option<String>,

    /// Légifrance OAuth client secret
    #[arg(long, env = "LEGIFRANCE_CLIENT_SECRET", hide_env_values = true)]
    legifrance_client_secret: Option<String>,
}

/// Summary of verification results
#[derive(Debug, Serialize)]
pub struct VerifySummary {
    pub total: usize,
    pub verified: usize,
    pub not_found: usize,
    /// Records where at least one registry gave no answer
    pub incomplete: usize,
    pub sources: Vec<SourceId>,
}

/// Output for JSON
#[derive(Debug, Serialize)]
pub struct VerifyOutput {
    pub summary: VerifySummary,
    pub results: Vec<VerificationRecord>,
    pub timestamp: String,
}

pub async fn run_verify(args: VerifyArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .await
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_credentials(&CredentialOverrides {
        judilibre_api_key: args.judilibre_api_key.clone(),
        legifrance_client_id: args.legifrance_client_id.clone(),
        legifrance_client_secret: args.legifrance_client_secret.clone(),
    });
    let service = VerificationService::from_config(&config).context("Invalid configuration")?;

    let text = read_input(args.file.as_deref(), args.stdin, "verify").await?;
    let mut citations = extract_citations(&text);

    if citations.is_empty() {
        eprintln!("No citations found.");
        std::process::exit(1);
    }

    let sources = service.sources();
    eprintln!(
        "Verifying {} citations against {} registries...",
        citations.len(),
        sources.len()
    );

    let results = service
        .verify_all_with_progress(&mut citations, |done, total| {
            eprintln!("  -> {}/{}", done, total);
        })
        .await;

    let summary = summarize(&results, sources);
    eprintln!("Done: {}/{} verified", summary.verified, summary.total);

    let output = VerifyOutput {
        summary,
        results,
        timestamp: Utc::now().to_rfc3339(),
    };
    println!("{}", serde_json::to_string(&output)?);

    Ok(())
}

fn summarize(results: &[VerificationRecord], sources: Vec<SourceId>) -> VerifySummary {
    let verified = results.iter().filter(|r| r.is_verified()).count();
    VerifySummary {
        total: results.len(),
        verified,
        not_found: results.len() - verified,
        incomplete: results
            .iter()
            .filter(|r| !r.failures.is_empty() || r.error.is_some())
            .count(),
        sources,
    }
}
