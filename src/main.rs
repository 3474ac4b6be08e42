//! jurischeck CLI
//!
//! Extracts French case-law citations from text and confirms them against
//! Judilibre and Légifrance. JSON on stdout, logs and progress on stderr.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use jurischeck::init::{run_init, InitArgs};
use jurischeck::scan::{run_scan, ScanArgs};
use jurischeck::verify_refs::{run_verify, VerifyArgs};

#[derive(Parser)]
#[command(name = "jurischeck")]
#[command(version)]
#[command(about = "Case-law citation extraction and registry verification")]
#[command(long_about = "Finds French case-law citations in free text and checks them against official registries.\n\nCommands:\n  scan     Extract citations (offline)\n  verify   Extract and confirm citations on Judilibre / Légifrance\n  init     Create a registries.yaml template")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract citations from a text file or stdin
    Scan(ScanArgs),
    /// Extract citations and verify them against the registries
    Verify(VerifyArgs),
    /// Create a registries.yaml configuration template
    Init(InitArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the JSON report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan(args) => run_scan(args).await,
        Commands::Verify(args) => run_verify(args).await,
        Commands::Init(args) => run_init(args).await,
    }
}
