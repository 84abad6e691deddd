//! collection-reconcile: audit and repair an NFT collection
//!
//! Reads the collection from a DAS index, checks every member against the
//! expected contract, and repairs unverified membership links through an
//! external signer.
//!
//! ## Commands
//!
//! - **audit**: Fetch the whole collection and print a consistency report
//! - **repair**: Verify membership links for explicit ids or all unverified members
//! - **inspect**: Show what the index currently holds for specific members
//! - **retarget**: Point metadata URIs at a new content address
//!
//! ## Example Usage
//!
//! ```bash
//! # Audit a collection
//! collection-reconcile audit --collection BgfA... --content-id bafy... \
//!     --name-prefix "Mini #" --symbol MNFT --royalty-bps 500 --creator 7xKX...
//!
//! # Repair every unverified member found by a fresh fetch
//! collection-reconcile repair --collection BgfA... --unverified \
//!     --signer-cmd "node sign.js"
//!
//! # Preview a URI retarget
//! collection-reconcile retarget --collection BgfA... --content-id bafyNEW --dry-run
//! ```
//!
//! Exit status is 0 when the run is clean, 1 when issues or failures remain,
//! and 2 when the run could not start (bad configuration, unreachable index).

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod reconcile_cli;

use reconcile_cli::{
    audit::AuditCmd, inspect::InspectCmd, output::format_error, repair::RepairCmd,
    retarget::RetargetCmd, GlobalOpts,
};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "collection-reconcile",
    author,
    version,
    about = "Audit and repair NFT collection consistency",
    long_about = "Checks every member of a collection against an expected contract \
                  (symbol, royalty, creators, content address, membership) and repairs \
                  unverified membership links through an external signer."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// DAS index endpoint (falls back to RECONCILE_INDEX_URL, HELIUS_DAS, SOLANA_RPC)
    #[arg(long, global = true)]
    index_url: Option<String>,

    /// Network used to pick a default endpoint
    #[arg(long, global = true, default_value = "devnet")]
    network: String,

    /// Output as JSON instead of human-readable format
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the collection and report consistency issues
    Audit(AuditCmd),

    /// Verify membership links and wait for the index to confirm
    Repair(RepairCmd),

    /// Show indexed state for specific members
    Inspect(InspectCmd),

    /// Rewrite metadata URIs to a new content address
    Retarget(RetargetCmd),
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Cancel `token` on the first Ctrl-C. An in-flight mutation still finishes
/// and the rest of the batch is reported as skipped.
fn watch_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, no further mutations will be issued");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> ExitCode {
    let Cli {
        command,
        index_url,
        network,
        json,
        verbose,
    } = Cli::parse();
    init_tracing(verbose);

    let cancel = CancellationToken::new();
    watch_interrupt(cancel.clone());

    let opts = GlobalOpts {
        index_url,
        network,
        json,
        cancel,
    };

    let result = match command {
        Commands::Audit(cmd) => cmd.execute(&opts).await,
        Commands::Repair(cmd) => cmd.execute(&opts).await,
        Commands::Inspect(cmd) => cmd.execute(&opts).await,
        Commands::Retarget(cmd) => cmd.execute(&opts).await,
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("{}", format_error(&e, json));
            ExitCode::from(2)
        }
    }
}
