//! Flag groups and their resolution against the environment.
//!
//! Every setting reads the CLI flag first, then the environment, then a
//! default. Problems surface as [`ConfigError`], the only errors that stop a
//! run before it starts.

use anyhow::{Context, Result};
use clap::Args;
use reconcile_core::MutationQueue;
use reconcile_transport::network::resolve_index_endpoint;
use reconcile_transport::{AuthorityIdentity, DasClient, SignerCommandLedger};
use reconcile_types::{env_non_empty, ConfigError, ExpectedContract, PollPolicy};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use super::GlobalOpts;

/// The expected contract, one flag per field.
///
/// Only `--collection` is always required; the rest are checked when the
/// command actually evaluates rules.
#[derive(Args, Debug, Clone)]
pub struct ContractArgs {
    /// Collection mint the members must be verified under
    #[arg(long)]
    pub collection: String,

    /// Content id (CID) expected in metadata and image URIs
    #[arg(long)]
    pub content_id: Option<String>,

    /// Prefix every display name must start with
    #[arg(long)]
    pub name_prefix: Option<String>,

    /// Expected symbol
    #[arg(long)]
    pub symbol: Option<String>,

    /// Expected royalty in basis points
    #[arg(long)]
    pub royalty_bps: Option<u16>,

    /// Address that must be listed as a verified creator
    #[arg(long)]
    pub creator: Option<String>,
}

impl ContractArgs {
    pub fn resolve(&self) -> Result<ExpectedContract, ConfigError> {
        fn required<T: Clone>(value: &Option<T>, field: &'static str) -> Result<T, ConfigError> {
            value.clone().ok_or(ConfigError::MissingField(field))
        }
        ExpectedContract::new(
            self.collection.clone(),
            required(&self.content_id, "content id")?,
            required(&self.name_prefix, "name prefix")?,
            required(&self.symbol, "symbol")?,
            required(&self.royalty_bps, "royalty bps")?,
            required(&self.creator, "creator")?,
        )
    }
}

/// Propagation polling overrides.
#[derive(Args, Debug, Clone, Default)]
pub struct PollArgs {
    /// Index reads per member before reporting a propagation timeout
    #[arg(long)]
    pub poll_attempts: Option<u32>,

    /// Milliseconds between index reads
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,
}

impl PollArgs {
    pub fn resolve(&self) -> PollPolicy {
        let env = PollPolicy::from_env();
        PollPolicy {
            max_attempts: self.poll_attempts.unwrap_or(env.max_attempts),
            interval: self
                .poll_interval_ms
                .map(std::time::Duration::from_millis)
                .unwrap_or(env.interval),
        }
    }
}

/// External signer settings for mutating commands.
#[derive(Args, Debug, Clone, Default)]
pub struct SignerArgs {
    /// Signer command line (falls back to RECONCILE_SIGNER_CMD)
    #[arg(long)]
    pub signer_cmd: Option<String>,

    /// Authority keypair passed to the signer (falls back to SOLANA_KEYPAIR)
    #[arg(long)]
    pub keypair: Option<PathBuf>,
}

impl SignerArgs {
    fn authority(&self) -> Result<AuthorityIdentity, ConfigError> {
        self.keypair
            .clone()
            .or_else(|| env_non_empty("SOLANA_KEYPAIR").map(PathBuf::from))
            .or_else(AuthorityIdentity::default_keypair_path)
            .map(AuthorityIdentity::new)
            .ok_or(ConfigError::MissingField("keypair"))
    }

    /// Start the mutation queue in front of the configured signer.
    pub fn spawn_queue(&self) -> Result<Arc<MutationQueue>> {
        let command = self
            .signer_cmd
            .clone()
            .or_else(|| env_non_empty("RECONCILE_SIGNER_CMD"))
            .ok_or(ConfigError::MissingField("signer command"))
            .context("mutating commands need --signer-cmd or RECONCILE_SIGNER_CMD")?;
        let ledger = SignerCommandLedger::from_command_line(&command)?;
        let authority = self.authority()?;
        info!(signer = %command, authority = %authority, "starting mutation queue");
        Ok(Arc::new(MutationQueue::spawn(ledger, authority)))
    }
}

/// Build the index client for this run.
pub fn index_client(opts: &GlobalOpts) -> Result<DasClient> {
    let endpoint = resolve_index_endpoint(opts.index_url.as_deref(), &opts.network)?;
    info!(endpoint = %endpoint, network = %opts.network, "using index endpoint");
    Ok(DasClient::new(&endpoint))
}

/// Stop the queue worker once every holder has let go of it.
pub async fn shutdown_queue(queue: Arc<MutationQueue>) {
    if let Ok(queue) = Arc::try_unwrap(queue) {
        queue.shutdown().await;
    }
}
