//! Retarget command - point metadata URIs at a new content address

use anyhow::{Context, Result};
use clap::Parser;
use reconcile_core::{
    plan, PaginatedFetcher, RetargetPlan, RetargetReport, RetargetRunner, RetargetTemplate,
};
use reconcile_transport::{GatewayClient, GroupQuery};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::config::{index_client, shutdown_queue, PollArgs, SignerArgs};
use super::output::{format_retarget, print_json};
use super::GlobalOpts;

#[derive(Parser, Debug)]
pub struct RetargetCmd {
    /// Collection whose members are retargeted
    #[arg(long)]
    pub collection: String,

    /// New content id (CID) holding `<n>.json` for every member
    #[arg(long)]
    pub content_id: String,

    /// Gateway prefix such as https://gateway.pinata.cloud/ipfs (default: ipfs://)
    #[arg(long, default_value = "")]
    pub base_url: String,

    /// Gateway used to read ipfs:// metadata before rewriting
    /// (falls back to RECONCILE_IPFS_GATEWAY)
    #[arg(long)]
    pub gateway: Option<String>,

    /// Submit rewrites without fetching the new metadata first
    #[arg(long)]
    pub skip_uri_check: bool,

    /// Print the plan without submitting anything
    #[arg(long)]
    pub dry_run: bool,

    #[command(flatten)]
    pub signer: SignerArgs,

    #[command(flatten)]
    pub poll: PollArgs,
}

#[derive(Serialize)]
struct RetargetOutput<'a> {
    plan: &'a RetargetPlan,
    report: &'a RetargetReport,
}

impl RetargetCmd {
    /// Returns whether every planned update went through.
    pub async fn execute(&self, opts: &GlobalOpts) -> Result<bool> {
        let index = index_client(opts)?;
        let members = PaginatedFetcher::new(index.clone())
            .fetch_all(&GroupQuery::collection(self.collection.clone()))
            .await
            .context("refusing to retarget from an incomplete fetch")?;

        let template = RetargetTemplate::new(self.base_url.clone(), self.content_id.clone());
        let planned = plan(&members, &template);

        let report = if self.dry_run {
            RetargetReport::preview(&planned)
        } else if planned.entries.is_empty() {
            RetargetReport::default()
        } else {
            let queue = self.signer.spawn_queue()?;
            let mut runner = RetargetRunner::new(index, queue.clone())
                .with_poll_policy(self.poll.resolve())
                .with_cancellation(opts.cancel.clone());
            if !self.skip_uri_check {
                let gateway = GatewayClient::resolve(self.gateway.as_deref());
                info!(gateway = %gateway.gateway(), "checking new metadata before each rewrite");
                runner = runner.with_metadata_check(Arc::new(gateway));
            }
            let report = runner.apply(&planned, false).await;
            drop(runner);
            shutdown_queue(queue).await;
            report
        };

        if opts.json {
            print_json(&RetargetOutput {
                plan: &planned,
                report: &report,
            })?;
        } else {
            print!("{}", format_retarget(&planned, &report));
        }
        Ok(report.is_clean())
    }
}
