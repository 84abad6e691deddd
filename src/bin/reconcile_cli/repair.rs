//! Repair command - verify membership links through the signer

use anyhow::{bail, Context, Result};
use clap::Parser;
use reconcile_core::{
    AuditReport, PaginatedFetcher, RepairOrchestrator, RepairReport, VerificationState,
};
use reconcile_transport::{DasClient, GroupQuery};
use reconcile_types::MemberId;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use super::config::{index_client, shutdown_queue, ContractArgs, PollArgs, SignerArgs};
use super::output::{format_repair_report, print_json};
use super::GlobalOpts;

#[derive(Parser, Debug)]
pub struct RepairCmd {
    #[command(flatten)]
    pub contract: ContractArgs,

    /// Member ids to repair
    #[arg(value_name = "MEMBER")]
    pub members: Vec<String>,

    /// Fetch the collection and repair every member with a repairable issue
    /// (needs the full contract)
    #[arg(long, conflicts_with = "members")]
    pub unverified: bool,

    #[command(flatten)]
    pub signer: SignerArgs,

    #[command(flatten)]
    pub poll: PollArgs,
}

#[derive(Serialize)]
struct RepairOutput<'a> {
    #[serde(flatten)]
    report: &'a RepairReport,
    final_states: BTreeMap<String, VerificationState>,
}

impl RepairCmd {
    /// Returns whether every member was repaired (none failed or skipped).
    pub async fn execute(&self, opts: &GlobalOpts) -> Result<bool> {
        let index = index_client(opts)?;
        let ids = if self.unverified {
            self.select_candidates(&index).await?
        } else if self.members.is_empty() {
            bail!("no members given; pass member ids or --unverified");
        } else {
            self.members.iter().map(|s| MemberId::new(s.as_str())).collect()
        };

        if ids.is_empty() {
            if opts.json {
                print_json(&RepairReport::default())?;
            } else {
                println!("Nothing to repair.");
            }
            return Ok(true);
        }

        let queue = self.signer.spawn_queue()?;
        let orchestrator =
            RepairOrchestrator::new(index, queue.clone(), self.contract.collection.clone())
                .with_poll_policy(self.poll.resolve())
                .with_cancellation(opts.cancel.clone());

        let report = orchestrator.repair(&ids).await;

        if opts.json {
            let final_states = orchestrator
                .states()
                .snapshot()
                .into_iter()
                .map(|(id, state)| (id.to_string(), state))
                .collect();
            print_json(&RepairOutput {
                report: &report,
                final_states,
            })?;
        } else {
            print!(
                "{}",
                format_repair_report(&report, orchestrator.states(), &self.contract.collection)
            );
        }

        drop(orchestrator);
        shutdown_queue(queue).await;
        Ok(report.is_clean())
    }

    async fn select_candidates(&self, index: &DasClient) -> Result<Vec<MemberId>> {
        let contract = self.contract.resolve()?;
        let fetcher = PaginatedFetcher::new(index.clone());
        let members = fetcher
            .fetch_all(&GroupQuery::collection(contract.group_value.clone()))
            .await
            .context("refusing to pick repair candidates from an incomplete fetch")?;
        let candidates = AuditReport::build(&contract, &members).repair_candidates();
        info!(
            fetched = members.len(),
            candidates = candidates.len(),
            "selected repair candidates"
        );
        Ok(candidates)
    }
}
