//! Audit command - fetch the collection and check every member

use anyhow::Result;
use clap::Parser;
use reconcile_core::{AuditReport, PaginatedFetcher};
use reconcile_transport::{GroupQuery, GROUP_PAGE_LIMIT};

use super::config::{index_client, ContractArgs};
use super::output::print_json;
use super::GlobalOpts;

#[derive(Parser, Debug)]
pub struct AuditCmd {
    #[command(flatten)]
    pub contract: ContractArgs,

    /// Members requested per index page
    #[arg(long, default_value_t = GROUP_PAGE_LIMIT)]
    pub page_size: usize,
}

impl AuditCmd {
    /// Returns whether the audit passed: complete fetch and no issues.
    pub async fn execute(&self, opts: &GlobalOpts) -> Result<bool> {
        let contract = self.contract.resolve()?;
        let fetcher = PaginatedFetcher::new(index_client(opts)?);
        let query = GroupQuery::collection(contract.group_value.clone())
            .with_page_size(self.page_size.min(GROUP_PAGE_LIMIT));

        let quiet = opts.json;
        let fetched = fetcher
            .fetch_all_with_progress(&query, |progress| {
                if !quiet {
                    eprintln!(
                        "Fetched page {}: {} members ({} total)",
                        progress.page, progress.page_len, progress.total
                    );
                }
            })
            .await;

        let report = AuditReport::from_fetch(&contract, &fetched);
        if opts.json {
            print_json(&report)?;
        } else {
            print!("{}", report);
        }
        Ok(report.passed())
    }
}
