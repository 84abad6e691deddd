//! Inspect command - show what the index holds for specific members

use anyhow::Result;
use clap::Parser;
use reconcile_transport::IndexClient;
use reconcile_types::{Member, MemberId};
use serde::Serialize;

use super::config::index_client;
use super::output::{format_member, print_json};
use super::GlobalOpts;

#[derive(Parser, Debug)]
pub struct InspectCmd {
    /// Member ids to look up
    #[arg(value_name = "MEMBER", required = true)]
    pub members: Vec<String>,

    /// Flag members not linked to this collection
    #[arg(long)]
    pub collection: Option<String>,
}

#[derive(Debug, Serialize)]
struct InspectEntry {
    member: MemberId,
    #[serde(skip_serializing_if = "Option::is_none")]
    record: Option<Member>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl InspectCmd {
    /// Returns whether every lookup succeeded. A failed lookup is reported
    /// and the remaining ids are still read.
    pub async fn execute(&self, opts: &GlobalOpts) -> Result<bool> {
        let index = index_client(opts)?;
        let mut entries = Vec::with_capacity(self.members.len());
        for raw in &self.members {
            let id = MemberId::new(raw.trim());
            let entry = match index.query_asset(&id).await {
                Ok(member) => InspectEntry {
                    member: id,
                    record: Some(member),
                    error: None,
                },
                Err(e) => InspectEntry {
                    member: id,
                    record: None,
                    error: Some(e.to_string()),
                },
            };
            entries.push(entry);
        }

        if opts.json {
            print_json(&entries)?;
        } else {
            for entry in &entries {
                match (&entry.record, &entry.error) {
                    (Some(member), _) => {
                        print!("{}", format_member(member, self.collection.as_deref()))
                    }
                    (None, error) => println!(
                        "{}\n  \x1b[31mlookup failed:\x1b[0m {}",
                        entry.member,
                        error.as_deref().unwrap_or("unknown error")
                    ),
                }
            }
        }
        Ok(entries.iter().all(|e| e.error.is_none()))
    }
}
