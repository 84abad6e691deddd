//! Metadata URI retargeting.
//!
//! Rewrites each member's metadata URI to `{base}/{content_id}/{n}.json`,
//! where `n` is the trailing number of the member's display name. Planning
//! is pure; applying goes through the mutation queue and waits for the index
//! to show the new URI, like a verification repair.
//!
//! With a [`MetadataChecker`] attached, each target URI is fetched before its
//! rewrite is submitted. Members whose new metadata is missing are reported
//! as unreachable and left untouched.

use reconcile_transport::{IndexClient, MetadataChecker, MutationRequest};
use reconcile_types::{FailureClass, FailureReason, Member, MemberId, PollPolicy};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::orchestrator::FailedMember;
use crate::poller::{Expectation, PropagationPoller};
use crate::queue::MutationQueue;

/// Where the new metadata lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetargetTemplate {
    /// Gateway prefix such as `https://gateway.pinata.cloud/ipfs`. Empty
    /// means the bare `ipfs://` scheme.
    pub base_url: String,
    pub content_id: String,
}

impl RetargetTemplate {
    pub fn new(base_url: impl Into<String>, content_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            content_id: content_id.into(),
        }
    }

    pub fn uri_for(&self, index: u64) -> String {
        let cid = self.content_id.trim_matches('/');
        let base = self.base_url.trim_end_matches('/');
        if base.is_empty() {
            format!("ipfs://{}/{}.json", cid, index)
        } else {
            format!("{}/{}/{}.json", base, cid, index)
        }
    }
}

/// One planned rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetargetEntry {
    pub member: MemberId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_uri: Option<String>,
    pub target_uri: String,
}

/// A member left out of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetargetSkip {
    pub member: MemberId,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetargetPlan {
    pub entries: Vec<RetargetEntry>,
    /// Members already pointing at their target.
    pub unchanged: Vec<MemberId>,
    pub skipped: Vec<RetargetSkip>,
}

/// Plan URI rewrites for `members`.
///
/// Names without a trailing number (or numbered 0; metadata files are
/// 1-based) are skipped.
pub fn plan(members: &[Member], template: &RetargetTemplate) -> RetargetPlan {
    let mut plan = RetargetPlan::default();
    for member in members {
        let index = match member.name_index() {
            Some(n) if n > 0 => n,
            _ => {
                plan.skipped.push(RetargetSkip {
                    member: member.id.clone(),
                    reason: format!(
                        "no index in name {}",
                        member.display_name.as_deref().unwrap_or("<none>")
                    ),
                });
                continue;
            }
        };
        let target_uri = template.uri_for(index);
        if member.metadata_uri.as_deref() == Some(target_uri.as_str()) {
            plan.unchanged.push(member.id.clone());
            continue;
        }
        plan.entries.push(RetargetEntry {
            member: member.id.clone(),
            display_name: member.display_name.clone(),
            current_uri: member.metadata_uri.clone(),
            target_uri,
        });
    }
    plan
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetargetStatus {
    /// Submitted and visible on the index.
    Updated,
    /// Submitted; the index still shows the old URI.
    PropagationPending,
    /// Nothing submitted.
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetargetOutcome {
    pub member: MemberId,
    pub uri: String,
    pub status: RetargetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

/// A target URI that failed the metadata check; nothing was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreachableUri {
    pub member: MemberId,
    pub uri: String,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetargetReport {
    pub dry_run: bool,
    pub applied: Vec<RetargetOutcome>,
    pub failed: Vec<FailedMember>,
    pub unreachable: Vec<UnreachableUri>,
    /// Entries not attempted because the run was stopped.
    pub skipped: Vec<MemberId>,
}

impl RetargetReport {
    /// What applying `plan` would do, without submitting anything.
    pub fn preview(plan: &RetargetPlan) -> Self {
        Self {
            dry_run: true,
            applied: plan
                .entries
                .iter()
                .map(|entry| RetargetOutcome {
                    member: entry.member.clone(),
                    uri: entry.target_uri.clone(),
                    status: RetargetStatus::DryRun,
                    signature: None,
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn count(&self, status: RetargetStatus) -> usize {
        self.applied.iter().filter(|o| o.status == status).count()
    }

    /// True when every planned entry was submitted.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.unreachable.is_empty() && self.skipped.is_empty()
    }
}

/// Applies a [`RetargetPlan`] one entry at a time.
pub struct RetargetRunner<I> {
    poller: PropagationPoller<I>,
    queue: Arc<MutationQueue>,
    policy: PollPolicy,
    cancel: CancellationToken,
    checker: Option<Arc<dyn MetadataChecker>>,
}

impl<I: IndexClient> RetargetRunner<I> {
    pub fn new(index: I, queue: Arc<MutationQueue>) -> Self {
        Self {
            poller: PropagationPoller::new(index),
            queue,
            policy: PollPolicy::default(),
            cancel: CancellationToken::new(),
            checker: None,
        }
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.poller = self.poller.with_cancellation(cancel.clone());
        self.cancel = cancel;
        self
    }

    /// Check each target URI before submitting its rewrite.
    pub fn with_metadata_check(mut self, checker: Arc<dyn MetadataChecker>) -> Self {
        self.checker = Some(checker);
        self
    }

    pub async fn apply(&self, plan: &RetargetPlan, dry_run: bool) -> RetargetReport {
        if dry_run {
            return RetargetReport::preview(plan);
        }
        let mut report = RetargetReport::default();

        for (pos, entry) in plan.entries.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(
                    remaining = plan.entries.len() - pos,
                    "stop requested, not issuing further updates"
                );
                report
                    .skipped
                    .extend(plan.entries[pos..].iter().map(|e| e.member.clone()));
                break;
            }

            if let Some(checker) = &self.checker {
                match checker.check_metadata(&entry.target_uri).await {
                    Ok(check) if !check.image_reachable => warn!(
                        member = %entry.member,
                        image = %check.image,
                        "image not reachable right now, updating anyway"
                    ),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(member = %entry.member, error = %e, "new metadata unreachable");
                        report.unreachable.push(UnreachableUri {
                            member: entry.member.clone(),
                            uri: entry.target_uri.clone(),
                            detail: e.detail,
                        });
                        continue;
                    }
                }
            }

            let request = MutationRequest::UpdateUri {
                member: entry.member.clone(),
                uri: entry.target_uri.clone(),
            };
            let reason = match self.queue.submit(request).await {
                Ok(Ok(receipt)) => {
                    info!(
                        member = %entry.member,
                        uri = %entry.target_uri,
                        "uri update submitted"
                    );
                    let visible = self
                        .poller
                        .await_value(
                            &entry.member,
                            &Expectation::MetadataUri(entry.target_uri.clone()),
                            self.policy,
                        )
                        .await;
                    report.applied.push(RetargetOutcome {
                        member: entry.member.clone(),
                        uri: entry.target_uri.clone(),
                        status: if visible {
                            RetargetStatus::Updated
                        } else {
                            RetargetStatus::PropagationPending
                        },
                        signature: Some(receipt.signature),
                    });
                    continue;
                }
                Ok(Err(error)) => error.classify(),
                Err(closed) => FailureReason::new(FailureClass::Rejected, closed.to_string()),
            };
            warn!(
                member = %entry.member,
                class = %reason.class,
                error = %reason.message,
                "uri update failed"
            );
            report.failed.push(FailedMember {
                member: entry.member.clone(),
                reason,
            });
        }

        info!(
            applied = report.applied.len(),
            failed = report.failed.len(),
            unreachable = report.unreachable.len(),
            "retarget pass finished"
        );
        report
    }
}
