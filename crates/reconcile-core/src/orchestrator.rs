//! Membership verification repair.
//!
//! One pass over a batch of member ids, one attempt per member:
//!
//! 1. Look the member up on the index. Already verified means nothing to do.
//! 2. Submit `VerifyMembership` through the [`MutationQueue`], or
//!    `SetAndVerifyMembership` when the index shows no link to the collection.
//! 3. On success, poll the index until it reports the link to this
//!    collection verified.
//! 4. On failure, classify the ledger error, record it, move on.
//!
//! A failing member never aborts the batch. Re-running with the failed ids
//! is the retry mechanism; members verified in between come back as
//! [`RepairOutcome::AlreadyVerified`].
//!
//! Cancelling the [`CancellationToken`] stops new mutations. A mutation
//! already submitted completes; its propagation wait is cut short.

use reconcile_transport::{IndexClient, MutationRequest};
use reconcile_types::{FailureClass, FailureReason, MemberId, PollPolicy};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::poller::{Expectation, PropagationPoller};
use crate::queue::MutationQueue;
use crate::state::{ObservedLink, StateBook, VerificationState, VerifyEvent};

/// How a successful repair ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairOutcome {
    /// Mutation accepted and the index now reports the link verified.
    Confirmed,
    /// Nothing needed doing: the link was already verified.
    AlreadyVerified,
    /// Mutation accepted but the index had not caught up when polling ended.
    PropagationTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairedMember {
    pub member: MemberId,
    pub outcome: RepairOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedMember {
    pub member: MemberId,
    pub reason: FailureReason,
}

/// Result of one repair pass. Lists are sorted by member id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub succeeded: Vec<RepairedMember>,
    pub failed: Vec<FailedMember>,
    /// Members not attempted because the run was stopped.
    pub skipped: Vec<MemberId>,
}

impl RepairReport {
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn count(&self, outcome: RepairOutcome) -> usize {
        self.succeeded
            .iter()
            .filter(|r| r.outcome == outcome)
            .count()
    }

    /// Ids worth passing to the next pass.
    pub fn retry_ids(&self) -> Vec<MemberId> {
        self.failed
            .iter()
            .map(|f| f.member.clone())
            .chain(self.skipped.iter().cloned())
            .collect()
    }

    /// True when nothing failed and nothing was skipped.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Drives verification repairs for one collection.
pub struct RepairOrchestrator<I> {
    poller: PropagationPoller<I>,
    queue: Arc<MutationQueue>,
    collection: String,
    policy: PollPolicy,
    cancel: CancellationToken,
    book: StateBook,
}

impl<I: IndexClient> RepairOrchestrator<I> {
    pub fn new(index: I, queue: Arc<MutationQueue>, collection: impl Into<String>) -> Self {
        Self {
            poller: PropagationPoller::new(index),
            queue,
            collection: collection.into(),
            policy: PollPolicy::default(),
            cancel: CancellationToken::new(),
            book: StateBook::new(),
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

    /// Verification states recorded so far.
    pub fn states(&self) -> &StateBook {
        &self.book
    }

    /// Run one pass over `ids`. Duplicates are attempted once.
    pub async fn repair(&self, ids: &[MemberId]) -> RepairReport {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut report = RepairReport::default();
        for (pos, id) in ids.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(
                    remaining = ids.len() - pos,
                    "stop requested, not issuing further mutations"
                );
                report.skipped.extend(ids[pos..].iter().cloned());
                break;
            }
            match self.repair_one(id).await {
                Ok(repaired) => report.succeeded.push(repaired),
                Err(failed) => report.failed.push(failed),
            }
        }

        info!(
            collection = %self.collection,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "repair pass finished"
        );
        report
    }

    async fn repair_one(&self, id: &MemberId) -> Result<RepairedMember, FailedMember> {
        let observed = match self.poller.index().query_asset(id).await {
            Ok(member) => {
                let link = ObservedLink::of(&member, &self.collection);
                self.record(id, VerifyEvent::Observed { link });
                if link == ObservedLink::Verified {
                    info!(member = %id, "already verified on index, skipping mutation");
                    return Ok(RepairedMember {
                        member: id.clone(),
                        outcome: RepairOutcome::AlreadyVerified,
                        signature: None,
                    });
                }
                Some(link)
            }
            Err(e) => {
                warn!(member = %id, error = %e, "index lookup failed, assuming linked");
                None
            }
        };

        let request = match observed {
            Some(ObservedLink::Unlinked) => {
                debug!(member = %id, "no link to collection, setting and verifying");
                MutationRequest::SetAndVerifyMembership {
                    member: id.clone(),
                    collection: self.collection.clone(),
                }
            }
            _ => MutationRequest::VerifyMembership {
                member: id.clone(),
                collection: self.collection.clone(),
            },
        };
        let outcome = match self.queue.submit(request).await {
            Ok(outcome) => outcome,
            Err(closed) => {
                return Err(self.fail(
                    id,
                    FailureReason::new(FailureClass::Rejected, closed.to_string()),
                ))
            }
        };

        match outcome {
            Ok(receipt) => {
                info!(member = %id, signature = %receipt.signature, "verification submitted");
                Ok(self.confirm(id, Some(receipt.signature)).await)
            }
            Err(error) => {
                let reason = error.classify();
                if reason.class == FailureClass::AlreadyVerified {
                    info!(member = %id, "ledger reports link already verified");
                    return Ok(self.confirm(id, None).await);
                }
                Err(self.fail(id, reason))
            }
        }
    }

    /// Record the accepted mutation and wait for the index to agree.
    async fn confirm(&self, id: &MemberId, signature: Option<String>) -> RepairedMember {
        // Set-and-verify links the member in the same transaction.
        if self.book.state(id) == Some(VerificationState::Unlinked) {
            self.record(id, VerifyEvent::Linked);
        }
        self.record(
            id,
            VerifyEvent::MutationSucceeded {
                signature: signature.clone(),
            },
        );

        let confirmed = self
            .poller
            .await_value(id, &Expectation::verified_in(&self.collection), self.policy)
            .await;
        let outcome = if confirmed {
            self.record(id, VerifyEvent::PropagationConfirmed);
            if signature.is_some() {
                RepairOutcome::Confirmed
            } else {
                RepairOutcome::AlreadyVerified
            }
        } else {
            warn!(
                member = %id,
                attempts = self.policy.max_attempts,
                "index has not reflected verification yet"
            );
            self.record(id, VerifyEvent::PropagationTimedOut);
            RepairOutcome::PropagationTimeout
        };

        RepairedMember {
            member: id.clone(),
            outcome,
            signature,
        }
    }

    fn fail(&self, id: &MemberId, reason: FailureReason) -> FailedMember {
        warn!(
            member = %id,
            class = %reason.class,
            retryable = reason.class.is_retryable(),
            error = %reason.message,
            "verification failed"
        );
        for line in &reason.logs {
            debug!(member = %id, "{}", line);
        }
        self.record(
            id,
            VerifyEvent::MutationFailed {
                reason: reason.clone(),
            },
        );
        FailedMember {
            member: id.clone(),
            reason,
        }
    }

    fn record(&self, id: &MemberId, event: VerifyEvent) {
        if let Err(e) = self.book.record(id, event) {
            warn!(member = %id, error = %e, "state transition rejected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_helpers() {
        let report = RepairReport {
            succeeded: vec![
                RepairedMember {
                    member: MemberId::new("a"),
                    outcome: RepairOutcome::Confirmed,
                    signature: Some("S".to_string()),
                },
                RepairedMember {
                    member: MemberId::new("b"),
                    outcome: RepairOutcome::PropagationTimeout,
                    signature: Some("T".to_string()),
                },
            ],
            failed: vec![FailedMember {
                member: MemberId::new("c"),
                reason: FailureReason::new(FailureClass::Transient, "timeout"),
            }],
            skipped: vec![MemberId::new("d")],
        };
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.count(RepairOutcome::PropagationTimeout), 1);
        assert_eq!(
            report.retry_ids(),
            vec![MemberId::new("c"), MemberId::new("d")]
        );
        assert!(!report.is_clean());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["succeeded"][1]["outcome"], "propagation_timeout");
        assert_eq!(json["failed"][0]["reason"]["class"], "transient");
    }
}
