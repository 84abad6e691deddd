//! Per-member verification state machine.
//!
//! ```text
//!  Unlinked --Linked--> LinkedUnverified --MutationSucceeded--> AwaitingIndex
//!                             |                                   |      ^
//!                       MutationFailed            PropagationConfirmed   PropagationTimedOut
//!                             v                                   v      |
//!                     VerificationFailed --MutationSucceeded-->  Verified
//! ```
//!
//! `AwaitingIndex` separates "the ledger accepted the mutation" from "the
//! index reflects it". `Observed` events re-sync a member to what the index
//! currently reports and are legal from every state.

use parking_lot::Mutex;
use reconcile_types::{FailureReason, MemberId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Verification status of one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VerificationState {
    Unlinked,
    LinkedUnverified,
    /// The ledger accepted the verify mutation; the index has not caught up.
    ///
    /// `signature` is `None` when the ledger reported the link as already
    /// verified instead of issuing a new transaction.
    AwaitingIndex { signature: Option<String> },
    Verified,
    /// The last verify mutation failed; carries its classification.
    VerificationFailed { reason: FailureReason },
}

/// Link status as reported by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservedLink {
    Unlinked,
    LinkedUnverified,
    Verified,
}

impl ObservedLink {
    /// What the index says about `member`'s link to `group_value`.
    pub fn of(member: &reconcile_types::Member, group_value: &str) -> Self {
        if !member.is_linked_to(group_value) {
            ObservedLink::Unlinked
        } else if member.membership_verified {
            ObservedLink::Verified
        } else {
            ObservedLink::LinkedUnverified
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VerifyEvent {
    /// The member was linked to the group (external, at creation).
    Linked,
    MutationSucceeded { signature: Option<String> },
    MutationFailed { reason: FailureReason },
    PropagationConfirmed,
    PropagationTimedOut,
    Observed { link: ObservedLink },
}

impl VerifyEvent {
    pub fn name(&self) -> &'static str {
        match self {
            VerifyEvent::Linked => "linked",
            VerifyEvent::MutationSucceeded { .. } => "mutation_succeeded",
            VerifyEvent::MutationFailed { .. } => "mutation_failed",
            VerifyEvent::PropagationConfirmed => "propagation_confirmed",
            VerifyEvent::PropagationTimedOut => "propagation_timed_out",
            VerifyEvent::Observed { .. } => "observed",
        }
    }
}

/// An event that makes no sense in the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: &'static str,
    pub event: &'static str,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal transition: {} on {}", self.event, self.from)
    }
}

impl std::error::Error for TransitionError {}

impl VerificationState {
    pub fn name(&self) -> &'static str {
        match self {
            VerificationState::Unlinked => "unlinked",
            VerificationState::LinkedUnverified => "linked_unverified",
            VerificationState::AwaitingIndex { .. } => "awaiting_index",
            VerificationState::Verified => "verified",
            VerificationState::VerificationFailed { .. } => "verification_failed",
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationState::Verified)
    }

    /// Compute the state after `event`.
    pub fn apply(&self, event: &VerifyEvent) -> Result<VerificationState, TransitionError> {
        use VerificationState as S;
        use VerifyEvent as E;

        let next = match (self, event) {
            (_, E::Observed { link }) => match link {
                ObservedLink::Unlinked => S::Unlinked,
                ObservedLink::LinkedUnverified => S::LinkedUnverified,
                ObservedLink::Verified => S::Verified,
            },

            (S::Unlinked | S::LinkedUnverified, E::Linked) => S::LinkedUnverified,

            // Repair never downgrades a verified member.
            (
                S::Verified,
                E::MutationSucceeded { .. }
                | E::MutationFailed { .. }
                | E::PropagationConfirmed
                | E::PropagationTimedOut,
            ) => S::Verified,

            (
                S::LinkedUnverified | S::VerificationFailed { .. } | S::AwaitingIndex { .. },
                E::MutationSucceeded { signature },
            ) => S::AwaitingIndex {
                signature: signature.clone(),
            },

            (
                S::Unlinked
                | S::LinkedUnverified
                | S::AwaitingIndex { .. }
                | S::VerificationFailed { .. },
                E::MutationFailed { reason },
            ) => S::VerificationFailed {
                reason: reason.clone(),
            },

            (S::AwaitingIndex { .. }, E::PropagationConfirmed) => S::Verified,
            (S::AwaitingIndex { signature }, E::PropagationTimedOut) => S::AwaitingIndex {
                signature: signature.clone(),
            },

            _ => {
                return Err(TransitionError {
                    from: self.name(),
                    event: event.name(),
                })
            }
        };
        Ok(next)
    }
}

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionRecord {
    pub event: VerifyEvent,
    pub to: VerificationState,
}

#[derive(Debug, Default)]
struct Entry {
    current: Option<VerificationState>,
    history: Vec<TransitionRecord>,
}

/// Current state and transition history for every member touched in a run.
///
/// Members never seen start as `LinkedUnverified`, the state a repair
/// candidate is in by definition.
#[derive(Debug, Default)]
pub struct StateBook {
    entries: Mutex<BTreeMap<MemberId, Entry>>,
}

impl StateBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `id`, if the book has seen it.
    pub fn state(&self, id: &MemberId) -> Option<VerificationState> {
        self.entries.lock().get(id).and_then(|e| e.current.clone())
    }

    /// Apply `event` to `id` and record the result.
    ///
    /// On an illegal transition the state is left unchanged.
    pub fn record(
        &self,
        id: &MemberId,
        event: VerifyEvent,
    ) -> Result<VerificationState, TransitionError> {
        let mut entries = self.entries.lock();
        let entry = entries.entry(id.clone()).or_default();
        let current = entry
            .current
            .clone()
            .unwrap_or(VerificationState::LinkedUnverified);
        let next = current.apply(&event)?;
        entry.current = Some(next.clone());
        entry.history.push(TransitionRecord {
            event,
            to: next.clone(),
        });
        Ok(next)
    }

    pub fn history(&self, id: &MemberId) -> Vec<TransitionRecord> {
        self.entries
            .lock()
            .get(id)
            .map(|e| e.history.clone())
            .unwrap_or_default()
    }

    /// Snapshot of every member's current state, ordered by id.
    pub fn snapshot(&self) -> Vec<(MemberId, VerificationState)> {
        self.entries
            .lock()
            .iter()
            .filter_map(|(id, e)| e.current.clone().map(|s| (id.clone(), s)))
            .collect()
    }
}
