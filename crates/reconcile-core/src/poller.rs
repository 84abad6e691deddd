//! Propagation poller.
//!
//! The ledger answers a mutation long before the index reflects it. After a
//! successful mutation the caller polls the index at a fixed interval until
//! the expected value shows up or the attempt budget runs out. Running out
//! is not an error: the mutation is on the ledger, the index is just late.

use reconcile_transport::IndexClient;
use reconcile_types::{Member, MemberId, PollPolicy};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The value a poll is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// The member is linked to `collection` with the given verified flag.
    /// A verified link to any other collection does not count.
    MembershipVerified { collection: String, verified: bool },
    MetadataUri(String),
}

impl Expectation {
    pub fn verified_in(collection: impl Into<String>) -> Self {
        Expectation::MembershipVerified {
            collection: collection.into(),
            verified: true,
        }
    }

    pub fn matches(&self, member: &Member) -> bool {
        match self {
            Expectation::MembershipVerified {
                collection,
                verified,
            } => member.is_linked_to(collection) && member.membership_verified == *verified,
            Expectation::MetadataUri(uri) => member.metadata_uri.as_deref() == Some(uri.as_str()),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::MembershipVerified {
                collection,
                verified,
            } => write!(f, "collection={} verified={}", collection, verified),
            Expectation::MetadataUri(uri) => write!(f, "metadata_uri={}", uri),
        }
    }
}

/// Polls the index for one member until an [`Expectation`] holds.
pub struct PropagationPoller<I> {
    index: I,
    cancel: CancellationToken,
}

impl<I: IndexClient> PropagationPoller<I> {
    pub fn new(index: I) -> Self {
        Self {
            index,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop waiting between attempts once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    /// Return true the first time the index satisfies `expected`; false once
    /// `policy.max_attempts` reads have not.
    ///
    /// Transport errors count as a non-matching attempt. There is no sleep
    /// after the final attempt. Cancellation ends the wait early with false.
    pub async fn await_value(
        &self,
        id: &MemberId,
        expected: &Expectation,
        policy: PollPolicy,
    ) -> bool {
        for attempt in 1..=policy.max_attempts {
            match self.index.query_asset(id).await {
                Ok(member) if expected.matches(&member) => {
                    debug!(member = %id, attempt, %expected, "index caught up");
                    return true;
                }
                Ok(_) => debug!(member = %id, attempt, %expected, "index not caught up yet"),
                Err(e) => debug!(member = %id, attempt, error = %e, "poll read failed"),
            }
            if attempt < policy.max_attempts {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        debug!(member = %id, attempt, "polling cancelled");
                        return false;
                    }
                    _ = tokio::time::sleep(policy.interval) => {}
                }
            }
        }
        debug!(
            member = %id,
            attempts = policy.max_attempts,
            %expected,
            "gave up waiting for index"
        );
        false
    }
}
