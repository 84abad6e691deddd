//! Shared types for the collection-reconcile workspace.
//!
//! This crate holds the data model every other crate speaks: normalized
//! [`Member`] records, the operator's [`ExpectedContract`], the closed
//! [`IssueKind`] taxonomy, and the ledger [`FailureReason`] classification.

pub mod contract;
pub mod env_utils;
pub mod failure;
pub mod issue;
pub mod member;

pub use contract::{ConfigError, ExpectedContract, MAX_ROYALTY_BPS};
pub use env_utils::{env_first, env_non_empty, env_var, env_var_or};
pub use failure::{FailureClass, FailureReason, LedgerError};
pub use issue::{Issue, IssueKind};
pub use member::{Creator, Member, MemberId, COLLECTION_GROUP_KEY};

use std::time::Duration;

/// Fixed-interval polling policy for waiting out index propagation lag.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Number of index reads before giving up.
    pub max_attempts: u32,
    /// Wait between consecutive reads.
    pub interval: Duration,
}

impl PollPolicy {
    /// Default attempt budget when nothing is configured.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;
    /// Default interval in milliseconds when nothing is configured.
    pub const DEFAULT_INTERVAL_MS: u64 = 1000;

    pub fn new(max_attempts: u32, interval_ms: u64) -> Self {
        Self {
            max_attempts,
            interval: Duration::from_millis(interval_ms),
        }
    }

    /// Read `RECONCILE_POLL_ATTEMPTS` / `RECONCILE_POLL_INTERVAL_MS`.
    pub fn from_env() -> Self {
        Self::new(
            env_var_or("RECONCILE_POLL_ATTEMPTS", Self::DEFAULT_MAX_ATTEMPTS),
            env_var_or("RECONCILE_POLL_INTERVAL_MS", Self::DEFAULT_INTERVAL_MS),
        )
    }

    /// Upper bound on time spent sleeping for one member.
    pub fn max_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_INTERVAL_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_policy_max_wait() {
        let policy = PollPolicy::new(8, 1000);
        assert_eq!(policy.max_wait(), Duration::from_secs(7));
        assert_eq!(PollPolicy::new(0, 1000).max_wait(), Duration::ZERO);
    }
}
