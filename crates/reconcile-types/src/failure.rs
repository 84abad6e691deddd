//! Ledger mutation failures and their classification.
//!
//! | Class | Typical ledger signal | Retry helps? |
//! |-------|-----------------------|--------------|
//! | `AuthorityMismatch` | signer is not the collection update authority | no |
//! | `AccountOwnershipMismatch` | `IncorrectOwner` on a derived account | no |
//! | `AlreadyVerified` | the link is already verified | n/a (success) |
//! | `OutcomeUnknown` | signer killed after a timeout; may have landed | re-audit first |
//! | `Transient` | expired blockhash, rate limit, dropped connection | yes |
//! | `Rejected` | anything else the ledger refused | unknown |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error returned by a ledger submission, carrying the ledger's own logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerError {
    pub message: String,
    /// Program logs exactly as the ledger returned them.
    #[serde(default)]
    pub logs: Vec<String>,
}

impl LedgerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            logs: Vec::new(),
        }
    }

    pub fn with_logs(mut self, logs: Vec<String>) -> Self {
        self.logs = logs;
        self
    }

    /// Classify this error into a [`FailureReason`].
    pub fn classify(&self) -> FailureReason {
        FailureReason {
            class: FailureClass::from_diagnostics(&self.message, &self.logs),
            message: self.message.clone(),
            logs: self.logs.clone(),
        }
    }
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if !self.logs.is_empty() {
            write!(f, " ({} log lines)", self.logs.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for LedgerError {}

/// Sub-classification of a mutation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    AuthorityMismatch,
    AccountOwnershipMismatch,
    /// The ledger refused because the link is already verified.
    AlreadyVerified,
    /// The submission was abandoned mid-flight; the ledger may hold it.
    OutcomeUnknown,
    Transient,
    Rejected,
}

const AUTHORITY_MARKERS: &[&str] = &[
    "incorrect collection update authority",
    "invalidcollectionupdateauthority",
    "invalid authority",
    "update authority",
];
const OWNERSHIP_MARKERS: &[&str] = &[
    "incorrectowner",
    "incorrect owner",
    "incorrect account owner",
    "invalid account owner",
];
const ALREADY_VERIFIED_MARKERS: &[&str] = &["already verified", "alreadyverified"];
const OUTCOME_UNKNOWN_MARKERS: &[&str] = &["outcome unknown"];
const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "blockhash not found",
    "block height exceeded",
    "429",
    "too many requests",
    "connection",
    "network",
];

impl FailureClass {
    /// Classify from the error message and ledger logs.
    ///
    /// Structural classes win over transient ones: a log showing an owner
    /// mismatch stays unrecoverable even if the message mentions a timeout.
    pub fn from_diagnostics(message: &str, logs: &[String]) -> Self {
        let haystack = std::iter::once(message)
            .chain(logs.iter().map(String::as_str))
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join("\n");
        let has = |markers: &[&str]| markers.iter().any(|m| haystack.contains(m));

        if has(ALREADY_VERIFIED_MARKERS) {
            FailureClass::AlreadyVerified
        } else if has(OWNERSHIP_MARKERS) {
            FailureClass::AccountOwnershipMismatch
        } else if has(AUTHORITY_MARKERS) {
            FailureClass::AuthorityMismatch
        } else if has(OUTCOME_UNKNOWN_MARKERS) {
            FailureClass::OutcomeUnknown
        } else if has(TRANSIENT_MARKERS) {
            FailureClass::Transient
        } else {
            FailureClass::Rejected
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureClass::Transient)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::AuthorityMismatch => "authority_mismatch",
            FailureClass::AccountOwnershipMismatch => "account_ownership_mismatch",
            FailureClass::AlreadyVerified => "already_verified",
            FailureClass::OutcomeUnknown => "outcome_unknown",
            FailureClass::Transient => "transient",
            FailureClass::Rejected => "rejected",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The last failure recorded against a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub class: FailureClass,
    pub message: String,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl FailureReason {
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            logs: Vec::new(),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.class, self.message)
    }
}
