//! Ledger mutation interface.
//!
//! Transaction construction and signing live outside this workspace. The
//! reconciler only needs "submit this mutation as this authority and tell me
//! the signature or the ledger's logs".

use async_trait::async_trait;
use reconcile_types::{LedgerError, MemberId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The signing identity all mutations are issued under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityIdentity {
    /// Location of the signing credential; handed to the signer, never read here.
    pub keypair_path: PathBuf,
}

impl AuthorityIdentity {
    pub fn new(keypair_path: impl Into<PathBuf>) -> Self {
        Self {
            keypair_path: keypair_path.into(),
        }
    }

    /// Default Solana CLI keypair location (`~/.config/solana/id.json`).
    pub fn default_keypair_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("solana").join("id.json"))
    }
}

impl fmt::Display for AuthorityIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.keypair_path.display())
    }
}

/// A ledger mutation the reconciler may request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationRequest {
    /// Verify the member's link to `collection` (sized collection item).
    VerifyMembership { member: MemberId, collection: String },
    /// Set the member's collection to `collection` and verify it in one
    /// transaction. Needed when the member carries no link to verify.
    SetAndVerifyMembership { member: MemberId, collection: String },
    /// Point the member's metadata at a new URI, keeping other fields.
    UpdateUri { member: MemberId, uri: String },
}

impl MutationRequest {
    pub fn member(&self) -> &MemberId {
        match self {
            MutationRequest::VerifyMembership { member, .. }
            | MutationRequest::SetAndVerifyMembership { member, .. }
            | MutationRequest::UpdateUri { member, .. } => member,
        }
    }

    /// Subcommand name passed to an external signer.
    pub fn action(&self) -> &'static str {
        match self {
            MutationRequest::VerifyMembership { .. } => "verify-membership",
            MutationRequest::SetAndVerifyMembership { .. } => "set-and-verify-membership",
            MutationRequest::UpdateUri { .. } => "update-uri",
        }
    }
}

/// Proof that the ledger accepted a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationReceipt {
    pub signature: String,
}

/// Write access to the ledger.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit one mutation and wait for its terminal outcome.
    async fn submit(
        &self,
        request: &MutationRequest,
        authority: &AuthorityIdentity,
    ) -> Result<MutationReceipt, LedgerError>;
}

#[async_trait]
impl<T: LedgerClient + ?Sized> LedgerClient for std::sync::Arc<T> {
    async fn submit(
        &self,
        request: &MutationRequest,
        authority: &AuthorityIdentity,
    ) -> Result<MutationReceipt, LedgerError> {
        (**self).submit(request, authority).await
    }
}
