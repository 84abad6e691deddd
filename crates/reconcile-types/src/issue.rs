//! Consistency issue taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::member::MemberId;

/// Closed set of consistency rule violations.
///
/// Declaration order is rule order; reports list issues in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Rule 1: the index does not report the group link as verified.
    MembershipUnverified,
    /// Rule 2: the token kind hint looks fungible.
    SuspiciousTokenKind,
    /// Rule 3
    SymbolMismatch,
    /// Rule 4
    NameMismatch,
    /// Rule 5
    RoyaltyMismatch,
    /// Rule 6: no matching creator that is verified or holds the full share.
    CreatorMissing,
    /// Rule 7
    MetadataContentIdMismatch,
    /// Rule 8
    MetadataUriNotContentAddressed,
    /// Rule 9 (only when an image URI is present)
    ImageContentIdMismatch,
}

impl IssueKind {
    pub const ALL: [IssueKind; 9] = [
        IssueKind::MembershipUnverified,
        IssueKind::SuspiciousTokenKind,
        IssueKind::SymbolMismatch,
        IssueKind::NameMismatch,
        IssueKind::RoyaltyMismatch,
        IssueKind::CreatorMissing,
        IssueKind::MetadataContentIdMismatch,
        IssueKind::MetadataUriNotContentAddressed,
        IssueKind::ImageContentIdMismatch,
    ];

    /// Operator-facing label used in console reports.
    pub fn label(&self) -> &'static str {
        match self {
            IssueKind::MembershipUnverified => "membership not verified",
            IssueKind::SuspiciousTokenKind => "token kind suspicious",
            IssueKind::SymbolMismatch => "symbol mismatch",
            IssueKind::NameMismatch => "name mismatch",
            IssueKind::RoyaltyMismatch => "royalty mismatch",
            IssueKind::CreatorMissing => "expected creator not present/verified",
            IssueKind::MetadataContentIdMismatch => "metadata uri content id mismatch",
            IssueKind::MetadataUriNotContentAddressed => "metadata uri not content-addressed",
            IssueKind::ImageContentIdMismatch => "image content id mismatch",
        }
    }

    /// Whether the repair workflow can fix this violation.
    ///
    /// Everything except the membership link needs an off-band metadata
    /// correction.
    pub fn auto_repairable(&self) -> bool {
        matches!(self, IssueKind::MembershipUnverified)
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One rule violation for one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub member_id: MemberId,
    pub kind: IssueKind,
    pub detail: String,
}

impl Issue {
    pub fn new(member_id: MemberId, kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            member_id,
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{}", self.kind.label())
        } else {
            write!(f, "{}: {}", self.kind.label(), self.detail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_codes_are_snake_case() {
        let codes: Vec<String> = IssueKind::ALL
            .iter()
            .map(|k| serde_json::to_value(k).unwrap().as_str().unwrap().to_string())
            .collect();
        assert_eq!(codes[0], "membership_unverified");
        assert_eq!(codes[7], "metadata_uri_not_content_addressed");
        assert!(codes.iter().all(|c| c.chars().all(|ch| ch.is_ascii_lowercase() || ch == '_')));
    }

    #[test]
    fn test_only_membership_is_repairable() {
        let repairable: Vec<_> = IssueKind::ALL
            .iter()
            .filter(|k| k.auto_repairable())
            .collect();
        assert_eq!(repairable, vec![&IssueKind::MembershipUnverified]);
    }

    #[test]
    fn test_issue_display() {
        let issue = Issue::new(MemberId::new("m"), IssueKind::RoyaltyMismatch, "400");
        assert_eq!(issue.to_string(), "royalty mismatch: 400");
    }
}
