//! Per-member consistency rules.
//!
//! [`evaluate`] runs every rule against one member and returns all
//! violations in rule order. It never short-circuits, so a single audit
//! surfaces every divergence a member has.

use reconcile_types::{ExpectedContract, Issue, IssueKind, Member};

/// Qualifiers that make a "fungible" hint acceptable.
const NON_FUNGIBLE_MARKERS: &[&str] = &["nonfungible", "non-fungible", "non_fungible"];

/// Scheme prefix of a content-addressed URI.
const CONTENT_ADDRESSED_SCHEME: &str = "ipfs://";
/// Gateway path segment of a content-addressed URI.
const CONTENT_ADDRESSED_SEGMENT: &str = "/ipfs/";

/// Evaluate `member` against `contract`.
///
/// Pure and total: every well-formed member yields a (possibly empty) list.
pub fn evaluate(member: &Member, contract: &ExpectedContract) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut flag = |kind: IssueKind, detail: String| {
        issues.push(Issue::new(member.id.clone(), kind, detail));
    };

    if !member.membership_verified {
        let detail = match member.group_value.as_deref() {
            Some(value) if value == contract.group_value => {
                "link present but unverified".to_string()
            }
            Some(value) => format!("linked to {} instead of {}", value, contract.group_value),
            None => format!("no link to {}", contract.group_value),
        };
        flag(IssueKind::MembershipUnverified, detail);
    }

    if let Some(hint) = member.token_kind.as_deref() {
        if looks_fungible(hint) {
            flag(IssueKind::SuspiciousTokenKind, format!("token kind {}", hint));
        }
    }

    if member.symbol.as_deref() != Some(contract.symbol.as_str()) {
        flag(
            IssueKind::SymbolMismatch,
            format!(
                "expected {}, found {}",
                contract.symbol,
                shown(member.symbol.as_deref())
            ),
        );
    }

    let name_ok = member
        .display_name
        .as_deref()
        .is_some_and(|name| name.starts_with(&contract.name_prefix));
    if !name_ok {
        flag(
            IssueKind::NameMismatch,
            format!(
                "expected prefix {:?}, found {}",
                contract.name_prefix,
                shown(member.display_name.as_deref())
            ),
        );
    }

    if member.royalty_bps != Some(contract.royalty_bps) {
        let found = member
            .royalty_bps
            .map(|bps| bps.to_string())
            .unwrap_or_else(|| "<none>".to_string());
        flag(
            IssueKind::RoyaltyMismatch,
            format!("expected {} bps, found {}", contract.royalty_bps, found),
        );
    }

    let creator_ok = member.creators.iter().any(|c| {
        c.address == contract.expected_creator_address && (c.verified || c.share == 100)
    });
    if !creator_ok {
        flag(
            IssueKind::CreatorMissing,
            format!(
                "{} not listed as verified or sole creator",
                contract.expected_creator_address
            ),
        );
    }

    let metadata_uri = member.metadata_uri.as_deref();
    if !metadata_uri.is_some_and(|uri| uri.contains(&contract.expected_content_id)) {
        flag(
            IssueKind::MetadataContentIdMismatch,
            format!(
                "expected {} in {}",
                contract.expected_content_id,
                shown(metadata_uri)
            ),
        );
    }
    if !metadata_uri.is_some_and(is_content_addressed) {
        flag(IssueKind::MetadataUriNotContentAddressed, shown(metadata_uri));
    }

    // A missing image is not a violation; only a present one is checked.
    if let Some(image) = member.image_uri.as_deref() {
        if !image.contains(&contract.expected_content_id) {
            flag(
                IssueKind::ImageContentIdMismatch,
                format!("expected {} in {}", contract.expected_content_id, image),
            );
        }
    }

    issues
}

fn looks_fungible(hint: &str) -> bool {
    let hint = hint.to_ascii_lowercase();
    hint.contains("fungible") && !NON_FUNGIBLE_MARKERS.iter().any(|m| hint.contains(m))
}

fn is_content_addressed(uri: &str) -> bool {
    uri.starts_with(CONTENT_ADDRESSED_SCHEME) || uri.contains(CONTENT_ADDRESSED_SEGMENT)
}

fn shown(value: Option<&str>) -> String {
    value.map(String::from).unwrap_or_else(|| "<none>".to_string())
}
