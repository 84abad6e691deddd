//! Audit pipeline from raw index records to a report.

mod common;

use common::{contract, COLLECTION};
use reconcile_core::{evaluate, AuditReport};
use reconcile_transport::normalize::member_from_das;
use reconcile_transport::test_utils::DasAssetBuilder;
use reconcile_types::{IssueKind, Member, MemberId, COLLECTION_GROUP_KEY};

fn normalize(raw: serde_json::Value) -> Member {
    member_from_das(&raw, COLLECTION_GROUP_KEY).expect("record has an id")
}

#[test]
fn test_reference_member_has_no_issues() {
    let member = normalize(DasAssetBuilder::consistent("Mint3", COLLECTION, 3).build());
    assert!(evaluate(&member, &contract()).is_empty());
}

#[test]
fn test_reference_member_with_royalty_400() {
    let member = normalize(
        DasAssetBuilder::consistent("Mint3", COLLECTION, 3)
            .royalty_bps(400)
            .build(),
    );
    let issues = evaluate(&member, &contract());
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::RoyaltyMismatch);
    assert_eq!(issues[0].to_string(), "royalty mismatch: expected 500 bps, found 400");
}

#[test]
fn test_unverified_link_from_index_is_repair_candidate() {
    let members = vec![
        normalize(DasAssetBuilder::consistent("Mint1", COLLECTION, 1).build()),
        normalize(
            DasAssetBuilder::consistent("Mint2", COLLECTION, 2)
                .collection(COLLECTION, false)
                .build(),
        ),
        normalize(
            DasAssetBuilder::consistent("Mint3", COLLECTION, 3)
                .symbol("OTHER")
                .build(),
        ),
    ];

    let report = AuditReport::build(&contract(), &members);

    assert_eq!(report.verified, 2);
    assert_eq!(report.unverified, 1);
    assert_eq!(report.consistent, 1);
    // Only the membership issue is repairable; the symbol needs a metadata fix.
    assert_eq!(report.repair_candidates(), vec![MemberId::new("Mint2")]);
    assert!(!report.passed());
}

#[test]
fn test_fungible_asset_and_foreign_image() {
    let member = normalize(
        DasAssetBuilder::consistent("Mint4", COLLECTION, 4)
            .interface("FungibleAsset")
            .token_standard("Fungible")
            .image("https://arweave.net/abc.png")
            .build(),
    );
    let kinds: Vec<IssueKind> = evaluate(&member, &contract())
        .into_iter()
        .map(|i| i.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            IssueKind::SuspiciousTokenKind,
            IssueKind::ImageContentIdMismatch
        ]
    );
}

#[test]
fn test_report_json_round_trip_fields() {
    let members = vec![normalize(
        DasAssetBuilder::consistent("Mint5", COLLECTION, 5)
            .json_uri("https://example.com/5.json")
            .build(),
    )];
    let report = AuditReport::build(&contract(), &members);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["total"], 1);
    assert_eq!(json["consistent"], 0);
    let kinds: Vec<&str> = json["histogram"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["kind"].as_str().unwrap())
        .collect();
    assert!(kinds.contains(&"metadata_content_id_mismatch"));
    assert!(kinds.contains(&"metadata_uri_not_content_addressed"));
}
