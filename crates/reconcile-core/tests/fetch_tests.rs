//! Pagination behavior of the fetcher against an in-memory index.

mod common;

use common::{consistent, contract, FakeIndex};
use reconcile_core::{AuditReport, PaginatedFetcher};
use reconcile_transport::{GroupQuery, GROUP_PAGE_LIMIT};
use std::collections::HashSet;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_full_pages_then_short_page() {
    let k = 2;
    let short = 37;
    let n = k * GROUP_PAGE_LIMIT + short;
    let index = FakeIndex::with_members((1..=n as u64).map(consistent).collect());
    let fetcher = PaginatedFetcher::new(index.clone());

    let members = fetcher
        .fetch_all(&GroupQuery::collection(common::COLLECTION))
        .await
        .unwrap();

    assert_eq!(members.len(), n);
    let unique: HashSet<_> = members.iter().map(|m| m.id.clone()).collect();
    assert_eq!(unique.len(), n);
    assert_eq!(index.page_reads.load(Ordering::SeqCst), k + 1);
    // Creation order is preserved.
    assert_eq!(members[0].id.as_str(), "Mint0001");
    assert_eq!(members[n - 1].id.as_str(), format!("Mint{:04}", n));
}

#[tokio::test]
async fn test_duplicates_across_pages_are_dropped() {
    let index = FakeIndex::with_members((1..=7).map(consistent).collect());
    index.duplicate_page_boundaries();
    let fetcher = PaginatedFetcher::new(index);

    let members = fetcher
        .fetch_all(&GroupQuery::collection(common::COLLECTION).with_page_size(3))
        .await
        .unwrap();

    // Page 2 repeats Mint0003 in place of Mint0004.
    let ids: Vec<&str> = members.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["Mint0001", "Mint0002", "Mint0003", "Mint0005", "Mint0006", "Mint0007"]
    );
}

#[tokio::test]
async fn test_empty_group_is_not_partial() {
    let index = FakeIndex::with_members(Vec::new());
    let fetcher = PaginatedFetcher::new(index);
    let fetched = fetcher
        .fetch_all(&GroupQuery::collection(common::COLLECTION))
        .await;

    assert_eq!(fetched.as_ref().map(Vec::len), Ok(0));
    let report = AuditReport::from_fetch(&contract(), &fetched);
    assert!(report.complete);
    assert!(report.passed());
}

#[tokio::test]
async fn test_index_error_surfaces_partial_fetch() {
    let index = FakeIndex::with_members((1..=10).map(consistent).collect());
    index.fail_on_page(2);
    let fetcher = PaginatedFetcher::new(index);

    let fetched = fetcher
        .fetch_all(&GroupQuery::collection(common::COLLECTION).with_page_size(4))
        .await;
    let failure = fetched.as_ref().unwrap_err();
    assert_eq!(failure.page, 2);
    assert_eq!(failure.members_discarded, 4);

    let report = AuditReport::from_fetch(&contract(), &fetched);
    assert!(!report.complete);
    assert!(!report.passed());
    assert_eq!(report.total, 0);
}

#[tokio::test]
async fn test_progress_is_reported_per_page() {
    let index = FakeIndex::with_members((1..=5).map(consistent).collect());
    let fetcher = PaginatedFetcher::new(index);
    let mut totals = Vec::new();
    fetcher
        .fetch_all_with_progress(
            &GroupQuery::collection(common::COLLECTION).with_page_size(2),
            |p| totals.push((p.page, p.page_len, p.total)),
        )
        .await
        .unwrap();
    assert_eq!(totals, vec![(1, 2, 2), (2, 2, 4), (3, 1, 5)]);
}
