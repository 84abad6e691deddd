//! In-memory index and ledger used by the engine tests.
//!
//! The ledger writes into the index with a configurable lag, measured in
//! `getAsset` reads, so propagation behavior is deterministic.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use reconcile_core::MutationQueue;
use reconcile_transport::{
    AuthorityIdentity, GroupPage, GroupQuery, IndexClient, IndexUnavailable, LedgerClient,
    MetadataCheck, MetadataChecker, MutationReceipt, MutationRequest, UriCheckError,
};
use reconcile_types::{Creator, ExpectedContract, LedgerError, Member, MemberId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const COLLECTION: &str = "Col";

pub fn contract() -> ExpectedContract {
    ExpectedContract::new(COLLECTION, "bafyXYZ", "Mini #", "MNFT", 500, "Creator1")
        .expect("valid contract")
}

/// A member that passes every rule of [`contract`].
pub fn consistent(index: u64) -> Member {
    let mut m = Member::bare(format!("Mint{:04}", index));
    m.display_name = Some(format!("Mini #{}", index));
    m.symbol = Some("MNFT".to_string());
    m.royalty_bps = Some(500);
    m.creators = vec![Creator::new("Creator1", true, 100)];
    m.metadata_uri = Some(format!("ipfs://bafyXYZ/{}.json", index));
    m.membership_verified = true;
    m.group_value = Some(COLLECTION.to_string());
    m
}

pub fn unverified(index: u64) -> Member {
    let mut m = consistent(index);
    m.membership_verified = false;
    m
}

pub fn ids(raw: &[&str]) -> Vec<MemberId> {
    raw.iter().map(|s| MemberId::new(*s)).collect()
}

struct PendingWrite {
    reads_left: u32,
    update: Member,
}

/// Eventually-consistent in-memory index.
#[derive(Default)]
pub struct FakeIndex {
    members: Mutex<Vec<Member>>,
    pending: Mutex<HashMap<MemberId, PendingWrite>>,
    /// `getAsset` reads a ledger write stays invisible for.
    lag: Mutex<u32>,
    fail_page: Mutex<Option<u32>>,
    fail_assets: Mutex<HashSet<MemberId>>,
    duplicate_across_pages: Mutex<bool>,
    pub page_reads: AtomicUsize,
    pub asset_reads: AtomicUsize,
}

impl FakeIndex {
    pub fn with_members(members: Vec<Member>) -> Arc<Self> {
        let index = Self::default();
        *index.members.lock() = members;
        Arc::new(index)
    }

    pub fn set_lag(&self, reads: u32) {
        *self.lag.lock() = reads;
    }

    pub fn fail_on_page(&self, page: u32) {
        *self.fail_page.lock() = Some(page);
    }

    pub fn fail_asset(&self, id: &str) {
        self.fail_assets.lock().insert(MemberId::new(id));
    }

    /// Repeat the last member of every full page at the start of the next.
    pub fn duplicate_page_boundaries(&self) {
        *self.duplicate_across_pages.lock() = true;
    }

    pub fn member(&self, id: &MemberId) -> Option<Member> {
        self.members.lock().iter().find(|m| &m.id == id).cloned()
    }

    /// Schedule `update` to become visible after the configured lag.
    pub fn write(&self, update: Member) {
        let reads_left = *self.lag.lock();
        if reads_left == 0 {
            self.apply(update);
        } else {
            self.pending
                .lock()
                .insert(update.id.clone(), PendingWrite { reads_left, update });
        }
    }

    fn apply(&self, update: Member) {
        let mut members = self.members.lock();
        match members.iter_mut().find(|m| m.id == update.id) {
            Some(slot) => *slot = update,
            None => members.push(update),
        }
    }

    fn tick(&self, id: &MemberId) {
        let ready = {
            let mut pending = self.pending.lock();
            let due = match pending.get_mut(id) {
                Some(write) => {
                    write.reads_left = write.reads_left.saturating_sub(1);
                    write.reads_left == 0
                }
                None => false,
            };
            if due {
                pending.remove(id).map(|w| w.update)
            } else {
                None
            }
        };
        if let Some(update) = ready {
            self.apply(update);
        }
    }
}

#[async_trait]
impl IndexClient for FakeIndex {
    async fn query_group_page(
        &self,
        query: &GroupQuery,
        page: u32,
    ) -> Result<GroupPage, IndexUnavailable> {
        self.page_reads.fetch_add(1, Ordering::SeqCst);
        if *self.fail_page.lock() == Some(page) {
            return Err(IndexUnavailable::new("getAssetsByGroup returned no result"));
        }
        let members = self.members.lock();
        let start = (page as usize - 1) * query.page_size;
        let mut items: Vec<Member> = members
            .iter()
            .filter(|m| m.is_linked_to(&query.group_value))
            .skip(start)
            .take(query.page_size)
            .cloned()
            .collect();
        if *self.duplicate_across_pages.lock() && page > 1 && items.len() == query.page_size {
            items[0] = members[start - 1].clone();
        }
        Ok(GroupPage::from_members(items))
    }

    async fn query_asset(&self, id: &MemberId) -> Result<Member, IndexUnavailable> {
        self.asset_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_assets.lock().contains(id) {
            return Err(IndexUnavailable::new(format!("getAsset {} failed", id)));
        }
        self.tick(id);
        self.member(id)
            .ok_or_else(|| IndexUnavailable::new(format!("asset {} not found", id)))
    }
}

/// Ledger that writes through to a [`FakeIndex`].
pub struct FakeLedger {
    index: Arc<FakeIndex>,
    failures: Mutex<HashMap<MemberId, LedgerError>>,
    verified: Mutex<HashSet<MemberId>>,
    pub calls: Mutex<Vec<MutationRequest>>,
}

impl FakeLedger {
    pub fn new(index: Arc<FakeIndex>) -> Arc<Self> {
        Arc::new(Self {
            index,
            failures: Mutex::new(HashMap::new()),
            verified: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn fail(&self, id: &str, error: LedgerError) {
        self.failures.lock().insert(MemberId::new(id), error);
    }

    /// The ledger already holds a verified link the index does not show.
    pub fn mark_verified(&self, id: &str) {
        self.verified.lock().insert(MemberId::new(id));
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls_for(&self, id: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.member().as_str() == id)
            .count()
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn submit(
        &self,
        request: &MutationRequest,
        _authority: &AuthorityIdentity,
    ) -> Result<MutationReceipt, LedgerError> {
        let seq = {
            let mut calls = self.calls.lock();
            calls.push(request.clone());
            calls.len()
        };
        let id = request.member().clone();
        if let Some(error) = self.failures.lock().get(&id) {
            return Err(error.clone());
        }
        let mut current = self
            .index
            .member(&id)
            .unwrap_or_else(|| Member::bare(id.clone()));

        match request {
            MutationRequest::VerifyMembership { collection, .. }
            | MutationRequest::SetAndVerifyMembership { collection, .. } => {
                if !self.verified.lock().insert(id.clone()) {
                    return Err(LedgerError::new("Transaction simulation failed")
                        .with_logs(vec!["Program log: Error: Already verified".to_string()]));
                }
                current.group_value = Some(collection.clone());
                current.membership_verified = true;
            }
            MutationRequest::UpdateUri { uri, .. } => {
                current.metadata_uri = Some(uri.clone());
            }
        }
        self.index.write(current);
        Ok(MutationReceipt {
            signature: format!("sig-{}-{}", seq, id),
        })
    }
}

/// Metadata host that serves every URI except the ones marked missing.
#[derive(Default)]
pub struct FakeGateway {
    missing: Mutex<HashSet<String>>,
    pub checked: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn mark_missing(&self, uri: &str) {
        self.missing.lock().insert(uri.to_string());
    }
}

#[async_trait]
impl MetadataChecker for FakeGateway {
    async fn check_metadata(&self, uri: &str) -> Result<MetadataCheck, UriCheckError> {
        self.checked.lock().push(uri.to_string());
        if self.missing.lock().contains(uri) {
            return Err(UriCheckError {
                uri: uri.to_string(),
                detail: "HTTP 404".to_string(),
            });
        }
        Ok(MetadataCheck {
            image: uri.replace(".json", ".png"),
            image_reachable: true,
        })
    }
}

pub fn queue_for(ledger: Arc<FakeLedger>) -> Arc<MutationQueue> {
    Arc::new(MutationQueue::spawn(
        ledger,
        AuthorityIdentity::new("/keys/authority.json"),
    ))
}
