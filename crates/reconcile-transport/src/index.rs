//! Index service interface.
//!
//! The index is eventually consistent: anything it reports may lag the
//! ledger. Callers get either a normalized answer or an explicit
//! [`IndexUnavailable`], never an empty page standing in for an error.

use async_trait::async_trait;
use reconcile_types::{Member, MemberId, COLLECTION_GROUP_KEY};
use std::fmt;

/// Page size used for group membership queries (the DAS server limit).
pub const GROUP_PAGE_LIMIT: usize = 1000;

/// A group membership query, minus the page number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupQuery {
    pub group_key: String,
    pub group_value: String,
    pub page_size: usize,
}

impl GroupQuery {
    /// Query every member of a collection, oldest first.
    pub fn collection(group_value: impl Into<String>) -> Self {
        Self {
            group_key: COLLECTION_GROUP_KEY.to_string(),
            group_value: group_value.into(),
            page_size: GROUP_PAGE_LIMIT,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// One page of group members.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupPage {
    pub items: Vec<Member>,
    /// Number of raw records the index returned, before normalization.
    ///
    /// Completion is judged on this count: a record dropped for lacking an
    /// id must not make a full page look short.
    pub received: usize,
    pub cursor: Option<String>,
}

impl GroupPage {
    pub fn from_members(items: Vec<Member>) -> Self {
        Self {
            received: items.len(),
            items,
            cursor: None,
        }
    }
}

/// The index returned no result payload, or could not be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexUnavailable {
    pub detail: String,
}

impl IndexUnavailable {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for IndexUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index unavailable: {}", self.detail)
    }
}

impl std::error::Error for IndexUnavailable {}

/// Read access to the index service.
#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Fetch page `page` (1-indexed) of a group membership query.
    async fn query_group_page(
        &self,
        query: &GroupQuery,
        page: u32,
    ) -> Result<GroupPage, IndexUnavailable>;

    /// Look up a single member's current index state.
    async fn query_asset(&self, id: &MemberId) -> Result<Member, IndexUnavailable>;
}

#[async_trait]
impl<T: IndexClient + ?Sized> IndexClient for std::sync::Arc<T> {
    async fn query_group_page(
        &self,
        query: &GroupQuery,
        page: u32,
    ) -> Result<GroupPage, IndexUnavailable> {
        (**self).query_group_page(query, page).await
    }

    async fn query_asset(&self, id: &MemberId) -> Result<Member, IndexUnavailable> {
        (**self).query_asset(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_query_defaults() {
        let q = GroupQuery::collection("Col");
        assert_eq!(q.group_key, "collection");
        assert_eq!(q.page_size, 1000);
        assert_eq!(GroupQuery::collection("Col").with_page_size(0).page_size, 1);
    }
}
