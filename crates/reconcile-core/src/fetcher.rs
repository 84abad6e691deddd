//! Paginated group membership fetcher.
//!
//! Pages are requested in order starting at 1 with a fixed page size. A page
//! holding fewer raw records than the page size is the last one. An index
//! error mid-way aborts the walk with [`PartialFetch`]; partial results are
//! discarded and a retry starts again from page 1.
//!
//! ```ignore
//! let fetcher = PaginatedFetcher::new(das);
//! let members = fetcher
//!     .fetch_all_with_progress(&GroupQuery::collection("BgfA..."), |p| {
//!         eprintln!("page {}: {} members ({} total)", p.page, p.page_len, p.total)
//!     })
//!     .await?;
//! ```

use futures::stream::{self, Stream, TryStreamExt};
use reconcile_transport::{GroupPage, GroupQuery, IndexClient};
use reconcile_types::{Member, MemberId};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

/// Pagination stopped early because the index failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialFetch {
    /// The page that failed.
    pub page: u32,
    /// Members received before the failure, now discarded.
    pub members_discarded: usize,
    pub detail: String,
}

impl fmt::Display for PartialFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetch incomplete: page {} failed after {} members ({})",
            self.page, self.members_discarded, self.detail
        )
    }
}

impl std::error::Error for PartialFetch {}

/// Progress after each page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
    pub page: u32,
    pub page_len: usize,
    /// Unique members accumulated so far.
    pub total: usize,
}

/// Walks every page of a group membership query.
pub struct PaginatedFetcher<I> {
    index: I,
}

impl<I: IndexClient> PaginatedFetcher<I> {
    pub fn new(index: I) -> Self {
        Self { index }
    }

    /// Lazy stream of `(page_number, page)`.
    ///
    /// The stream ends after the first short page, or after yielding one
    /// `Err` when the index fails.
    pub fn pages<'a>(
        &'a self,
        query: &GroupQuery,
    ) -> impl Stream<Item = Result<(u32, GroupPage), PartialFetch>> + 'a {
        let index = &self.index;
        let query = query.clone();
        stream::try_unfold((Some(1u32), 0usize), move |(next, received)| {
            let query = query.clone();
            async move {
                let Some(page) = next else {
                    return Ok::<_, PartialFetch>(None);
                };
                let result = match index.query_group_page(&query, page).await {
                    Ok(result) => result,
                    Err(e) => {
                        return Err(PartialFetch {
                            page,
                            members_discarded: received,
                            detail: e.detail,
                        })
                    }
                };
                debug!(
                    page,
                    received = result.received,
                    normalized = result.items.len(),
                    "fetched group page"
                );
                let next = if result.received < query.page_size {
                    None
                } else {
                    Some(page + 1)
                };
                let received = received + result.items.len();
                Ok(Some(((page, result), (next, received))))
            }
        })
    }

    /// Fetch the whole group.
    pub async fn fetch_all(&self, query: &GroupQuery) -> Result<Vec<Member>, PartialFetch> {
        self.fetch_all_with_progress(query, |_| {}).await
    }

    /// Fetch the whole group, reporting progress after every page.
    ///
    /// Ids repeated across pages keep their first occurrence.
    pub async fn fetch_all_with_progress<F>(
        &self,
        query: &GroupQuery,
        mut on_progress: F,
    ) -> Result<Vec<Member>, PartialFetch>
    where
        F: FnMut(&FetchProgress),
    {
        let mut members: Vec<Member> = Vec::new();
        let mut seen: HashSet<MemberId> = HashSet::new();

        let pages = self.pages(query);
        futures::pin_mut!(pages);
        while let Some((page, result)) = pages.try_next().await.map_err(|mut e| {
            e.members_discarded = members.len();
            e
        })? {
            let page_len = result.items.len();
            for member in result.items {
                if seen.insert(member.id.clone()) {
                    members.push(member);
                } else {
                    warn!(
                        page,
                        member = %member.id,
                        "duplicate member across pages, keeping first"
                    );
                }
            }
            let progress = FetchProgress {
                page,
                page_len,
                total: members.len(),
            };
            info!(
                group = %query.group_value,
                page,
                page_len,
                total = progress.total,
                "fetched page"
            );
            on_progress(&progress);
        }

        Ok(members)
    }
}
