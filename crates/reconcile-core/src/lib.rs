//! Collection consistency and repair engine.
//!
//! The pipeline reads a collection from an eventually-consistent index,
//! checks every member against an [`ExpectedContract`](reconcile_types::ExpectedContract)
//! and repairs what it is allowed to repair on the ledger:
//!
//! - [`fetcher`]: walks `getAssetsByGroup` pages until a short page
//! - [`rules`]: the nine per-member consistency rules
//! - [`report`]: aggregates issues into an [`AuditReport`]
//! - [`state`]: per-member verification state machine
//! - [`queue`]: serialized mutation queue bound to one signing identity
//! - [`poller`]: waits out index propagation lag after a mutation
//! - [`orchestrator`]: drives membership verification repairs
//! - [`retarget`]: plans and applies metadata URI rewrites
//!
//! # Example
//!
//! ```ignore
//! use reconcile_core::{AuditReport, PaginatedFetcher};
//! use reconcile_transport::{DasClient, GroupQuery};
//!
//! let fetcher = PaginatedFetcher::new(DasClient::new(endpoint));
//! let members = fetcher.fetch_all(&GroupQuery::collection(&contract.group_value)).await?;
//! let report = AuditReport::build(&contract, &members);
//! ```

pub mod fetcher;
pub mod orchestrator;
pub mod poller;
pub mod queue;
pub mod report;
pub mod retarget;
pub mod rules;
pub mod state;

pub use fetcher::{FetchProgress, PaginatedFetcher, PartialFetch};
pub use orchestrator::{
    FailedMember, RepairOrchestrator, RepairOutcome, RepairReport, RepairedMember,
};
pub use poller::{Expectation, PropagationPoller};
pub use queue::{MutationQueue, QueueClosed};
pub use report::{AuditReport, IssueCount, MemberIssues};
pub use retarget::{
    plan, RetargetEntry, RetargetOutcome, RetargetPlan, RetargetReport, RetargetRunner,
    RetargetSkip, RetargetStatus, RetargetTemplate, UnreachableUri,
};
pub use rules::evaluate;
pub use state::{
    ObservedLink, StateBook, TransitionError, TransitionRecord, VerificationState, VerifyEvent,
};
