//! Collection Reconcile
//!
//! Audits an NFT collection against an operator-declared contract and
//! repairs what can be repaired:
//!
//! - **Audit**: Paginate the collection from a DAS index and check every member
//!   against nine consistency rules
//! - **Repair**: Verify unverified membership links one mutation at a time and
//!   wait out index propagation
//! - **Retarget**: Rewrite metadata URIs to a new content address
//!
//! The engine lives in [`reconcile_core`]; index and ledger adapters in
//! [`reconcile_transport`]; the shared data model in [`reconcile_types`].

pub use reconcile_core as core;
pub use reconcile_transport as transport;
pub use reconcile_types as types;
