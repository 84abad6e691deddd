//! Reconcile Transport Layer
//!
//! Adapters between the reconciliation engine and the outside world.
//!
//! This crate provides:
//! - [`das`]: JSON-RPC client for a DAS index (`getAssetsByGroup`, `getAsset`)
//! - [`gateway`]: metadata reachability checks ahead of URI rewrites
//! - [`normalize`]: projection of raw DAS records into [`reconcile_types::Member`]
//! - [`index`]: the [`IndexClient`] trait the engine reads through
//! - [`ledger`]: the [`LedgerClient`] trait the engine writes through
//! - [`signer`]: a [`LedgerClient`] that delegates to an external signer command
//!
//! # Example
//!
//! ```ignore
//! use reconcile_transport::{DasClient, GroupQuery};
//!
//! let das = DasClient::new("https://devnet.helius-rpc.com/?api-key=...");
//! let page = das.fetch_group_page(&GroupQuery::collection("BgfA..."), 1)?;
//! ```

pub mod das;
pub mod gateway;
pub mod index;
pub mod ledger;
pub mod network;
pub mod normalize;
pub mod signer;
pub mod test_utils;

// Re-export main types for convenience
pub use das::DasClient;
pub use gateway::{GatewayClient, MetadataCheck, MetadataChecker, UriCheckError};
pub use index::{GroupPage, GroupQuery, IndexClient, IndexUnavailable, GROUP_PAGE_LIMIT};
pub use ledger::{AuthorityIdentity, LedgerClient, MutationReceipt, MutationRequest};
pub use signer::SignerCommandLedger;
