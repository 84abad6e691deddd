//! CLI subcommand implementations for collection-reconcile

pub mod audit;
pub mod config;
pub mod inspect;
pub mod output;
pub mod repair;
pub mod retarget;

use tokio_util::sync::CancellationToken;

/// Options shared by every subcommand.
pub struct GlobalOpts {
    pub index_url: Option<String>,
    pub network: String,
    pub json: bool,
    /// Cancelled on Ctrl-C.
    pub cancel: CancellationToken,
}
