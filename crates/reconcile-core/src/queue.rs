//! Serialized mutation queue.
//!
//! Every ledger mutation signed by one authority goes through a single
//! worker task. Callers enqueue a [`MutationRequest`] and await its reply;
//! the worker submits one request at a time, so two mutations under the same
//! identity are never in flight together.

use reconcile_transport::{AuthorityIdentity, LedgerClient, MutationReceipt, MutationRequest};
use reconcile_types::LedgerError;
use std::fmt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Requests buffered ahead of the worker.
const QUEUE_DEPTH: usize = 16;

type Reply = oneshot::Sender<Result<MutationReceipt, LedgerError>>;

/// The worker is gone; no further mutations can be issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;

impl fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("mutation queue closed")
    }
}

impl std::error::Error for QueueClosed {}

/// Handle to the mutation worker bound to one [`AuthorityIdentity`].
pub struct MutationQueue {
    tx: mpsc::Sender<(MutationRequest, Reply)>,
    authority: AuthorityIdentity,
    worker: JoinHandle<usize>,
}

impl MutationQueue {
    /// Spawn the worker. Must be called inside a Tokio runtime.
    pub fn spawn<L>(ledger: L, authority: AuthorityIdentity) -> Self
    where
        L: LedgerClient + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<(MutationRequest, Reply)>(QUEUE_DEPTH);
        let worker_authority = authority.clone();
        let worker = tokio::spawn(async move {
            let mut submitted = 0usize;
            while let Some((request, reply)) = rx.recv().await {
                submitted += 1;
                debug!(
                    seq = submitted,
                    action = request.action(),
                    member = %request.member(),
                    "submitting mutation"
                );
                let outcome = ledger.submit(&request, &worker_authority).await;
                // The caller may have gone away; the mutation still happened.
                let _ = reply.send(outcome);
            }
            submitted
        });
        Self {
            tx,
            authority,
            worker,
        }
    }

    pub fn authority(&self) -> &AuthorityIdentity {
        &self.authority
    }

    /// Enqueue `request` and wait for the ledger's terminal answer.
    pub async fn submit(
        &self,
        request: MutationRequest,
    ) -> Result<Result<MutationReceipt, LedgerError>, QueueClosed> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| QueueClosed)?;
        reply_rx.await.map_err(|_| QueueClosed)
    }

    /// Stop accepting work, let queued mutations finish, and return how many
    /// were submitted.
    pub async fn shutdown(self) -> usize {
        drop(self.tx);
        match self.worker.await {
            Ok(submitted) => {
                info!(submitted, authority = %self.authority, "mutation queue drained");
                submitted
            }
            Err(e) => {
                warn!(error = %e, "mutation worker ended abnormally");
                0
            }
        }
    }
}
