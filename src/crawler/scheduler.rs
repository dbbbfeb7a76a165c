//! Work distribution between listing walkers and detail workers
//!
//! This module handles:
//! - The bounded queue of item references (backpressure on walkers)
//! - The shared receiving end drained by the detail worker pool
//! - The stop signal observed by every task of a run

use crate::catalog::ItemReference;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Cooperative stop request for a running crawl
///
/// Once raised, walkers stop issuing page requests, queued references are
/// discarded and in-flight fetches run to completion.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal; idempotent
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal is raised
    pub async fn stopped(&self) {
        self.token.cancelled().await
    }
}

/// Creates a bounded work queue
///
/// # Arguments
///
/// * `capacity` - Maximum number of references waiting for a worker
pub fn work_queue(capacity: usize) -> (WorkSender, WorkReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        WorkSender { tx },
        WorkReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer side, one clone per listing walker
#[derive(Debug, Clone)]
pub struct WorkSender {
    tx: mpsc::Sender<ItemReference>,
}

impl WorkSender {
    /// Enqueues a reference, waiting while the queue is full
    ///
    /// Returns false if the reference was not enqueued because the crawl was
    /// stopped or every worker is gone.
    pub async fn push(&self, reference: ItemReference, stop: &StopSignal) -> bool {
        if stop.is_stopped() {
            return false;
        }
        tokio::select! {
            biased;
            _ = stop.stopped() => false,
            sent = self.tx.send(reference) => sent.is_ok(),
        }
    }
}

/// Consumer side, shared by all detail workers
#[derive(Debug, Clone)]
pub struct WorkReceiver {
    rx: Arc<Mutex<mpsc::Receiver<ItemReference>>>,
}

impl WorkReceiver {
    /// Takes the next reference; `None` once every sender is dropped and
    /// the queue is drained
    pub async fn next(&self) -> Option<ItemReference> {
        self.rx.lock().await.recv().await
    }
}
