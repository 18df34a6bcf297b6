//! Dispatch loop — routes inbound requests to exactly one worker
//!
//! A single task consumes the global inbound queue. It is the sole writer
//! of the rotation cursor and the served counter, so neither needs a lock.
//! Routing failures are non-fatal: the request is dropped and counted.

use crate::error::EngineError;
use crate::policy::{self, Policy};
use crate::pool::WorkerRegistry;
use crate::request::Request;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, watch};

/// The single consumer of the global inbound queue
pub(crate) struct Dispatcher {
    registry: Arc<WorkerRegistry>,
    policy: Arc<RwLock<Policy>>,
    total_served: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
}

impl Dispatcher {
    pub(crate) fn new(
        registry: Arc<WorkerRegistry>,
        policy: Arc<RwLock<Policy>>,
        total_served: Arc<AtomicU64>,
        dropped: Arc<AtomicU64>,
    ) -> Self {
        Self {
            registry,
            policy,
            total_served,
            dropped,
        }
    }

    /// Consume the inbound queue until the shutdown signal fires or the
    /// queue closes
    pub(crate) async fn run(
        self,
        mut inbound: mpsc::UnboundedReceiver<Request>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut cursor: usize = 0;
        loop {
            let request = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                received = inbound.recv() => match received {
                    Some(request) => request,
                    None => break,
                },
            };
            self.dispatch_one(request, &mut cursor);
        }
        tracing::debug!("dispatcher stopped");
    }

    /// Route one request to a worker under the active policy
    fn dispatch_one(&self, request: Request, cursor: &mut usize) {
        let workers = self.registry.snapshot();
        if workers.is_empty() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(client = %request.client_ip, error = %EngineError::EmptyRegistry,
                "dropping request");
            return;
        }

        let active = *self.policy.read().unwrap();
        let Some(worker) = policy::select(active, &workers, cursor, &request) else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };

        match worker.submit(request) {
            Ok(()) => {
                self.total_served.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(worker = worker.id(), policy = %active, "request dispatched");
            }
            Err(e) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(worker = worker.id(), error = %e, "submit failed, dropping request");
            }
        }
    }
}
