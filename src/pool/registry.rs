//! Worker registry — the live, ordered set of workers the dispatcher routes to
//!
//! Scale-up appends at the tail with a fresh monotonic id; scale-down stops
//! and removes the most-recently-added worker. Ids are never reused. A floor
//! of one worker is enforced for explicit removal.

use crate::config::WorkerConfig;
use crate::error::{EngineError, Result};
use crate::pool::Worker;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

/// Ordered, concurrency-safe collection of live workers
pub struct WorkerRegistry {
    workers: RwLock<Vec<Arc<Worker>>>,
    next_id: AtomicU32,
    worker_config: WorkerConfig,
}

impl WorkerRegistry {
    /// Create an empty registry
    pub fn new(worker_config: WorkerConfig) -> Self {
        Self {
            workers: RwLock::new(Vec::new()),
            next_id: AtomicU32::new(1),
            worker_config,
        }
    }

    /// Spawn a new worker, append it at the tail, and return its id
    pub fn add_worker(&self) -> u32 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let worker = Worker::spawn(id, self.worker_config);
        self.workers.write().unwrap().push(worker);
        tracing::info!(worker = id, pool = self.len(), "worker added");
        id
    }

    /// Stop and remove the most-recently-added worker.
    ///
    /// Fails with `MinimumPool` when only one worker remains.
    pub fn remove_worker(&self) -> Result<u32> {
        let removed = {
            let mut workers = self.workers.write().unwrap();
            if workers.len() <= 1 {
                return Err(EngineError::MinimumPool);
            }
            workers.pop()
        };
        match removed {
            Some(worker) => {
                worker.stop();
                tracing::info!(worker = worker.id(), pool = self.len(), "worker removed");
                Ok(worker.id())
            }
            None => Err(EngineError::MinimumPool),
        }
    }

    /// Point-in-time copy of the worker list, in registry order
    pub fn snapshot(&self) -> Vec<Arc<Worker>> {
        self.workers.read().unwrap().clone()
    }

    /// Number of live workers
    pub fn len(&self) -> usize {
        self.workers.read().unwrap().len()
    }

    /// Whether the registry holds no workers
    pub fn is_empty(&self) -> bool {
        self.workers.read().unwrap().is_empty()
    }

    /// Sum of pending requests across all workers
    pub fn total_pending(&self) -> usize {
        self.workers
            .read()
            .unwrap()
            .iter()
            .map(|w| w.pending())
            .sum()
    }

    /// Stop every worker without removing it from the registry
    pub fn stop_all(&self) {
        for worker in self.snapshot() {
            worker.stop();
        }
    }

    /// Wait for every worker's processing loop to exit
    pub async fn join_all(&self) {
        for worker in self.snapshot() {
            worker.join().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> WorkerRegistry {
        WorkerRegistry::new(WorkerConfig {
            capacity: 50,
            base_delay_ms: 1,
            max_jitter_ms: 0,
        })
    }

    #[tokio::test]
    async fn test_add_assigns_monotonic_ids() {
        let registry = test_registry();
        assert_eq!(registry.add_worker(), 1);
        assert_eq!(registry.add_worker(), 2);
        assert_eq!(registry.add_worker(), 3);
        assert_eq!(registry.len(), 3);
        registry.stop_all();
    }

    #[tokio::test]
    async fn test_ids_never_reused_after_removal() {
        let registry = test_registry();
        registry.add_worker();
        registry.add_worker();
        assert_eq!(registry.remove_worker().unwrap(), 2);
        // The freed id is not handed out again
        assert_eq!(registry.add_worker(), 3);
        registry.stop_all();
    }

    #[tokio::test]
    async fn test_remove_takes_tail() {
        let registry = test_registry();
        registry.add_worker();
        registry.add_worker();
        registry.add_worker();
        assert_eq!(registry.remove_worker().unwrap(), 3);
        assert_eq!(registry.remove_worker().unwrap(), 2);
        assert_eq!(registry.len(), 1);
        registry.stop_all();
    }

    #[tokio::test]
    async fn test_minimum_pool_floor() {
        let registry = test_registry();
        registry.add_worker();
        let err = registry.remove_worker().unwrap_err();
        assert!(matches!(err, EngineError::MinimumPool));
        assert_eq!(registry.len(), 1);
        registry.stop_all();
    }

    #[tokio::test]
    async fn test_removed_worker_is_stopped() {
        let registry = test_registry();
        registry.add_worker();
        registry.add_worker();
        let workers = registry.snapshot();
        let tail = workers.last().unwrap().clone();
        registry.remove_worker().unwrap();
        assert!(tail.is_stopped());
        registry.stop_all();
    }

    #[tokio::test]
    async fn test_snapshot_preserves_order() {
        let registry = test_registry();
        registry.add_worker();
        registry.add_worker();
        registry.add_worker();
        let ids: Vec<u32> = registry.snapshot().iter().map(|w| w.id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        registry.stop_all();
    }

    #[tokio::test]
    async fn test_total_pending() {
        let registry = WorkerRegistry::new(WorkerConfig {
            capacity: 50,
            base_delay_ms: 60_000,
            max_jitter_ms: 0,
        });
        registry.add_worker();
        registry.add_worker();
        let workers = registry.snapshot();
        workers[0]
            .submit(crate::request::Request::new("10.0.0.1", 1))
            .unwrap();
        workers[0]
            .submit(crate::request::Request::new("10.0.0.2", 1))
            .unwrap();
        workers[1]
            .submit(crate::request::Request::new("10.0.0.3", 1))
            .unwrap();
        assert_eq!(registry.total_pending(), 3);
        registry.stop_all();
    }

    #[tokio::test]
    async fn test_stop_all_and_join_all() {
        let registry = test_registry();
        registry.add_worker();
        registry.add_worker();
        registry.stop_all();
        registry.join_all().await;
        for worker in registry.snapshot() {
            assert!(worker.is_stopped());
        }
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let registry = test_registry();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.total_pending(), 0);
        assert!(registry.snapshot().is_empty());
    }
}
