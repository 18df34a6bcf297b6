//! Worker — an independently running unit processing requests from its own queue
//!
//! Each worker owns a FIFO inbound queue and tracks three counters: queued,
//! in-flight, and total processed. `pending = queued + in_flight` is the
//! exact count of requests handed to this worker that have not completed.
//! Load percent derives from a fixed capacity and is capped at 100.

use crate::config::WorkerConfig;
use crate::error::{EngineError, Result};
use crate::metrics::WorkerSnapshot;
use crate::request::Request;
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::Notify;

/// A single worker in the pool
pub struct Worker {
    /// Worker id, unique for the lifetime of the engine
    id: u32,
    /// Pending requests that count as 100% load
    capacity: u32,
    /// Requests enqueued but not yet picked up
    queued: AtomicUsize,
    /// Requests currently being processed (0 or 1)
    in_flight: AtomicUsize,
    /// Requests fully processed since the worker started
    total_processed: AtomicU64,
    /// Set once `stop()` has been called
    stopped: AtomicBool,
    /// Wakes the processing loop so a stop is seen while idle
    stop_signal: Notify,
    /// Inbound queue sender
    tx: mpsc::UnboundedSender<Request>,
    /// Processing loop task handle, taken by `join()`
    handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Worker {
    /// Spawn a new worker and start its processing loop immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(id: u32, config: WorkerConfig) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Arc::new(Self {
            id,
            capacity: config.capacity,
            queued: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            total_processed: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            stop_signal: Notify::new(),
            tx,
            handle: Mutex::new(None),
        });

        let task = tokio::spawn(Self::run(worker.clone(), rx, config));
        *worker.handle.lock().unwrap() = Some(task);
        worker
    }

    /// Enqueue a request on this worker.
    ///
    /// Fails with `QueueClosed` once the worker has been told to stop.
    pub fn submit(&self, request: Request) -> Result<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(EngineError::QueueClosed { worker: self.id });
        }
        // Count before sending so pending never under-reports an owned request
        self.queued.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(request).is_err() {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(EngineError::QueueClosed { worker: self.id });
        }
        Ok(())
    }

    /// Signal the processing loop to terminate. Idempotent.
    ///
    /// A worker blocked waiting for work exits immediately; a worker in the
    /// middle of an item finishes that item first. Queued items that have
    /// not started are abandoned.
    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            self.stop_signal.notify_one();
        }
    }

    /// Wait for the processing loop to exit
    pub async fn join(&self) {
        let task = self.handle.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Worker id
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Requests enqueued but not yet started
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Requests currently being processed
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Queued plus in-flight requests
    pub fn pending(&self) -> usize {
        self.queued() + self.in_flight()
    }

    /// Requests fully processed since the worker started
    pub fn total_processed(&self) -> u64 {
        self.total_processed.load(Ordering::SeqCst)
    }

    /// Current load as a percentage of capacity, capped at 100
    pub fn load_percent(&self) -> f64 {
        (self.pending() as f64 / self.capacity as f64 * 100.0).min(100.0)
    }

    /// Whether `stop()` has been called
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Point-in-time view of this worker's counters
    pub fn snapshot(&self) -> WorkerSnapshot {
        let queued = self.queued();
        let in_flight = self.in_flight();
        WorkerSnapshot {
            worker_id: self.id,
            queued,
            in_flight,
            pending: queued + in_flight,
            total_processed: self.total_processed(),
            load_percent: self.load_percent(),
        }
    }

    /// Processing loop — takes requests from the queue until stopped
    async fn run(self: Arc<Self>, mut rx: mpsc::UnboundedReceiver<Request>, config: WorkerConfig) {
        loop {
            let request = tokio::select! {
                biased;
                _ = self.stop_signal.notified() => break,
                received = rx.recv() => match received {
                    Some(request) => request,
                    None => break,
                },
            };

            self.queued.fetch_sub(1, Ordering::SeqCst);
            self.in_flight.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(
                worker = self.id,
                client = %request.client_ip,
                size = request.size,
                "processing request"
            );

            tokio::time::sleep(processing_delay(request.size, &config)).await;

            self.total_processed.fetch_add(1, Ordering::SeqCst);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        tracing::info!(worker = self.id, "worker stopped");
    }
}

/// Simulated processing time: `base + floor(size^1.5) + jitter` milliseconds,
/// with jitter drawn uniformly from `[0, max_jitter_ms)`
fn processing_delay(size: u32, config: &WorkerConfig) -> Duration {
    let variable = (size as f64).powf(1.5) as u64;
    let jitter = if config.max_jitter_ms > 0 {
        rand::rng().random_range(0..config.max_jitter_ms)
    } else {
        0
    };
    Duration::from_millis(config.base_delay_ms + variable + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> WorkerConfig {
        WorkerConfig {
            capacity: 50,
            base_delay_ms: 1,
            max_jitter_ms: 0,
        }
    }

    fn slow_config() -> WorkerConfig {
        WorkerConfig {
            capacity: 50,
            base_delay_ms: 60_000,
            max_jitter_ms: 0,
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met within timeout");
    }

    #[test]
    fn test_processing_delay_formula() {
        let config = WorkerConfig {
            capacity: 50,
            base_delay_ms: 50,
            max_jitter_ms: 0,
        };
        // 4^1.5 = 8
        assert_eq!(processing_delay(4, &config), Duration::from_millis(58));
        // floor(10^1.5) = floor(31.62) = 31
        assert_eq!(processing_delay(10, &config), Duration::from_millis(81));
        // 100^1.5 = 1000
        assert_eq!(processing_delay(100, &config), Duration::from_millis(1050));
    }

    #[test]
    fn test_processing_delay_jitter_bounds() {
        let config = WorkerConfig {
            capacity: 50,
            base_delay_ms: 50,
            max_jitter_ms: 200,
        };
        for _ in 0..100 {
            let delay = processing_delay(1, &config);
            // base 50 + 1^1.5 = 51, jitter in [0, 200)
            assert!(delay >= Duration::from_millis(51));
            assert!(delay < Duration::from_millis(251));
        }
    }

    #[tokio::test]
    async fn test_submit_and_process() {
        let worker = Worker::spawn(1, fast_config());
        worker.submit(Request::new("10.0.0.1", 1)).unwrap();
        worker.submit(Request::new("10.0.0.2", 1)).unwrap();

        wait_until(|| worker.total_processed() == 2).await;
        assert_eq!(worker.pending(), 0);
        assert_eq!(worker.queued(), 0);
        assert_eq!(worker.in_flight(), 0);

        worker.stop();
        worker.join().await;
    }

    #[tokio::test]
    async fn test_pending_counts_queued_and_in_flight() {
        let worker = Worker::spawn(1, slow_config());
        for i in 0..3 {
            worker
                .submit(Request::new(format!("10.0.0.{}", i), 1))
                .unwrap();
        }

        // First item moves to in-flight; the other two stay queued
        wait_until(|| worker.in_flight() == 1).await;
        assert_eq!(worker.queued(), 2);
        assert_eq!(worker.pending(), 3);

        worker.stop();
    }

    #[tokio::test]
    async fn test_submit_after_stop_fails() {
        let worker = Worker::spawn(7, fast_config());
        worker.stop();
        let err = worker.submit(Request::new("10.0.0.1", 1)).unwrap_err();
        assert!(matches!(err, EngineError::QueueClosed { worker: 7 }));
        worker.join().await;
    }

    #[tokio::test]
    async fn test_stop_idempotent() {
        let worker = Worker::spawn(1, fast_config());
        worker.stop();
        worker.stop();
        worker.stop();
        worker.join().await;
        assert!(worker.is_stopped());
    }

    #[tokio::test]
    async fn test_stop_while_idle_exits_immediately() {
        let worker = Worker::spawn(1, fast_config());
        // Let the loop reach its blocking wait
        tokio::time::sleep(Duration::from_millis(20)).await;
        worker.stop();
        worker.join().await;
    }

    #[tokio::test]
    async fn test_stop_mid_item_finishes_current_and_abandons_queued() {
        let config = WorkerConfig {
            capacity: 50,
            base_delay_ms: 100,
            max_jitter_ms: 0,
        };
        let worker = Worker::spawn(1, config);
        worker.submit(Request::new("10.0.0.1", 1)).unwrap();
        worker.submit(Request::new("10.0.0.2", 1)).unwrap();

        // Stop while the first item is in flight
        wait_until(|| worker.in_flight() == 1).await;
        worker.stop();
        worker.join().await;

        // The in-flight item completed; the queued one was abandoned
        assert_eq!(worker.total_processed(), 1);
        assert_eq!(worker.queued(), 1);
        assert_eq!(worker.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_load_percent() {
        let config = WorkerConfig {
            capacity: 4,
            base_delay_ms: 60_000,
            max_jitter_ms: 0,
        };
        let worker = Worker::spawn(1, config);
        assert_eq!(worker.load_percent(), 0.0);

        worker.submit(Request::new("10.0.0.1", 1)).unwrap();
        worker.submit(Request::new("10.0.0.2", 1)).unwrap();
        assert_eq!(worker.load_percent(), 50.0);

        worker.stop();
    }

    #[tokio::test]
    async fn test_load_percent_capped_at_100() {
        let config = WorkerConfig {
            capacity: 2,
            base_delay_ms: 60_000,
            max_jitter_ms: 0,
        };
        let worker = Worker::spawn(1, config);
        for i in 0..5 {
            worker
                .submit(Request::new(format!("10.0.0.{}", i), 1))
                .unwrap();
        }
        assert_eq!(worker.load_percent(), 100.0);
        worker.stop();
    }

    #[tokio::test]
    async fn test_processes_every_submitted_request() {
        let worker = Worker::spawn(1, fast_config());
        for i in 1..=5u32 {
            worker.submit(Request::new("10.0.0.1", i)).unwrap();
        }
        wait_until(|| worker.total_processed() == 5).await;
        assert_eq!(worker.total_processed(), 5);
        worker.stop();
        worker.join().await;
    }

    #[tokio::test]
    async fn test_snapshot_fields() {
        let worker = Worker::spawn(9, slow_config());
        worker.submit(Request::new("10.0.0.1", 1)).unwrap();
        wait_until(|| worker.in_flight() == 1).await;

        let snap = worker.snapshot();
        assert_eq!(snap.worker_id, 9);
        assert_eq!(snap.pending, 1);
        assert_eq!(snap.in_flight, 1);
        assert_eq!(snap.queued, 0);
        assert_eq!(snap.total_processed, 0);
        assert!(snap.load_percent > 0.0);

        worker.stop();
    }
}
