//! Engine — single owner of the queue, registry, policy, and counters
//!
//! The engine replaces process-wide globals with one instance that the
//! traffic source and any control or display surface share by handle. It
//! owns the global inbound queue, the worker registry, the active policy,
//! and the dispatcher/autoscaler tasks.

use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::metrics::EngineSnapshot;
use crate::policy::Policy;
use crate::pool::WorkerRegistry;
use crate::request::Request;
use crate::scaling::{Autoscaler, PoolScaler};
use crate::EngineState;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tokio::sync::{mpsc, watch};

/// Outcome of handing a request to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Enqueued on the global inbound queue
    Accepted,
    /// Not enqueued: malformed, or the engine is shutting down
    Rejected,
}

/// The dispatch-and-scaling engine
pub struct Engine {
    config: EngineConfig,
    registry: Arc<WorkerRegistry>,
    policy: Arc<RwLock<Policy>>,
    inbound_tx: mpsc::UnboundedSender<Request>,
    /// Receiver half, taken by the dispatch loop on `start()`
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Request>>>,
    total_served: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
    autoscaling_enabled: Arc<AtomicBool>,
    state: RwLock<EngineState>,
    start_time: Instant,
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl Engine {
    /// Create a new engine from configuration
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);
        let autoscaling_enabled = Arc::new(AtomicBool::new(config.autoscaler.enabled));
        let registry = Arc::new(WorkerRegistry::new(config.worker));

        Ok(Self {
            config,
            registry,
            policy: Arc::new(RwLock::new(Policy::default())),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            total_served: Arc::new(AtomicU64::new(0)),
            dropped: Arc::new(AtomicU64::new(0)),
            autoscaling_enabled,
            state: RwLock::new(EngineState::Created),
            start_time: Instant::now(),
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Start the engine: spawn the initial workers, the dispatch loop, and
    /// the autoscaler loop.
    ///
    /// Must be called from within a tokio runtime. A second call is a no-op.
    pub fn start(&self) {
        if self.state() != EngineState::Created {
            tracing::warn!("engine already started");
            return;
        }
        let Some(inbound_rx) = self.inbound_rx.lock().unwrap().take() else {
            return;
        };

        for _ in 0..self.config.initial_workers {
            self.registry.add_worker();
        }

        let dispatcher = Dispatcher::new(
            self.registry.clone(),
            self.policy.clone(),
            self.total_served.clone(),
            self.dropped.clone(),
        );
        let scaler: Arc<dyn PoolScaler> = self.registry.clone();
        let autoscaler = Autoscaler::new(
            scaler,
            self.config.autoscaler.clone(),
            self.autoscaling_enabled.clone(),
        );

        let mut handles = self.handles.lock().unwrap();
        handles.push(tokio::spawn(
            dispatcher.run(inbound_rx, self.shutdown_tx.subscribe()),
        ));
        handles.push(tokio::spawn(autoscaler.run(self.shutdown_tx.subscribe())));

        self.set_state(EngineState::Running);
        tracing::info!(
            workers = self.registry.len(),
            policy = %self.policy(),
            autoscaling = self.auto_scaling_enabled(),
            "engine started"
        );
    }

    /// Submit a request for dispatch.
    ///
    /// Malformed requests (empty client key or zero size) are rejected
    /// without being enqueued. Multiple producers may call this
    /// concurrently; only the dispatch loop consumes.
    pub fn submit_request(&self, request: Request) -> Submission {
        if let Err(e) = request.validate() {
            tracing::debug!(client = %request.client_ip, size = request.size, error = %e,
                "rejecting malformed request");
            return Submission::Rejected;
        }
        if self.inbound_tx.send(request).is_err() {
            return Submission::Rejected;
        }
        Submission::Accepted
    }

    /// Switch the active policy; takes effect on the next dispatch
    pub fn set_policy(&self, policy: Policy) {
        *self.policy.write().unwrap() = policy;
        tracing::info!(policy = %policy, "policy changed");
    }

    /// The currently active policy
    pub fn policy(&self) -> Policy {
        *self.policy.read().unwrap()
    }

    /// Add one worker to the pool; returns its id
    pub fn add_worker(&self) -> u32 {
        self.registry.add_worker()
    }

    /// Remove the most-recently-added worker.
    ///
    /// Fails with `MinimumPool` when only one worker remains; the pool is
    /// unchanged in that case.
    pub fn remove_worker(&self) -> Result<u32> {
        self.registry.remove_worker()
    }

    /// Number of live workers
    pub fn worker_count(&self) -> usize {
        self.registry.len()
    }

    /// Enable or disable the autoscaler.
    ///
    /// Disabling does not clear accumulated hysteresis streaks.
    pub fn set_auto_scaling_enabled(&self, enabled: bool) {
        self.autoscaling_enabled.store(enabled, Ordering::SeqCst);
        tracing::info!(enabled, "autoscaling toggled");
    }

    /// Whether the autoscaler is currently acting on samples
    pub fn auto_scaling_enabled(&self) -> bool {
        self.autoscaling_enabled.load(Ordering::SeqCst)
    }

    /// Requests successfully handed to a worker
    pub fn total_requests_served(&self) -> u64 {
        self.total_served.load(Ordering::Relaxed)
    }

    /// Requests dropped by the dispatcher
    pub fn requests_dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Point-in-time metrics for display surfaces
    pub fn snapshot_metrics(&self) -> EngineSnapshot {
        let workers: Vec<_> = self
            .registry
            .snapshot()
            .iter()
            .map(|w| w.snapshot())
            .collect();
        EngineSnapshot {
            policy: self.policy(),
            worker_count: workers.len(),
            total_requests_served: self.total_requests_served(),
            requests_dropped: self.requests_dropped(),
            auto_scaling_enabled: self.auto_scaling_enabled(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            workers,
        }
    }

    /// A receiver that flips to `true` when the engine shuts down
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Graceful teardown: stop the dispatcher and autoscaler loops, then
    /// every worker. Each worker finishes at most its current in-flight
    /// item; queued items are discarded. Idempotent.
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.write().unwrap();
            if matches!(*state, EngineState::Stopping | EngineState::Stopped) {
                return;
            }
            tracing::debug!(from = %*state, to = %EngineState::Stopping, "state transition");
            *state = EngineState::Stopping;
        }
        tracing::info!("engine shutting down");

        let _ = self.shutdown_tx.send(true);
        let handles: Vec<_> = self.handles.lock().unwrap().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }

        self.registry.stop_all();
        self.registry.join_all().await;

        self.set_state(EngineState::Stopped);
        tracing::info!(
            served = self.total_requests_served(),
            dropped = self.requests_dropped(),
            "engine stopped"
        );
    }

    /// Wait for Ctrl+C, then shut down
    pub async fn wait_for_shutdown(&self) {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for Ctrl+C");
        self.shutdown().await;
    }

    /// Current engine state
    pub fn state(&self) -> EngineState {
        self.state.read().unwrap().clone()
    }

    /// Whether the engine is running
    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    fn set_state(&self, new_state: EngineState) {
        let mut state = self.state.write().unwrap();
        tracing::debug!(from = %*state, to = %new_state, "state transition");
        *state = new_state;
    }
}
