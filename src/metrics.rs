//! Metrics snapshots — point-in-time views for display and control surfaces

use crate::policy::Policy;
use serde::{Deserialize, Serialize};

/// Point-in-time view of one worker's counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    /// Worker id
    pub worker_id: u32,
    /// Requests enqueued but not yet started
    pub queued: usize,
    /// Requests currently being processed
    pub in_flight: usize,
    /// Queued plus in-flight
    pub pending: usize,
    /// Requests fully processed since the worker started
    pub total_processed: u64,
    /// Load as a percentage of capacity, capped at 100
    pub load_percent: f64,
}

/// Point-in-time view of the whole engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Active load-distribution policy
    pub policy: Policy,
    /// Number of live workers
    pub worker_count: usize,
    /// Requests successfully handed to a worker
    pub total_requests_served: u64,
    /// Requests dropped by the dispatcher (empty pool or closed queue)
    pub requests_dropped: u64,
    /// Whether the autoscaler is currently acting on samples
    pub auto_scaling_enabled: bool,
    /// Seconds since the engine was created
    pub uptime_secs: u64,
    /// Per-worker views, in registry order
    pub workers: Vec<WorkerSnapshot>,
}
