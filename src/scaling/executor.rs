//! Pool scaler — the seam through which the autoscaler mutates the pool
//!
//! `WorkerRegistry` is the production implementation; `MockScaler` records
//! actions in memory for testing the control loop.

#![allow(dead_code)]

use crate::error::Result;
use crate::pool::WorkerRegistry;

/// Read-and-mutate interface over the worker pool
pub(crate) trait PoolScaler: Send + Sync {
    /// Number of live workers
    fn pool_size(&self) -> usize;

    /// Sum of pending requests across the pool
    fn total_pending(&self) -> usize;

    /// Add one worker; returns its id
    fn scale_up(&self) -> Result<u32>;

    /// Remove the most-recently-added worker; returns its id
    fn scale_down(&self) -> Result<u32>;
}

impl PoolScaler for WorkerRegistry {
    fn pool_size(&self) -> usize {
        self.len()
    }

    fn total_pending(&self) -> usize {
        self.total_pending()
    }

    fn scale_up(&self) -> Result<u32> {
        Ok(self.add_worker())
    }

    fn scale_down(&self) -> Result<u32> {
        self.remove_worker()
    }
}

// ---------------------------------------------------------------------------
// MockScaler — records scaling actions for testing
// ---------------------------------------------------------------------------

/// Mock pool scaler with a settable load reading (test-only)
pub(crate) struct MockScaler {
    size: std::sync::atomic::AtomicUsize,
    pending: std::sync::atomic::AtomicUsize,
    ups: std::sync::atomic::AtomicUsize,
    downs: std::sync::atomic::AtomicUsize,
}

impl MockScaler {
    /// Create a mock with the given pool size and total pending
    pub(crate) fn new(size: usize, pending: usize) -> Self {
        Self {
            size: std::sync::atomic::AtomicUsize::new(size),
            pending: std::sync::atomic::AtomicUsize::new(pending),
            ups: std::sync::atomic::AtomicUsize::new(0),
            downs: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Change the reported total pending
    pub(crate) fn set_pending(&self, pending: usize) {
        self.pending
            .store(pending, std::sync::atomic::Ordering::SeqCst);
    }

    /// Number of scale-up calls recorded
    pub(crate) fn ups(&self) -> usize {
        self.ups.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Number of scale-down calls recorded
    pub(crate) fn downs(&self) -> usize {
        self.downs.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl PoolScaler for MockScaler {
    fn pool_size(&self) -> usize {
        self.size.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn total_pending(&self) -> usize {
        self.pending.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn scale_up(&self) -> Result<u32> {
        let size = self.size.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
        self.ups.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(size as u32)
    }

    fn scale_down(&self) -> Result<u32> {
        let size = self.size.load(std::sync::atomic::Ordering::SeqCst);
        if size <= 1 {
            return Err(crate::error::EngineError::MinimumPool);
        }
        self.size.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
        self.downs.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(size as u32 - 1)
    }
}
