//! Autoscaler — periodic control loop resizing the pool under hysteresis
//!
//! Every sampling interval the loop reads the average pending-per-worker
//! (integer division) and feeds it to a hysteresis state machine: 2
//! consecutive high samples add a worker, 3 consecutive low samples remove
//! the most-recently-added one. The asymmetry biases against flapping.
//! Scale-up and scale-down are mutually exclusive per cycle. Disabling the
//! autoscaler skips evaluation but deliberately keeps accumulated streaks.

use crate::config::AutoscalerConfig;
use crate::scaling::executor::PoolScaler;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Direction of a pool resize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScaleAction {
    Up,
    Down,
}

impl std::fmt::Display for ScaleAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// Hysteresis state machine over load samples.
///
/// Pure decision logic: `evaluate` consumes one sample and returns the
/// resize to perform, if any.
pub(crate) struct Hysteresis {
    config: AutoscalerConfig,
    high_streak: u32,
    low_streak: u32,
}

impl Hysteresis {
    pub(crate) fn new(config: AutoscalerConfig) -> Self {
        Self {
            config,
            high_streak: 0,
            low_streak: 0,
        }
    }

    /// Consume one load sample and decide whether to resize.
    ///
    /// A sample only counts toward a streak when the resize it argues for
    /// is possible (below `max_workers` for up, above 1 for down);
    /// otherwise it lands in the neutral branch and clears both streaks.
    pub(crate) fn evaluate(&mut self, avg_pending: usize, pool_size: usize) -> Option<ScaleAction> {
        if avg_pending > self.config.high_pending_threshold && pool_size < self.config.max_workers {
            self.high_streak += 1;
            self.low_streak = 0;
            if self.high_streak >= self.config.scale_up_streak {
                self.high_streak = 0;
                return Some(ScaleAction::Up);
            }
        } else if avg_pending < self.config.low_pending_threshold && pool_size > 1 {
            self.low_streak += 1;
            self.high_streak = 0;
            if self.low_streak >= self.config.scale_down_streak {
                self.low_streak = 0;
                return Some(ScaleAction::Down);
            }
        } else {
            self.high_streak = 0;
            self.low_streak = 0;
        }
        None
    }

    #[allow(dead_code)]
    pub(crate) fn high_streak(&self) -> u32 {
        self.high_streak
    }

    #[allow(dead_code)]
    pub(crate) fn low_streak(&self) -> u32 {
        self.low_streak
    }
}

/// Periodic control loop driving a `PoolScaler` from load samples
pub(crate) struct Autoscaler {
    scaler: Arc<dyn PoolScaler>,
    hysteresis: Hysteresis,
    enabled: Arc<AtomicBool>,
    interval: Duration,
}

impl Autoscaler {
    pub(crate) fn new(
        scaler: Arc<dyn PoolScaler>,
        config: AutoscalerConfig,
        enabled: Arc<AtomicBool>,
    ) -> Self {
        let interval = Duration::from_millis(config.check_interval_ms);
        Self {
            scaler,
            hysteresis: Hysteresis::new(config),
            enabled,
            interval,
        }
    }

    /// One sampling cycle: read load, evaluate, apply any resize.
    ///
    /// Does nothing while disabled (streaks are retained, not reset) or
    /// while the pool is empty.
    pub(crate) fn tick(&mut self) -> Option<ScaleAction> {
        if !self.enabled.load(Ordering::Relaxed) {
            return None;
        }
        let pool_size = self.scaler.pool_size();
        if pool_size == 0 {
            return None;
        }
        let avg_pending = self.scaler.total_pending() / pool_size;
        tracing::debug!(avg_pending, pool = pool_size, "autoscaler sample");

        let action = self.hysteresis.evaluate(avg_pending, pool_size)?;
        match action {
            ScaleAction::Up => match self.scaler.scale_up() {
                Ok(id) => {
                    tracing::info!(worker = id, avg_pending, "scaled up");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "scale-up failed");
                }
            },
            ScaleAction::Down => match self.scaler.scale_down() {
                Ok(id) => {
                    tracing::info!(worker = id, avg_pending, "scaled down");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "scale-down failed");
                }
            },
        }
        Some(action)
    }

    /// Run the sampling loop until the shutdown signal fires
    pub(crate) async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.interval) => {
                    self.tick();
                }
            }
        }
        tracing::debug!("autoscaler stopped");
    }
}
