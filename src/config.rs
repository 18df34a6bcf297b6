//! Engine configuration — worker pool sizing, processing cost model, and autoscaling

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of workers started with the engine (default: 1)
    #[serde(default = "default_initial_workers")]
    pub initial_workers: usize,

    /// Per-worker processing parameters
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Autoscaler parameters
    #[serde(default)]
    pub autoscaler: AutoscalerConfig,
}

/// Per-worker processing parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Pending requests that count as 100% load (default: 50)
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Fixed base processing time in milliseconds (default: 50)
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Upper bound (exclusive) of the uniform processing jitter in
    /// milliseconds; 0 disables jitter (default: 200)
    #[serde(default = "default_max_jitter")]
    pub max_jitter_ms: u64,
}

/// Autoscaler parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoscalerConfig {
    /// Whether autoscaling starts enabled (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Average pending-per-worker above which a sample counts as high load
    /// (default: 5)
    #[serde(default = "default_high_threshold")]
    pub high_pending_threshold: usize,

    /// Average pending-per-worker below which a sample counts as low load
    /// (default: 1)
    #[serde(default = "default_low_threshold")]
    pub low_pending_threshold: usize,

    /// Milliseconds between load samples (default: 2000)
    #[serde(default = "default_check_interval")]
    pub check_interval_ms: u64,

    /// Upper bound on pool size (default: 10)
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Consecutive high samples required to scale up (default: 2)
    #[serde(default = "default_scale_up_streak")]
    pub scale_up_streak: u32,

    /// Consecutive low samples required to scale down (default: 3)
    #[serde(default = "default_scale_down_streak")]
    pub scale_down_streak: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_workers: default_initial_workers(),
            worker: WorkerConfig::default(),
            autoscaler: AutoscalerConfig::default(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            base_delay_ms: default_base_delay(),
            max_jitter_ms: default_max_jitter(),
        }
    }
}

impl Default for AutoscalerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            high_pending_threshold: default_high_threshold(),
            low_pending_threshold: default_low_threshold(),
            check_interval_ms: default_check_interval(),
            max_workers: default_max_workers(),
            scale_up_streak: default_scale_up_streak(),
            scale_down_streak: default_scale_down_streak(),
        }
    }
}

fn default_initial_workers() -> usize {
    1
}

fn default_capacity() -> u32 {
    50
}

fn default_base_delay() -> u64 {
    50
}

fn default_max_jitter() -> u64 {
    200
}

fn default_high_threshold() -> usize {
    5
}

fn default_low_threshold() -> usize {
    1
}

fn default_check_interval() -> u64 {
    2000
}

fn default_max_workers() -> usize {
    10
}

fn default_scale_up_streak() -> u32 {
    2
}

fn default_scale_down_streak() -> u32 {
    3
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub async fn from_file(path: &str) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| EngineError::Config(format!("failed to parse '{}': {}", path, e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.initial_workers == 0 {
            return Err(EngineError::Config(
                "initial_workers must be at least 1".to_string(),
            ));
        }
        if self.worker.capacity == 0 {
            return Err(EngineError::Config(
                "worker.capacity must be greater than 0".to_string(),
            ));
        }
        let auto = &self.autoscaler;
        if auto.max_workers == 0 {
            return Err(EngineError::Config(
                "autoscaler.max_workers must be at least 1".to_string(),
            ));
        }
        if self.initial_workers > auto.max_workers {
            return Err(EngineError::Config(format!(
                "initial_workers ({}) must be <= autoscaler.max_workers ({})",
                self.initial_workers, auto.max_workers
            )));
        }
        if auto.low_pending_threshold > auto.high_pending_threshold {
            return Err(EngineError::Config(format!(
                "autoscaler.low_pending_threshold ({}) must be <= high_pending_threshold ({})",
                auto.low_pending_threshold, auto.high_pending_threshold
            )));
        }
        if auto.check_interval_ms == 0 {
            return Err(EngineError::Config(
                "autoscaler.check_interval_ms must be greater than 0".to_string(),
            ));
        }
        if auto.scale_up_streak == 0 || auto.scale_down_streak == 0 {
            return Err(EngineError::Config(
                "autoscaler streak lengths must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
