//! Centralized error types for the load balancer engine

use thiserror::Error;

/// Engine error types
#[derive(Debug, Error)]
pub enum EngineError {
    /// Request rejected at the ingestion boundary
    #[error("malformed request: empty client key or zero size")]
    MalformedRequest,

    /// Submitting to a worker that has been stopped
    #[error("worker {worker} no longer accepts requests")]
    QueueClosed {
        /// Id of the stopped worker
        worker: u32,
    },

    /// No workers available to route to
    #[error("no workers available")]
    EmptyRegistry,

    /// Attempt to remove the last remaining worker
    #[error("at least one worker required")]
    MinimumPool,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, EngineError>;
