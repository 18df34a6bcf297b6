//! # loadsim
//!
//! A simulated software load balancer: synthetic requests flow through a
//! shared inbound queue into a dynamically sized pool of workers, each
//! processing at a size-dependent cost, while an autoscaling control loop
//! resizes the pool under hysteresis.
//!
//! ## Architecture
//!
//! ```text
//! Traffic Source → Inbound Queue → Dispatcher → Policy → Worker Queue → Worker Loop
//!                                       ▲                                   │
//!                                       └──────── Autoscaler ◄── counters ──┘
//! ```
//!
//! ## Core Features
//!
//! - **Routing Policies**: round-robin, least-connections, IP-hash
//! - **Worker Accounting**: queued / in-flight / processed counters, load percent
//! - **Autoscaling**: hysteresis over sampled average pending load
//! - **Control Surface**: add/remove worker, change policy, toggle autoscaling
//! - **Metrics**: point-in-time snapshots for display
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use loadsim::{config::EngineConfig, Engine, Request};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> loadsim::Result<()> {
//!     let engine = Arc::new(Engine::new(EngineConfig::default())?);
//!     engine.start();
//!     engine.submit_request(Request::new("10.0.0.1", 42));
//!     engine.wait_for_shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub(crate) mod dispatch;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod pool;
pub mod request;
pub(crate) mod scaling;
pub mod traffic;

// Re-export main types
pub use engine::{Engine, Submission};
pub use error::{EngineError, Result};
pub use metrics::{EngineSnapshot, WorkerSnapshot};
pub use policy::Policy;
pub use request::Request;
pub use traffic::TrafficGenerator;

use serde::{Deserialize, Serialize};

/// Engine runtime state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[derive(Default)]
pub enum EngineState {
    /// Engine has been created but not yet started
    #[default]
    Created,
    /// Engine is dispatching requests
    Running,
    /// Engine is stopping its loops and draining workers
    Stopping,
    /// Engine has fully stopped
    Stopped,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_state_default() {
        assert_eq!(EngineState::default(), EngineState::Created);
    }

    #[test]
    fn test_engine_state_display() {
        assert_eq!(EngineState::Created.to_string(), "created");
        assert_eq!(EngineState::Running.to_string(), "running");
        assert_eq!(EngineState::Stopping.to_string(), "stopping");
        assert_eq!(EngineState::Stopped.to_string(), "stopped");
    }

    #[test]
    fn test_engine_state_serialization() {
        let state = EngineState::Running;
        let json = serde_json::to_string(&state).unwrap();
        let parsed: EngineState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, EngineState::Running);
    }
}
