//! Load-distribution policies and the pure selection function
//!
//! Selection is a pure decision over the current registry snapshot: no
//! policy mutates a worker. The only routing state is the round-robin
//! rotation cursor, owned by the dispatch loop.

use crate::pool::Worker;
use crate::request::Request;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Load-distribution policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Rotate through workers in registry order
    #[default]
    RoundRobin,
    /// Route to the worker with the fewest pending requests
    LeastConnections,
    /// Route by a stable hash of the client key
    IpHash,
}

impl std::str::FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "round-robin" => Ok(Self::RoundRobin),
            "least-connections" => Ok(Self::LeastConnections),
            "ip-hash" => Ok(Self::IpHash),
            other => Err(format!("unknown policy: {}", other)),
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RoundRobin => write!(f, "round-robin"),
            Self::LeastConnections => write!(f, "least-connections"),
            Self::IpHash => write!(f, "ip-hash"),
        }
    }
}

/// Pick a worker for `request` from `workers` under `policy`.
///
/// Returns `None` only when the slice is empty. The rotation cursor is
/// advanced on every round-robin call and wrapped modulo the *current*
/// registry size at use time; it is never renormalized when the pool is
/// resized. Least-connections ties break to the first worker in registry
/// order. IP-hash is deterministic for a fixed key and pool size, so a
/// resize may remap keys.
pub fn select<'a>(
    policy: Policy,
    workers: &'a [Arc<Worker>],
    cursor: &mut usize,
    request: &Request,
) -> Option<&'a Arc<Worker>> {
    if workers.is_empty() {
        return None;
    }
    match policy {
        Policy::RoundRobin => {
            let index = *cursor % workers.len();
            *cursor = cursor.wrapping_add(1);
            Some(&workers[index])
        }
        Policy::LeastConnections => workers.iter().min_by_key(|w| w.pending()),
        Policy::IpHash => {
            let index = (client_key_hash(&request.client_ip) % workers.len() as u64) as usize;
            Some(&workers[index])
        }
    }
}

/// Stable hash of a client key — the same key always hashes the same way
pub fn client_key_hash(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}
