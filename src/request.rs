//! Synthetic request value — what the traffic source produces and workers consume

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// An immutable synthetic request.
///
/// `client_ip` identifies the originating client (used by the IP-hash
/// policy); `size` drives the simulated processing cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Client identifier (IP-like string)
    pub client_ip: String,
    /// Size magnitude, expected in 1..=100
    pub size: u32,
}

impl Request {
    /// Create a new request
    pub fn new(client_ip: impl Into<String>, size: u32) -> Self {
        Self {
            client_ip: client_ip.into(),
            size,
        }
    }

    /// Ingestion-boundary check: an empty client key or zero size is malformed
    pub fn validate(&self) -> Result<()> {
        if self.client_ip.is_empty() || self.size == 0 {
            return Err(EngineError::MalformedRequest);
        }
        Ok(())
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (size {})", self.client_ip, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_request() {
        let req = Request::new("192.168.0.1", 42);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_empty_client_key_is_malformed() {
        let req = Request::new("", 42);
        assert!(matches!(
            req.validate(),
            Err(EngineError::MalformedRequest)
        ));
    }

    #[test]
    fn test_zero_size_is_malformed() {
        let req = Request::new("10.0.0.1", 0);
        assert!(matches!(
            req.validate(),
            Err(EngineError::MalformedRequest)
        ));
    }

    #[test]
    fn test_display() {
        let req = Request::new("10.0.0.1", 7);
        assert_eq!(req.to_string(), "10.0.0.1 (size 7)");
    }

    #[test]
    fn test_serialization_roundtrip() {
        let req = Request::new("172.16.0.9", 99);
        let json = serde_json::to_string(&req).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, req);
    }
}
