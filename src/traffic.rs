//! Synthetic traffic source — drives the engine with random requests
//!
//! Produces one request per interval with a random dotted-quad client IP
//! and a size uniform in 1..=100. The interval is adjustable at runtime
//! through an atomic knob, clamped to 1..=500 ms.

use crate::engine::{Engine, Submission};
use crate::request::Request;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Lowest allowed send interval in milliseconds
pub const MIN_INTERVAL_MS: u64 = 1;
/// Highest allowed send interval in milliseconds
pub const MAX_INTERVAL_MS: u64 = 500;

/// Periodic request producer feeding an engine
pub struct TrafficGenerator {
    engine: Arc<Engine>,
    interval_ms: Arc<AtomicU64>,
}

impl TrafficGenerator {
    /// Create a generator sending one request every `interval_ms`
    pub fn new(engine: Arc<Engine>, interval_ms: u64) -> Self {
        Self {
            engine,
            interval_ms: Arc::new(AtomicU64::new(clamp_interval(interval_ms))),
        }
    }

    /// Change the send interval; takes effect on the next tick
    pub fn set_interval_ms(&self, interval_ms: u64) {
        self.interval_ms
            .store(clamp_interval(interval_ms), Ordering::Relaxed);
    }

    /// Current send interval in milliseconds
    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.load(Ordering::Relaxed)
    }

    /// Shared handle to the interval knob, for control surfaces
    pub fn interval_handle(&self) -> Arc<AtomicU64> {
        self.interval_ms.clone()
    }

    /// Produce requests until the shutdown signal fires
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval_ms = self.interval_ms(), "traffic generator started");
        loop {
            let delay = Duration::from_millis(clamp_interval(
                self.interval_ms.load(Ordering::Relaxed),
            ));
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(delay) => {
                    let request = random_request();
                    if self.engine.submit_request(request) == Submission::Rejected {
                        tracing::debug!("request rejected");
                    }
                }
            }
        }
        tracing::debug!("traffic generator stopped");
    }
}

fn clamp_interval(interval_ms: u64) -> u64 {
    interval_ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
}

/// A request with a random dotted-quad client IP and size in 1..=100
pub fn random_request() -> Request {
    let mut rng = rand::rng();
    let client_ip = format!(
        "{}.{}.{}.{}",
        rng.random_range(0..256),
        rng.random_range(0..256),
        rng.random_range(0..256),
        rng.random_range(0..256)
    );
    Request::new(client_ip, rng.random_range(1..=100))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AutoscalerConfig, EngineConfig, WorkerConfig};

    #[test]
    fn test_random_request_is_well_formed() {
        for _ in 0..200 {
            let request = random_request();
            assert!(request.validate().is_ok());
            assert!((1..=100).contains(&request.size));
            assert_eq!(request.client_ip.split('.').count(), 4);
            for octet in request.client_ip.split('.') {
                let value: u32 = octet.parse().unwrap();
                assert!(value < 256);
            }
        }
    }

    #[tokio::test]
    async fn test_interval_clamped() {
        let engine = Arc::new(
            Engine::new(EngineConfig::default()).unwrap(),
        );
        let generator = TrafficGenerator::new(engine, 0);
        assert_eq!(generator.interval_ms(), MIN_INTERVAL_MS);

        generator.set_interval_ms(10_000);
        assert_eq!(generator.interval_ms(), MAX_INTERVAL_MS);

        generator.set_interval_ms(250);
        assert_eq!(generator.interval_ms(), 250);
    }

    #[tokio::test]
    async fn test_run_feeds_engine_until_shutdown() {
        let config = EngineConfig {
            initial_workers: 1,
            worker: WorkerConfig {
                capacity: 50,
                base_delay_ms: 1,
                max_jitter_ms: 0,
            },
            autoscaler: AutoscalerConfig::default(),
        };
        let engine = Arc::new(Engine::new(config).unwrap());
        engine.start();

        let generator = TrafficGenerator::new(engine.clone(), 1);
        let handle = tokio::spawn(generator.run(engine.shutdown_signal()));

        tokio::time::sleep(Duration::from_millis(100)).await;
        engine.shutdown().await;
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("generator did not stop")
            .unwrap();

        assert!(engine.total_requests_served() > 0);
    }
}
