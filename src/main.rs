use clap::Parser;
use loadsim::config::EngineConfig;
use loadsim::{Engine, Policy, TrafficGenerator};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// loadsim — simulated software load balancer
#[derive(Parser)]
#[command(name = "loadsim", version, about)]
struct Cli {
    /// Path to configuration file (.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the number of workers started with the engine
    #[arg(short, long)]
    workers: Option<usize>,

    /// Routing policy (round-robin, least-connections, ip-hash)
    #[arg(short, long, default_value = "round-robin")]
    policy: String,

    /// Start with autoscaling enabled
    #[arg(long)]
    autoscale: bool,

    /// Milliseconds between generated requests (1..=500)
    #[arg(long, default_value_t = 100)]
    request_interval_ms: u64,

    /// Seconds between status reports
    #[arg(long, default_value_t = 5)]
    status_interval_secs: u64,

    /// Stop after this many seconds (0 = run until Ctrl+C)
    #[arg(long, default_value_t = 0)]
    duration_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> loadsim::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    tracing::info!("loadsim v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!(config = path, "Loading configuration");
            EngineConfig::from_file(path).await?
        }
        None => EngineConfig::default(),
    };
    if let Some(workers) = cli.workers {
        config.initial_workers = workers;
    }
    if cli.autoscale {
        config.autoscaler.enabled = true;
    }
    config.validate()?;

    let policy: Policy = cli
        .policy
        .parse()
        .map_err(loadsim::EngineError::Config)?;

    // Create and start the engine
    let engine = Arc::new(Engine::new(config)?);
    engine.start();
    engine.set_policy(policy);

    // Drive it with synthetic traffic
    let generator = TrafficGenerator::new(engine.clone(), cli.request_interval_ms);
    tokio::spawn(generator.run(engine.shutdown_signal()));

    // Periodic status report in place of a graphical health table
    tokio::spawn(status_loop(
        engine.clone(),
        cli.status_interval_secs,
        engine.shutdown_signal(),
    ));

    tracing::info!("Engine ready — press Ctrl+C to stop");

    if cli.duration_secs > 0 {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(cli.duration_secs)) => {}
            _ = tokio::signal::ctrl_c() => {}
        }
        engine.shutdown().await;
    } else {
        engine.wait_for_shutdown().await;
    }

    Ok(())
}

/// Log a metrics snapshot every `interval_secs`: one aggregate line plus
/// one line per worker
async fn status_loop(engine: Arc<Engine>, interval_secs: u64, mut shutdown: watch::Receiver<bool>) {
    let interval = Duration::from_secs(interval_secs.max(1));
    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(interval) => {
                let snapshot = engine.snapshot_metrics();
                tracing::info!(
                    policy = %snapshot.policy,
                    workers = snapshot.worker_count,
                    served = snapshot.total_requests_served,
                    dropped = snapshot.requests_dropped,
                    autoscaling = snapshot.auto_scaling_enabled,
                    "status"
                );
                for worker in &snapshot.workers {
                    tracing::info!(
                        worker = worker.worker_id,
                        queued = worker.queued,
                        in_flight = worker.in_flight,
                        processed = worker.total_processed,
                        load = format!("{:.0}%", worker.load_percent),
                        "worker health"
                    );
                }
            }
        }
    }
}
