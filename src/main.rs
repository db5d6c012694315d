//! Tiered balancer simulator.
//!
//! Loads a balancer configuration, builds the pools and the aggregate
//! balancer, and drives simulated requests through it.
//!
//! ```text
//! config.toml ──▶ TopologyFeed ──▶ PoolRegistry ──▶ AggregateBalancer
//!      │                                                  │
//!      └── ConfigWatcher (--watch) ──▶ feed task          ▼
//!                                                   simulate() ──▶ JSON summary
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use tiered_balancer::config::{load_config, ConfigWatcher};
use tiered_balancer::lifecycle::signals::shutdown_on_ctrl_c;
use tiered_balancer::observability::{logging, metrics};
use tiered_balancer::priority::{RandomSource, SeededRandom, ThreadRandom};
use tiered_balancer::simulation::simulate;
use tiered_balancer::{AggregateBalancer, PoolRegistry, RetryPolicy, Shutdown, TopologyFeed};

#[derive(Parser)]
#[command(name = "tiered-balancer")]
#[command(about = "Simulate priority-tiered load balancing across pools", long_about = None)]
struct Cli {
    /// Balancer configuration file (TOML).
    #[arg(short, long, default_value = "balancer.toml")]
    config: PathBuf,

    /// Logical requests per simulation round.
    #[arg(short = 'n', long, default_value_t = 1000)]
    requests: u64,

    /// Probability that a single attempt fails.
    #[arg(long, default_value_t = 0.1)]
    failure_rate: f64,

    /// Seed for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    /// Keep running, reloading the topology when the config file changes.
    #[arg(long)]
    watch: bool,

    /// Seconds between simulation rounds in watch mode.
    #[arg(long, default_value_t = 5)]
    interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    if let Err(e) = logging::init(&config.observability.log_level) {
        eprintln!("logging already initialised: {e}");
    }
    tracing::info!(config = ?cli.config, pools = config.pools.len(), "tiered-balancer starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = Arc::new(PoolRegistry::new());
    let feed = TopologyFeed::new(registry.clone());
    feed.apply(&config)?;

    let (selection, outcomes): (Arc<dyn RandomSource>, Arc<dyn RandomSource>) = match cli.seed {
        Some(seed) => (
            Arc::new(SeededRandom::new(seed)),
            Arc::new(SeededRandom::new(seed.wrapping_add(1))),
        ),
        None => (Arc::new(ThreadRandom), Arc::new(ThreadRandom)),
    };
    let balancer = AggregateBalancer::new(&config.aggregate, registry, selection);
    let policy = RetryPolicy::new(&config.retry);

    let summary = simulate(&balancer, &policy, outcomes.as_ref(), cli.requests, cli.failure_rate);
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if !cli.watch {
        balancer.detach();
        return Ok(());
    }

    let shutdown = Shutdown::new();
    let (watcher, updates) = ConfigWatcher::new(&cli.config);
    let _watcher = watcher.run()?;
    let feed_task = tokio::spawn(feed.run(updates, shutdown.subscribe()));
    tokio::spawn(shutdown_on_ctrl_c(shutdown.clone()));

    let mut stop = shutdown.subscribe();
    let mut ticker = tokio::time::interval(Duration::from_secs(cli.interval_secs.max(1)));
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let summary = simulate(&balancer, &policy, outcomes.as_ref(), cli.requests, cli.failure_rate);
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            _ = stop.recv() => break,
        }
    }

    balancer.detach();
    if let Err(e) = feed_task.await {
        tracing::error!(error = %e, "Topology feed task failed");
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
