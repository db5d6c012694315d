//! Topology feed.
//!
//! # Responsibilities
//! - Receive whole configurations (e.g. from the config watcher)
//! - Diff their pools into registry upserts and removals
//! - Stop on shutdown

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use crate::config::BalancerConfig;
use crate::topology::error::TopologyResult;
use crate::topology::pool::Pool;
use crate::topology::registry::PoolRegistry;

/// Pushes configuration changes into a [`PoolRegistry`].
#[derive(Debug, Clone)]
pub struct TopologyFeed {
    registry: Arc<PoolRegistry>,
}

impl TopologyFeed {
    pub fn new(registry: Arc<PoolRegistry>) -> Self {
        Self { registry }
    }

    /// Bring the registry in line with `config.pools`.
    ///
    /// Every configured pool is rebuilt and upserted; registered pools that
    /// are no longer configured are removed. A pool that fails to build is
    /// left untouched and reported.
    pub fn apply(&self, config: &BalancerConfig) -> TopologyResult<()> {
        let mut first_error = None;
        let wanted: HashSet<&str> = config.pools.iter().map(|p| p.name.as_str()).collect();

        for name in self.registry.pool_names() {
            if !wanted.contains(name.as_str()) {
                self.registry.remove(&name);
            }
        }

        for pool_config in &config.pools {
            match Pool::from_config(pool_config) {
                Ok(pool) => {
                    self.registry.upsert(pool);
                }
                Err(e) => {
                    tracing::error!(pool = %pool_config.name, error = %e, "Failed to build pool");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Apply updates until the channel closes or shutdown is signalled.
    pub async fn run(
        self,
        mut updates: mpsc::UnboundedReceiver<BalancerConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        tracing::info!("Topology feed starting");

        loop {
            tokio::select! {
                update = updates.recv() => {
                    let Some(config) = update else {
                        tracing::info!("Topology feed channel closed, exiting loop");
                        break;
                    };
                    if let Err(e) = self.apply(&config) {
                        tracing::warn!(error = %e, "Topology update applied partially");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Topology feed received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
