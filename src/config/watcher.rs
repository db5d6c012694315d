//! Hot reload of the pool topology from the config file.
//!
//! Only pool membership is picked up on reload; attempt budgets and the
//! recursion limit keep the values loaded at startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::BalancerConfig;

/// Watches the balancer config file and forwards every valid revision.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<BalancerConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end consumed by the topology feed.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<BalancerConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    reload(&path, &tx);
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Load `path` and forward it; returns whether a revision was sent.
///
/// An invalid revision is logged and dropped, so the registry keeps its
/// current pools.
fn reload(path: &Path, tx: &mpsc::UnboundedSender<BalancerConfig>) -> bool {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(ConfigError::Validation(errors)) => {
            for error in &errors {
                tracing::error!(path = ?path, %error, "Rejected config revision");
            }
            return false;
        }
        Err(e) => {
            tracing::error!(path = ?path, error = %e, "Failed to reload config, keeping current topology");
            return false;
        }
    };

    let tiers: usize = config.pools.iter().map(|p| p.tiers.len()).sum();
    tracing::info!(
        path = ?path,
        pools = config.pools.len(),
        tiers,
        members = ?config.aggregate.pools,
        "Config reloaded"
    );
    tx.send(config).is_ok()
}
