//! Pool registry with membership-change notifications.
//!
//! # Responsibilities
//! - Own the current `Arc<Pool>` for every known pool name
//! - Notify subscribers when pools are added, updated or removed
//! - Route health changes to hosts and publish them as updates
//!
//! # Design Decisions
//! - Removal is announced *before* the pool leaves the map, so subscribers
//!   must skip the named pool explicitly
//! - No map guard is held while subscribers run; they may read the registry
//! - Subscribers must not subscribe from inside a callback; unsubscribing
//!   there is deferred until the notification round ends

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, TryLockError};

use dashmap::DashMap;

use crate::topology::error::{TopologyError, TopologyResult};
use crate::topology::host::HealthState;
use crate::topology::pool::Pool;

/// A change in pool membership.
#[derive(Debug, Clone)]
pub enum TopologyEvent {
    PoolAdded(Arc<Pool>),
    PoolUpdated(Arc<Pool>),
    PoolRemoved(String),
}

impl TopologyEvent {
    pub fn pool_name(&self) -> &str {
        match self {
            TopologyEvent::PoolAdded(pool) | TopologyEvent::PoolUpdated(pool) => pool.name(),
            TopologyEvent::PoolRemoved(name) => name,
        }
    }
}

/// Handle returned by [`PoolRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn Fn(&TopologyEvent) + Send + Sync>;

/// Shared registry of all pools.
#[derive(Default)]
pub struct PoolRegistry {
    pools: DashMap<String, Arc<Pool>>,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber)>>,
    deferred_unsubscribes: Mutex<Vec<SubscriptionId>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.pool_names())
            .finish_non_exhaustive()
    }
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Pool>> {
        self.pools.get(name).map(|r| r.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pools.contains_key(name)
    }

    pub fn pool_names(&self) -> Vec<String> {
        self.pools.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Register a callback for every subsequent topology event.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&TopologyEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        self.apply_deferred(&mut subscribers);
        subscribers.push((id, Box::new(callback)));
        id
    }

    /// Drop a subscription.
    ///
    /// Safe to call from inside a callback: while a notification round holds
    /// the subscriber list the removal is queued and applied afterwards.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        match self.subscribers.try_write() {
            Ok(mut subscribers) => subscribers.retain(|(sid, _)| *sid != id),
            Err(TryLockError::Poisoned(e)) => e.into_inner().retain(|(sid, _)| *sid != id),
            Err(TryLockError::WouldBlock) => {
                tracing::debug!(?id, "Subscriber list busy, deferring unsubscribe");
                self.deferred_unsubscribes
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(id);
            }
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        self.apply_deferred(&mut subscribers);
        subscribers.len()
    }

    fn apply_deferred(&self, subscribers: &mut Vec<(SubscriptionId, Subscriber)>) {
        let deferred = std::mem::take(&mut *self.deferred_unsubscribes.lock().unwrap_or_else(|e| e.into_inner()));
        if !deferred.is_empty() {
            subscribers.retain(|(sid, _)| !deferred.contains(sid));
        }
    }

    /// Insert or replace a pool, announcing it to subscribers.
    pub fn upsert(&self, pool: Pool) -> Arc<Pool> {
        let pool = Arc::new(pool);
        let previous = self.pools.insert(pool.name().to_string(), pool.clone());

        let event = if previous.is_some() {
            tracing::debug!(pool = %pool.name(), "Pool updated");
            TopologyEvent::PoolUpdated(pool.clone())
        } else {
            tracing::info!(pool = %pool.name(), tiers = pool.tiers().len(), "Pool added");
            TopologyEvent::PoolAdded(pool.clone())
        };
        self.notify(&event);
        pool
    }

    /// Remove a pool. Subscribers are told before the pool disappears.
    pub fn remove(&self, name: &str) -> Option<Arc<Pool>> {
        if !self.contains(name) {
            return None;
        }
        tracing::info!(pool = %name, "Pool removed");
        self.notify(&TopologyEvent::PoolRemoved(name.to_string()));
        self.pools.remove(name).map(|(_, pool)| pool)
    }

    /// Apply a health classification pushed by an external checker.
    ///
    /// Returns whether the host's classification changed; a change is
    /// published as `PoolUpdated`.
    pub fn set_host_health(&self, pool: &str, host: &str, health: HealthState) -> TopologyResult<bool> {
        let entry = self.get(pool).ok_or_else(|| TopologyError::PoolNotFound(pool.to_string()))?;
        let target = entry.find_host(host).ok_or_else(|| TopologyError::HostNotFound {
            pool: pool.to_string(),
            host: host.to_string(),
        })?;

        let changed = target.set_health(health);
        if changed {
            tracing::info!(pool = %pool, host = %host, health = ?health, "Host health changed");
            self.notify(&TopologyEvent::PoolUpdated(entry.clone()));
        }
        Ok(changed)
    }

    fn notify(&self, event: &TopologyEvent) {
        {
            let subscribers = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            for (_, callback) in subscribers.iter() {
                callback(event);
            }
        }
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        self.apply_deferred(&mut subscribers);
    }
}
