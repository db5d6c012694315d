//! Host abstraction.
//!
//! # Responsibilities
//! - Represent a single addressable endpoint inside one pool/tier
//! - Track in-flight requests (for the least-request balancer)
//! - Carry the health classification pushed by the external health checker

use std::collections::HashMap;
use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Health classification of a host.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    #[default]
    Healthy = 0,
    Degraded = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Degraded,
            2 => HealthState::Unhealthy,
            _ => HealthState::Healthy,
        }
    }
}

/// A single backend host.
///
/// Equality between hosts (e.g. "is this the preferred host?") is decided by
/// `name` alone.
#[derive(Debug)]
pub struct Host {
    /// Stable identity of the host.
    pub name: String,
    /// Address the surrounding proxy connects to.
    pub addr: SocketAddr,
    /// Name of the owning pool.
    pub pool: String,
    /// Tier index inside the owning pool.
    pub tier: u32,
    /// Round-robin share; a weight of 0 removes the host from rotation.
    pub weight: u32,
    /// Canary hosts can be omitted on retries.
    pub canary: bool,
    /// Free-form labels (e.g. `host = "..."` used by metadata predicates).
    pub metadata: HashMap<String, String>,

    state: AtomicU8,
    active_requests: AtomicUsize,
}

impl Host {
    /// Create a new healthy host.
    pub fn new(name: impl Into<String>, addr: SocketAddr, pool: impl Into<String>, tier: u32) -> Self {
        Self {
            name: name.into(),
            addr,
            pool: pool.into(),
            tier,
            weight: 1,
            canary: false,
            metadata: HashMap::new(),
            state: AtomicU8::new(HealthState::Healthy as u8),
            active_requests: AtomicUsize::new(0),
        }
    }

    pub fn with_health(self, health: HealthState) -> Self {
        self.state.store(health as u8, Ordering::Relaxed);
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_canary(mut self, canary: bool) -> Self {
        self.canary = canary;
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Current health classification.
    pub fn health(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Relaxed))
    }

    /// Overwrite the health classification.
    ///
    /// Returns true if the classification changed.
    pub fn set_health(&self, health: HealthState) -> bool {
        self.state.swap(health as u8, Ordering::Relaxed) != health as u8
    }

    pub fn is_healthy(&self) -> bool {
        self.health() == HealthState::Healthy
    }

    pub fn is_degraded(&self) -> bool {
        self.health() == HealthState::Degraded
    }

    /// Same identity as `other`.
    pub fn same_host(&self, other: &Host) -> bool {
        self.name == other.name
    }

    /// Number of requests currently in flight to this host.
    pub fn active_requests(&self) -> usize {
        self.active_requests.load(Ordering::Relaxed)
    }

    /// Count a request as in flight until the returned guard is dropped.
    pub fn track_request(self: &Arc<Self>) -> ActiveRequestGuard {
        self.active_requests.fetch_add(1, Ordering::Relaxed);
        ActiveRequestGuard { host: self.clone() }
    }
}

/// A RAII guard that manages the in-flight request count.
#[derive(Debug)]
pub struct ActiveRequestGuard {
    host: Arc<Host>,
}

impl Deref for ActiveRequestGuard {
    type Target = Host;
    fn deref(&self) -> &Self::Target {
        &self.host
    }
}

impl Drop for ActiveRequestGuard {
    fn drop(&mut self) {
        self.host.active_requests.fetch_sub(1, Ordering::Relaxed);
    }
}
