//! Backend pool.
//!
//! # Responsibilities
//! - Hold a named, ordered list of tiers
//! - Own the pool-local balancer used for every tier of the pool
//! - Build itself from configuration

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::PoolConfig;
use crate::load_balancer::{self, LoadBalancer, PoolContext};
use crate::topology::error::{TopologyError, TopologyResult};
use crate::topology::host::Host;
use crate::topology::tier::Tier;

/// A named collection of tiers.
///
/// Pools are immutable snapshots; membership changes produce a new `Pool`
/// that replaces the old one in the registry. Host health is the only
/// state mutated in place.
#[derive(Debug)]
pub struct Pool {
    name: String,
    tiers: Vec<Tier>,
    balancer: Arc<dyn LoadBalancer>,
}

impl Pool {
    pub fn new(name: impl Into<String>, tiers: Vec<Tier>, balancer: Arc<dyn LoadBalancer>) -> Self {
        Self {
            name: name.into(),
            tiers,
            balancer,
        }
    }

    /// Build a pool from configuration.
    pub fn from_config(config: &PoolConfig) -> TopologyResult<Self> {
        let mut tiers = Vec::with_capacity(config.tiers.len());

        for (index, tier) in config.tiers.iter().enumerate() {
            let index = index as u32;
            let mut hosts = Vec::with_capacity(tier.hosts.len());
            for host in &tier.hosts {
                let addr: SocketAddr = host.address.parse().map_err(|_| TopologyError::InvalidAddress {
                    host: host.name.clone(),
                    address: host.address.clone(),
                })?;
                hosts.push(Arc::new(
                    Host::new(host.name.clone(), addr, config.name.clone(), index)
                        .with_health(host.health)
                        .with_weight(host.weight)
                        .with_canary(host.canary)
                        .with_metadata(host.metadata.clone()),
                ));
            }
            tiers.push(Tier::new(index, hosts).with_overprovisioning_factor(config.overprovisioning_factor));
        }

        Ok(Self::new(config.name.clone(), tiers, load_balancer::for_policy(config.lb_policy)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tiers(&self) -> &[Tier] {
        &self.tiers
    }

    pub fn tier(&self, index: u32) -> Option<&Tier> {
        self.tiers.get(index as usize)
    }

    pub fn balancer(&self) -> &Arc<dyn LoadBalancer> {
        &self.balancer
    }

    /// Delegate host choice inside one of this pool's tiers.
    pub fn choose_host(&self, tier: u32, ctx: &PoolContext<'_>) -> Option<Arc<Host>> {
        let Some(tier) = self.tier(tier) else {
            tracing::debug!(pool = %self.name, tier, "Tier not found in pool");
            return None;
        };
        self.balancer.choose_host(tier, ctx)
    }

    pub fn find_host(&self, name: &str) -> Option<&Arc<Host>> {
        self.tiers.iter().find_map(|t| t.find(name))
    }

    /// Every host of the pool, tier by tier.
    pub fn all_hosts(&self) -> Vec<Arc<Host>> {
        self.tiers.iter().flat_map(|t| t.hosts().iter()).cloned().collect()
    }
}
