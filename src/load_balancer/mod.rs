//! Pool-local load balancing.
//!
//! # Data Flow
//! ```text
//! Aggregate balancer picked (linear tier, health class)
//!     → owning pool's balancer
//!     → candidates(): hosts of the requested class in that tier
//!         (fallback: non-unhealthy hosts, then every host)
//!     → algorithm:
//!         - round_robin.rs (rotate through candidates)
//!         - least_conn.rs (fewest in-flight requests)
//!     → request skip predicate consulted, reselect while attempts remain
//!     → Return host or None
//! ```
//!
//! # Design Decisions
//! - Balancers are black boxes to the aggregate layer
//! - A balancer only ever sees one tier at a time
//! - Skip predicate is advisory: once attempts run out the last pick wins

use std::sync::Arc;

use crate::config::LbPolicy;
use crate::priority::HostAvailability;
use crate::topology::{HealthState, Host, Tier};

pub mod least_conn;
pub mod round_robin;

pub use least_conn::LeastRequest;
pub use round_robin::RoundRobin;

/// Per-call context handed from the aggregate layer to a pool balancer.
pub struct PoolContext<'a> {
    /// Health class selected by the tier selector.
    pub class: HostAvailability,
    /// Request-scoped "should select another host" predicate.
    pub skip: &'a dyn Fn(&Host) -> bool,
    /// Total picks allowed while the predicate keeps rejecting hosts.
    pub max_attempts: u32,
}

impl<'a> PoolContext<'a> {
    pub fn new(class: HostAvailability, skip: &'a dyn Fn(&Host) -> bool, max_attempts: u32) -> Self {
        Self {
            class,
            skip,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn should_skip(&self, host: &Host) -> bool {
        (self.skip)(host)
    }
}

/// Chooses a host inside a single tier.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    fn choose_host(&self, tier: &Tier, ctx: &PoolContext<'_>) -> Option<Arc<Host>>;

    fn name(&self) -> &'static str;
}

/// Build the balancer configured for a pool.
pub fn for_policy(policy: LbPolicy) -> Arc<dyn LoadBalancer> {
    match policy {
        LbPolicy::RoundRobin => Arc::new(RoundRobin::new()),
        LbPolicy::LeastRequest => Arc::new(LeastRequest::new()),
    }
}

/// Hosts of `tier` eligible for `class`.
pub(crate) fn candidates(tier: &Tier, class: HostAvailability) -> Vec<Arc<Host>> {
    let wanted = match class {
        HostAvailability::Healthy => HealthState::Healthy,
        HostAvailability::Degraded => HealthState::Degraded,
    };

    let matching: Vec<_> = tier.hosts().iter().filter(|h| h.health() == wanted).cloned().collect();
    if !matching.is_empty() {
        return matching;
    }

    let usable: Vec<_> = tier
        .hosts()
        .iter()
        .filter(|h| h.health() != HealthState::Unhealthy)
        .cloned()
        .collect();
    if !usable.is_empty() {
        return usable;
    }

    // Every host is unhealthy: spread load across all of them.
    tier.hosts().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str, health: HealthState) -> Arc<Host> {
        Arc::new(Host::new(name, "127.0.0.1:80".parse().unwrap(), "p", 0).with_health(health))
    }

    #[test]
    fn test_candidates_by_class() {
        let tier = Tier::new(
            0,
            vec![host("a", HealthState::Healthy), host("b", HealthState::Degraded)],
        );
        let healthy = candidates(&tier, HostAvailability::Healthy);
        assert_eq!(healthy.len(), 1);
        assert_eq!(healthy[0].name, "a");

        let degraded = candidates(&tier, HostAvailability::Degraded);
        assert_eq!(degraded[0].name, "b");
    }

    #[test]
    fn test_candidates_fallback() {
        let tier = Tier::new(
            0,
            vec![host("a", HealthState::Unhealthy), host("b", HealthState::Degraded)],
        );
        let healthy = candidates(&tier, HostAvailability::Healthy);
        assert_eq!(healthy.len(), 1);
        assert_eq!(healthy[0].name, "b");

        let tier = Tier::new(0, vec![host("a", HealthState::Unhealthy)]);
        assert_eq!(candidates(&tier, HostAvailability::Healthy).len(), 1);
    }
}
