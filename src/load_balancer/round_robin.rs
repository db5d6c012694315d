//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{candidates, LoadBalancer, PoolContext};
use crate::topology::{Host, Tier};

/// Weighted round-robin selector.
/// Stores an internal counter to rotate through hosts; a host of weight `w`
/// takes `w` consecutive turns per cycle. Weight 0 hosts are only used when
/// every candidate has weight 0.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn choose_host(&self, tier: &Tier, ctx: &PoolContext<'_>) -> Option<Arc<Host>> {
        let hosts = candidates(tier, ctx.class);
        if hosts.is_empty() {
            return None;
        }

        let total_weight: u64 = hosts.iter().map(|h| u64::from(h.weight)).sum();

        let mut chosen = None;
        for _ in 0..ctx.max_attempts {
            let tick = self.counter.fetch_add(1, Ordering::Relaxed);
            let host = if total_weight == 0 {
                &hosts[tick % hosts.len()]
            } else {
                weighted_pick(&hosts, tick as u64 % total_weight)
            };
            if !ctx.should_skip(host) {
                return Some(host.clone());
            }
            tracing::debug!(host = %host.name, tier = tier.index(), "Round robin reselecting, host rejected by predicate");
            chosen = Some(host.clone());
        }
        chosen
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

/// Host owning position `slot` of the cumulative weight range.
fn weighted_pick(hosts: &[Arc<Host>], mut slot: u64) -> &Arc<Host> {
    for host in hosts {
        let weight = u64::from(host.weight);
        if slot < weight {
            return host;
        }
        slot -= weight;
    }
    &hosts[hosts.len() - 1]
}
