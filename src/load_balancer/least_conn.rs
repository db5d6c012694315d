//! Least-request load balancing strategy.

use std::sync::Arc;

use crate::load_balancer::{candidates, LoadBalancer, PoolContext};
use crate::topology::{Host, Tier};

/// Least request selector.
/// Selects the host with the fewest in-flight requests.
#[derive(Debug, Default)]
pub struct LeastRequest;

impl LeastRequest {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for LeastRequest {
    fn choose_host(&self, tier: &Tier, ctx: &PoolContext<'_>) -> Option<Arc<Host>> {
        let mut hosts = candidates(tier, ctx.class);
        let mut chosen = None;

        for _ in 0..ctx.max_attempts {
            // In case of tie, the first one is selected (stability)
            let Some((pos, host)) = hosts
                .iter()
                .enumerate()
                .min_by_key(|(_, h)| h.active_requests())
                .map(|(pos, h)| (pos, h.clone()))
            else {
                break;
            };

            if !ctx.should_skip(&host) {
                return Some(host);
            }
            hosts.remove(pos);
            chosen = Some(host);
        }
        chosen
    }

    fn name(&self) -> &'static str {
        "least_request"
    }
}
