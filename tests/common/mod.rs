//! Shared builders for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tiered_balancer::config::{AggregateConfig, HostPredicateKind, RetryConfig};
use tiered_balancer::load_balancer::RoundRobin;
use tiered_balancer::priority::RandomSource;
use tiered_balancer::topology::Tier;
use tiered_balancer::{AggregateBalancer, Host, Pool, PoolRegistry, RetryPolicy};

pub fn host(name: &str, pool: &str, tier: u32) -> Arc<Host> {
    Arc::new(Host::new(name, "127.0.0.1:8080".parse().unwrap(), pool, tier))
}

/// Pool whose tier `i` holds the hosts named in `tiers[i]`.
pub fn pool(name: &str, tiers: &[&[&str]]) -> Pool {
    let tiers = tiers
        .iter()
        .enumerate()
        .map(|(index, names)| {
            let hosts = names.iter().map(|n| host(n, name, index as u32)).collect();
            Tier::new(index as u32, hosts)
        })
        .collect();
    Pool::new(name, tiers, Arc::new(RoundRobin::new()))
}

pub fn registry_with(pools: Vec<Pool>) -> Arc<PoolRegistry> {
    let registry = Arc::new(PoolRegistry::new());
    for pool in pools {
        registry.upsert(pool);
    }
    registry
}

pub fn aggregate<R>(registry: &Arc<PoolRegistry>, members: &[&str], random: R) -> Arc<AggregateBalancer>
where
    R: RandomSource + 'static,
{
    let config = AggregateConfig {
        pools: members.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    };
    AggregateBalancer::new(&config, registry.clone(), Arc::new(random))
}

pub fn policy(budgets: &[u32]) -> RetryPolicy {
    policy_with_predicates(budgets, Vec::new())
}

pub fn policy_with_predicates(budgets: &[u32], host_predicates: Vec<HostPredicateKind>) -> RetryPolicy {
    RetryPolicy::new(&RetryConfig {
        update_frequency: budgets.to_vec(),
        host_predicates,
        ..Default::default()
    })
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
