//! Aggregate balancer over the linearized tiers of its member pools.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use arc_swap::ArcSwap;

use crate::aggregate::linearizer::{relinearize, LinearTable};
use crate::config::AggregateConfig;
use crate::load_balancer::PoolContext;
use crate::observability::metrics;
use crate::priority::{choose_tier, PriorityLoad, RandomSource};
use crate::retry::RequestContext;
use crate::topology::{Host, PoolRegistry, SubscriptionId, TopologyEvent};

/// Picks hosts across every member pool, honouring tier priority and the
/// retry state of the request.
///
/// The linear table is rebuilt on each membership change of a member pool
/// and swapped in atomically; selections in flight keep the snapshot they
/// loaded.
pub struct AggregateBalancer {
    name: String,
    members: Vec<String>,
    registry: Arc<PoolRegistry>,
    table: ArcSwap<LinearTable>,
    generation: AtomicU64,
    random: Arc<dyn RandomSource>,
    max_recursion_depth: u32,
    verbose_window: u32,
    refresh_lock: Mutex<()>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl std::fmt::Debug for AggregateBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateBalancer")
            .field("name", &self.name)
            .field("members", &self.members)
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .field("max_recursion_depth", &self.max_recursion_depth)
            .finish()
    }
}

impl Drop for AggregateBalancer {
    fn drop(&mut self) {
        self.detach();
    }
}

impl AggregateBalancer {
    /// Build the balancer, subscribe it to `registry` and linearize once.
    pub fn new(config: &AggregateConfig, registry: Arc<PoolRegistry>, random: Arc<dyn RandomSource>) -> Arc<Self> {
        let balancer = Arc::new(Self {
            name: config.name.clone(),
            members: config.pools.clone(),
            registry: registry.clone(),
            table: ArcSwap::from_pointee(LinearTable::default()),
            generation: AtomicU64::new(0),
            random,
            max_recursion_depth: config.max_recursion_depth,
            verbose_window: config.verbose_recursion_window,
            refresh_lock: Mutex::new(()),
            subscription: Mutex::new(None),
        });

        let weak: Weak<Self> = Arc::downgrade(&balancer);
        let id = registry.subscribe(move |event| {
            if let Some(balancer) = weak.upgrade() {
                balancer.on_topology_event(event);
            }
        });
        *balancer.subscription.lock().unwrap_or_else(|e| e.into_inner()) = Some(id);

        balancer.refresh(None);
        balancer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Current linear table snapshot.
    pub fn table(&self) -> Arc<LinearTable> {
        self.table.load_full()
    }

    /// Stop following registry events.
    pub fn detach(&self) {
        if let Some(id) = self.subscription.lock().unwrap_or_else(|e| e.into_inner()).take() {
            self.registry.unsubscribe(id);
            tracing::debug!(aggregate = %self.name, "Detached from pool registry");
        }
    }

    fn on_topology_event(&self, event: &TopologyEvent) {
        if !self.members.iter().any(|m| m == event.pool_name()) {
            return;
        }
        match event {
            TopologyEvent::PoolRemoved(name) => self.refresh(Some(name)),
            TopologyEvent::PoolAdded(_) | TopologyEvent::PoolUpdated(_) => self.refresh(None),
        }
    }

    /// Rebuild the linear table, leaving out `excluded` if given.
    pub fn refresh(&self, excluded: Option<&str>) {
        let _guard = self.refresh_lock.lock().unwrap_or_else(|e| e.into_inner());
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let table = relinearize(&self.members, &self.registry, excluded, generation);

        tracing::info!(
            aggregate = %self.name,
            generation,
            tiers = table.len(),
            excluded = ?excluded,
            "Relinearized tiers"
        );
        metrics::record_relinearize(&self.name, table.len());
        self.table.store(Arc::new(table));
    }

    /// Load the next selection would use.
    ///
    /// With a request context this advances its retry state; without one the
    /// table's default load is returned.
    pub fn priority_load(&self, ctx: Option<&mut RequestContext>) -> PriorityLoad {
        let table = self.table.load();
        match ctx {
            Some(ctx) => ctx.state_mut().determine_load(&table),
            None => table.default_load().clone(),
        }
    }

    /// Choose a host for the next attempt of a request.
    ///
    /// `None` means no backend is currently available.
    pub fn choose_host(&self, ctx: Option<&mut RequestContext>) -> Option<Arc<Host>> {
        let table = self.table.load_full();
        self.choose_host_at(&table, ctx, 0)
    }

    fn choose_host_at(&self, table: &LinearTable, mut ctx: Option<&mut RequestContext>, depth: u32) -> Option<Arc<Host>> {
        if depth >= self.max_recursion_depth {
            tracing::error!(
                aggregate = %self.name,
                depth,
                "Tier reselection hit the recursion limit, returning no host"
            );
            metrics::record_no_host(&self.name, "recursion_limit");
            return None;
        }
        if depth + self.verbose_window >= self.max_recursion_depth {
            tracing::warn!(
                aggregate = %self.name,
                depth,
                limit = self.max_recursion_depth,
                excluded = ?ctx.as_deref().map(|c| c.state().excluded_tiers()),
                preferred = ?ctx.as_deref().and_then(|c| c.state().preferred_host()),
                "Tier reselection approaching recursion limit"
            );
        }
        if table.is_empty() {
            metrics::record_no_host(&self.name, "no_tiers");
            return None;
        }

        let load = match ctx.as_deref_mut() {
            Some(ctx) => ctx.state_mut().determine_load(table),
            None => table.default_load().clone(),
        };

        if let Some(ctx) = ctx.as_deref_mut() {
            if ctx.state().all_excluded() {
                tracing::debug!(aggregate = %self.name, request_id = %ctx.id(), "All tiers excluded");
                ctx.state_mut().reset_exclusions();
                metrics::record_no_host(&self.name, "all_excluded");
                return None;
            }
        }

        let (tier, class) = choose_tier(self.random.next_u64(), &load);
        let Some(linear) = table.tier(tier) else {
            metrics::record_no_host(&self.name, "no_tiers");
            return None;
        };

        if tier > 0 && linear.tier().len() == 1 {
            if let Some(ctx) = ctx.as_deref_mut() {
                let only = &linear.tier().hosts()[0];
                let preferred = ctx.state().preferred_host() == Some(only.name.as_str());
                if preferred || ctx.should_select_another_host(only) {
                    tracing::debug!(
                        aggregate = %self.name,
                        tier,
                        host = %only.name,
                        preferred,
                        depth,
                        "Skipping single-host tier"
                    );
                    ctx.state_mut().exclude(tier, "skipped");
                    return self.choose_host_at(table, Some(ctx), depth + 1);
                }
            }
        }

        let host = {
            let reader = ctx.as_deref();
            let skip = |host: &Host| reader.is_some_and(|c| c.should_select_another_host(host));
            let attempts = reader.map_or(1, |c| c.host_selection_attempts());
            let pool_ctx = PoolContext::new(class, &skip, attempts);
            linear.pool().choose_host(linear.original_index(), &pool_ctx)
        };

        let Some(host) = host else {
            tracing::debug!(aggregate = %self.name, tier, pool = %linear.pool().name(), "Pool balancer returned no host");
            metrics::record_no_host(&self.name, "pool_empty");
            return None;
        };

        if tier == 0 {
            if let Some(ctx) = ctx {
                ctx.state_mut().set_preferred_host(host.name.clone());
            }
        }

        tracing::debug!(
            aggregate = %self.name,
            tier,
            class = class.as_str(),
            host = %host.name,
            depth,
            "Host selected"
        );
        metrics::record_tier_selected(&self.name, tier, class.as_str());
        metrics::record_recursion_depth(&self.name, depth);
        Some(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::load_balancer::RoundRobin;
    use crate::priority::FixedSequence;
    use crate::retry::RetryPolicy;
    use crate::topology::{HealthState, Pool, Tier};

    fn pool(name: &str, tiers: &[&[&str]]) -> Pool {
        let tiers = tiers
            .iter()
            .enumerate()
            .map(|(index, names)| {
                let hosts = names
                    .iter()
                    .map(|n| Arc::new(Host::new(*n, "127.0.0.1:80".parse().unwrap(), name, index as u32)))
                    .collect();
                Tier::new(index as u32, hosts)
            })
            .collect();
        Pool::new(name, tiers, Arc::new(RoundRobin::new()))
    }

    fn aggregate(registry: &Arc<PoolRegistry>, members: &[&str], draw: u64) -> Arc<AggregateBalancer> {
        let config = AggregateConfig {
            pools: members.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        AggregateBalancer::new(&config, registry.clone(), Arc::new(FixedSequence::constant(draw)))
    }

    #[test]
    fn test_choose_without_context_uses_default_load() {
        let registry = Arc::new(PoolRegistry::new());
        registry.upsert(pool("p", &[&["a"], &["b"]]));
        let lb = aggregate(&registry, &["p"], 99);

        assert_eq!(lb.choose_host(None).unwrap().name, "a");
        assert_eq!(lb.priority_load(None).healthy, vec![100, 0]);
    }

    #[test]
    fn test_tier_zero_pick_sets_preferred_host() {
        let registry = Arc::new(PoolRegistry::new());
        registry.upsert(pool("p", &[&["a"], &["b"]]));
        let lb = aggregate(&registry, &["p"], 0);
        let mut ctx = RetryPolicy::new(&RetryConfig::default()).new_request();

        let host = lb.choose_host(Some(&mut ctx)).unwrap();
        assert_eq!(host.name, "a");
        assert_eq!(ctx.state().preferred_host(), Some("a"));
    }

    #[test]
    fn test_relinearizes_on_member_events_only() {
        let registry = Arc::new(PoolRegistry::new());
        let lb = aggregate(&registry, &["p"], 0);
        assert!(lb.table().is_empty());

        registry.upsert(pool("p", &[&["a"]]));
        let generation = lb.table().generation();
        assert_eq!(lb.table().len(), 1);

        registry.upsert(pool("other", &[&["x"]]));
        assert_eq!(lb.table().generation(), generation);

        registry.remove("p");
        assert!(lb.table().is_empty());
        assert!(lb.choose_host(None).is_none());
    }

    #[test]
    fn test_health_change_updates_default_load() {
        let registry = Arc::new(PoolRegistry::new());
        registry.upsert(pool("p", &[&["a"], &["b"]]));
        let lb = aggregate(&registry, &["p"], 50);

        registry.set_host_health("p", "a", HealthState::Unhealthy).unwrap();
        assert_eq!(lb.table().default_load().healthy, vec![0, 100]);
        assert_eq!(lb.choose_host(None).unwrap().name, "b");
    }

    #[test]
    fn test_detach_stops_updates() {
        let registry = Arc::new(PoolRegistry::new());
        let lb = aggregate(&registry, &["p"], 0);
        lb.detach();
        registry.upsert(pool("p", &[&["a"]]));
        assert!(lb.table().is_empty());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let registry = Arc::new(PoolRegistry::new());
        let first = aggregate(&registry, &["p"], 0);
        let second = aggregate(&registry, &["p"], 0);
        assert_eq!(registry.subscriber_count(), 2);

        second.detach();
        drop(second);
        drop(first);
        assert_eq!(registry.subscriber_count(), 0);

        registry.upsert(pool("p", &[&["a"]]));
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[test]
    fn test_recursion_limit_returns_none() {
        let registry = Arc::new(PoolRegistry::new());
        registry.upsert(pool("p", &[&["a"], &["b"]]));
        let config = AggregateConfig {
            pools: vec!["p".into()],
            max_recursion_depth: 0,
            ..Default::default()
        };
        let lb = AggregateBalancer::new(&config, registry, Arc::new(FixedSequence::constant(0)));
        assert!(lb.choose_host(None).is_none());
    }
}
