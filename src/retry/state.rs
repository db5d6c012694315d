//! Per-request retry state and exhaustion-aware load redistribution.
//!
//! Each linear tier has an attempt budget. Attempts are counted per tier;
//! when a tier runs out of budget it is excluded and the load of the
//! remaining tiers is recomputed so that it again sums to 100.

use std::sync::Arc;

use crate::aggregate::LinearTable;
use crate::observability::metrics;
use crate::priority::{adjusted_availability, distribute, PriorityLoad};
use crate::topology::Host;

/// Retry bookkeeping owned by one logical request.
///
/// Two flag sets are kept per tier. `excluded` drives host selection and is
/// cleared only by [`RetryState::reset_exclusions`]. `load_excluded` drives
/// availability recomputation and is cleared when nothing would remain
/// routable otherwise.
#[derive(Debug, Clone)]
pub struct RetryState {
    budgets: Arc<[u32]>,
    attempted: Vec<Arc<Host>>,
    excluded: Vec<bool>,
    load_excluded: Vec<bool>,
    current_tier: usize,
    preferred_host: Option<String>,
    adjusted: Option<PriorityLoad>,
}

impl RetryState {
    pub fn new(budgets: Arc<[u32]>) -> Self {
        Self {
            budgets,
            attempted: Vec::new(),
            excluded: Vec::new(),
            load_excluded: Vec::new(),
            current_tier: 0,
            preferred_host: None,
            adjusted: None,
        }
    }

    /// Record a host the request was sent to.
    pub fn on_host_attempted(&mut self, host: Arc<Host>) {
        self.attempted.push(host);
    }

    /// Hosts attempted since the current tier was entered.
    pub fn attempted(&self) -> &[Arc<Host>] {
        &self.attempted
    }

    pub fn budgets(&self) -> &[u32] {
        &self.budgets
    }

    pub fn current_tier(&self) -> usize {
        self.current_tier
    }

    pub fn preferred_host(&self) -> Option<&str> {
        self.preferred_host.as_deref()
    }

    pub fn set_preferred_host(&mut self, name: impl Into<String>) {
        self.preferred_host = Some(name.into());
    }

    pub fn is_excluded(&self, tier: usize) -> bool {
        self.excluded.get(tier).copied().unwrap_or(false)
    }

    /// Tiers currently excluded from selection.
    pub fn excluded_tiers(&self) -> Vec<usize> {
        self.excluded
            .iter()
            .enumerate()
            .filter_map(|(t, &flag)| flag.then_some(t))
            .collect()
    }

    /// Exclude `tier` from selection. Out of range tiers are ignored.
    pub fn exclude(&mut self, tier: usize, reason: &'static str) {
        let Some(flag) = self.excluded.get_mut(tier) else {
            return;
        };
        if !*flag {
            *flag = true;
            metrics::record_tier_excluded(reason);
            tracing::debug!(tier, reason, "Tier excluded");
        }
    }

    /// True when there is at least one tier and all are excluded.
    pub fn all_excluded(&self) -> bool {
        !self.excluded.is_empty() && self.excluded.iter().all(|&flag| flag)
    }

    /// Make every tier selectable again.
    pub fn reset_exclusions(&mut self) {
        tracing::debug!(tiers = self.excluded.len(), "Resetting tier exclusions");
        self.excluded.iter_mut().for_each(|flag| *flag = false);
    }

    /// Size the flag vectors for a table with `tiers` linear tiers.
    ///
    /// A changed tier count invalidates every flag and the adjusted load.
    pub fn ensure_tier_count(&mut self, tiers: usize) {
        if self.excluded.len() == tiers {
            return;
        }
        if !self.excluded.is_empty() {
            tracing::debug!(old = self.excluded.len(), new = tiers, "Tier count changed, clearing retry state");
        }
        self.excluded = vec![false; tiers];
        self.load_excluded = vec![false; tiers];
        self.adjusted = None;
    }

    /// Load to use for the next selection of this request.
    ///
    /// Keeps returning the current distribution while the current tier still
    /// has budget. Once it is exhausted the cursor moves on, the tiers of
    /// every attempted host drop out and the load is redistributed over what
    /// remains. Falls back to the table's default load when no redistribution
    /// is possible.
    pub fn determine_load(&mut self, table: &LinearTable) -> PriorityLoad {
        let tiers = table.len();
        if self.budgets.is_empty() || tiers == 0 {
            return table.default_load().clone();
        }
        self.ensure_tier_count(tiers);

        let budgets = Arc::clone(&self.budgets);
        for (tier, &budget) in budgets.iter().enumerate().take(tiers) {
            if budget == 0 {
                self.exclude(tier, "budget_zero");
                self.load_excluded[tier] = true;
            }
        }

        if let Some(tier) = self.attempted.last().and_then(|host| table.host_tier(host)) {
            self.current_tier = tier;
        }
        if self.current_tier >= budgets.len() {
            self.current_tier = 0;
        }
        if self.current_tier >= tiers {
            self.current_tier = tiers - 1;
        }

        let current = self.current_tier;
        let budget = budgets[current];
        if self.excluded[current] {
            self.load_excluded[current] = true;
        }
        if self.attempted.len() == budget as usize {
            self.exclude(current, "exhausted");
            self.load_excluded[current] = true;
        }

        if !self.excluded[current] && budget > 0 {
            return self.adjusted.clone().unwrap_or_else(|| table.default_load().clone());
        }

        self.current_tier += 1;
        for host in &self.attempted {
            if let Some(tier) = table.host_tier(host) {
                self.load_excluded[tier] = true;
            }
        }
        let adjusted = self.redistribute(table);
        self.attempted.clear();

        match adjusted {
            Some(load) => {
                tracing::debug!(
                    healthy = ?load.healthy,
                    degraded = ?load.degraded,
                    next_tier = self.current_tier,
                    "Redistributed tier load"
                );
                self.adjusted = Some(load.clone());
                load
            }
            None => table.default_load().clone(),
        }
    }

    /// Distribute 100 over tiers not excluded from the load.
    ///
    /// With zero availability left the bookkeeping flags are cleared (tiers
    /// with a zero budget stay out) and the computation runs once more.
    fn redistribute(&mut self, table: &LinearTable) -> Option<PriorityLoad> {
        let availability = table.availability();
        let (adjusted, total) = adjusted_availability(&availability, &self.load_excluded);
        if total > 0 {
            return Some(distribute(&adjusted, total));
        }

        tracing::debug!("No availability left after exclusions, clearing load exclusions");
        for (tier, flag) in self.load_excluded.iter_mut().enumerate() {
            *flag = self.budgets.get(tier) == Some(&0);
        }
        let (adjusted, total) = adjusted_availability(&availability, &self.load_excluded);
        if total == 0 {
            return None;
        }
        Some(distribute(&adjusted, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::relinearize;
    use crate::load_balancer::RoundRobin;
    use crate::topology::{HealthState, Pool, PoolRegistry, Tier};
    use proptest::prelude::*;

    fn host(name: &str, tier: u32) -> Arc<Host> {
        Arc::new(Host::new(name, "127.0.0.1:80".parse().unwrap(), "p", tier))
    }

    fn table(tiers: Vec<Vec<Arc<Host>>>) -> LinearTable {
        let tiers = tiers
            .into_iter()
            .enumerate()
            .map(|(i, hosts)| Tier::new(i as u32, hosts))
            .collect();
        let registry = PoolRegistry::new();
        registry.upsert(Pool::new("p", tiers, Arc::new(RoundRobin::new())));
        relinearize(&["p".to_string()], &registry, None, 1)
    }

    fn state(budgets: &[u32]) -> RetryState {
        RetryState::new(budgets.into())
    }

    #[test]
    fn test_budget_exhaustion_moves_to_next_tier() {
        let t0 = vec![host("a", 0), host("b", 0)];
        let t1 = vec![host("c", 1)];
        let table = table(vec![t0.clone(), t1]);
        let mut state = state(&[2, 1]);

        assert_eq!(state.determine_load(&table).healthy, vec![100, 0]);
        state.on_host_attempted(t0[0].clone());
        assert_eq!(state.determine_load(&table).healthy, vec![100, 0]);
        state.on_host_attempted(t0[1].clone());

        let load = state.determine_load(&table);
        assert_eq!(load.healthy, vec![0, 100]);
        assert!(state.is_excluded(0));
        assert!(!state.is_excluded(1));
        assert!(state.attempted().is_empty());
        assert_eq!(state.current_tier(), 1);
    }

    #[test]
    fn test_adjusted_load_kept_while_budget_remains() {
        let t0 = vec![host("a", 0)];
        let t1 = vec![host("b", 1)];
        let t2 = vec![host("c", 2)];
        let table = table(vec![t0.clone(), t1.clone(), t2]);
        let mut state = state(&[1, 2, 1]);

        state.on_host_attempted(t0[0].clone());
        assert_eq!(state.determine_load(&table).healthy, vec![0, 100, 0]);
        state.on_host_attempted(t1[0].clone());
        assert_eq!(state.determine_load(&table).healthy, vec![0, 100, 0]);
        state.on_host_attempted(t1[0].clone());
        assert_eq!(state.determine_load(&table).healthy, vec![0, 0, 100]);
        assert_eq!(state.excluded_tiers(), vec![0, 1]);
    }

    #[test]
    fn test_budget_zero_excluded_up_front() {
        let table = table(vec![vec![host("a", 0)], vec![host("b", 1)]]);
        let mut state = state(&[0, 3]);

        let load = state.determine_load(&table);
        assert!(state.is_excluded(0));
        assert_eq!(load.healthy, vec![0, 100]);

        state.on_host_attempted(host("b", 1));
        state.determine_load(&table);
        assert!(state.is_excluded(0));
    }

    #[test]
    fn test_exclusion_is_monotonic() {
        let t0 = vec![host("a", 0)];
        let t1 = vec![host("b", 1), host("c", 1)];
        let table = table(vec![t0.clone(), t1.clone()]);
        let mut state = state(&[1, 5]);

        state.on_host_attempted(t0[0].clone());
        state.determine_load(&table);
        assert!(state.is_excluded(0));

        for h in t1.iter().cycle().take(4) {
            state.on_host_attempted(h.clone());
            state.determine_load(&table);
            assert!(state.is_excluded(0));
        }
    }

    #[test]
    fn test_zero_availability_falls_back() {
        let t0 = vec![host("a", 0)];
        let t1 = vec![host("b", 1)];
        let table = table(vec![t0.clone(), t1.clone()]);
        let mut state = state(&[1, 1]);

        state.on_host_attempted(t0[0].clone());
        assert_eq!(state.determine_load(&table).healthy, vec![0, 100]);
        state.on_host_attempted(t1[0].clone());

        // both tiers spent: bookkeeping cleared, selection flags kept
        assert_eq!(state.determine_load(&table).healthy, vec![100, 0]);
        assert!(state.all_excluded());
        state.reset_exclusions();
        assert!(state.excluded_tiers().is_empty());
    }

    #[test]
    fn test_no_availability_uses_default() {
        let a = host("a", 0);
        a.set_health(HealthState::Unhealthy);
        let table = table(vec![vec![a.clone()]]);
        let mut state = state(&[1]);

        state.on_host_attempted(a);
        let load = state.determine_load(&table);
        assert_eq!(&load, table.default_load());
    }

    #[test]
    fn test_tier_count_change_clears_flags() {
        let mut state = state(&[0, 1]);
        let two = table(vec![vec![host("a", 0)], vec![host("b", 1)]]);
        state.determine_load(&two);
        assert!(state.is_excluded(0));

        state.ensure_tier_count(3);
        assert!(state.excluded_tiers().is_empty());
        state.exclude(7, "skip");
        assert!(!state.all_excluded());
    }

    #[test]
    fn test_empty_budget_table_returns_default() {
        let table = table(vec![vec![host("a", 0)], vec![host("b", 1)]]);
        let mut state = state(&[]);
        state.on_host_attempted(host("a", 0));
        assert_eq!(&state.determine_load(&table), table.default_load());
    }

    proptest! {
        #[test]
        fn test_redistribution_sums_to_100(
            tiers in proptest::collection::vec((1usize..4, 0usize..4, 0usize..4), 1..5),
            budgets in proptest::collection::vec(0u32..3, 1..6),
            attempts in proptest::collection::vec(0usize..16, 0..12),
        ) {
            let mut hosts = Vec::new();
            let layout: Vec<Vec<Arc<Host>>> = tiers
                .iter()
                .enumerate()
                .map(|(t, &(healthy, degraded, unhealthy))| {
                    let mut tier = Vec::new();
                    for (count, health) in [
                        (healthy, HealthState::Healthy),
                        (degraded, HealthState::Degraded),
                        (unhealthy, HealthState::Unhealthy),
                    ] {
                        for i in 0..count {
                            let h = host(&format!("h{t}-{i}-{health:?}"), t as u32);
                            h.set_health(health);
                            tier.push(h);
                        }
                    }
                    tier
                })
                .collect();
            for tier in &layout {
                hosts.extend(tier.iter().cloned());
            }
            let table = table(layout);
            let mut state = state(&budgets);

            for pick in attempts {
                let load = state.determine_load(&table);
                prop_assert_eq!(load.total(), 100);
                prop_assert_eq!(load.len(), table.len());
                state.on_host_attempted(hosts[pick % hosts.len()].clone());
            }
        }
    }
}
