//! Priority tier: an ordered group of hosts inside a pool.

use std::sync::Arc;

use crate::topology::host::{HealthState, Host};

/// Default overprovisioning factor, in percent.
pub const DEFAULT_OVERPROVISIONING_FACTOR: u32 = 140;

/// Largest overprovisioning factor accepted from configuration.
pub const MAX_OVERPROVISIONING_FACTOR: u32 = 1000;

/// Healthy/degraded availability of a tier, each in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TierAvailability {
    pub healthy: u32,
    pub degraded: u32,
}

/// An ordered group of hosts within a pool.
#[derive(Debug, Clone)]
pub struct Tier {
    index: u32,
    hosts: Vec<Arc<Host>>,
    overprovisioning_factor: u32,
}

impl Tier {
    pub fn new(index: u32, hosts: Vec<Arc<Host>>) -> Self {
        Self {
            index,
            hosts,
            overprovisioning_factor: DEFAULT_OVERPROVISIONING_FACTOR,
        }
    }

    pub fn with_overprovisioning_factor(mut self, factor: u32) -> Self {
        self.overprovisioning_factor = factor;
        self
    }

    /// Tier index inside the owning pool.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn hosts(&self) -> &[Arc<Host>] {
        &self.hosts
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn find(&self, name: &str) -> Option<&Arc<Host>> {
        self.hosts.iter().find(|h| h.name == name)
    }

    /// Availability derived from current host health.
    ///
    /// `healthy = min(100, factor * healthy_hosts / total)`,
    /// `degraded = min(100 - healthy, factor * degraded_hosts / total)`.
    pub fn availability(&self) -> TierAvailability {
        let total = self.hosts.len() as u32;
        if total == 0 {
            return TierAvailability::default();
        }

        let (mut healthy, mut degraded) = (0u32, 0u32);
        for host in &self.hosts {
            match host.health() {
                HealthState::Healthy => healthy += 1,
                HealthState::Degraded => degraded += 1,
                HealthState::Unhealthy => {}
            }
        }

        let factor = u64::from(self.overprovisioning_factor);
        let total = u64::from(total);
        let healthy = (factor * u64::from(healthy) / total).min(100) as u32;
        let degraded = (factor * u64::from(degraded) / total).min(u64::from(100 - healthy)) as u32;
        TierAvailability { healthy, degraded }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str, health: HealthState) -> Arc<Host> {
        Arc::new(Host::new(name, "127.0.0.1:80".parse().unwrap(), "p", 0).with_health(health))
    }

    #[test]
    fn test_all_healthy_is_capped() {
        let tier = Tier::new(0, vec![host("a", HealthState::Healthy), host("b", HealthState::Healthy)]);
        assert_eq!(tier.availability(), TierAvailability { healthy: 100, degraded: 0 });
    }

    #[test]
    fn test_overprovisioning() {
        let tier = Tier::new(
            0,
            vec![host("a", HealthState::Healthy), host("b", HealthState::Unhealthy)],
        );
        // 140 * 1 / 2
        assert_eq!(tier.availability().healthy, 70);

        let tier = tier.with_overprovisioning_factor(100);
        assert_eq!(tier.availability().healthy, 50);
    }

    #[test]
    fn test_degraded_fills_remainder() {
        let tier = Tier::new(
            0,
            vec![
                host("a", HealthState::Healthy),
                host("b", HealthState::Degraded),
                host("c", HealthState::Degraded),
                host("d", HealthState::Unhealthy),
            ],
        );
        let avail = tier.availability();
        assert_eq!(avail.healthy, 35);
        assert_eq!(avail.degraded, 65);
    }

    #[test]
    fn test_huge_factor_does_not_overflow() {
        let tier = Tier::new(
            0,
            vec![
                host("a", HealthState::Healthy),
                host("b", HealthState::Degraded),
                host("c", HealthState::Unhealthy),
            ],
        )
        .with_overprovisioning_factor(3_000_000_000);
        assert_eq!(tier.availability(), TierAvailability { healthy: 100, degraded: 0 });

        let tier = Tier::new(0, vec![host("a", HealthState::Healthy), host("b", HealthState::Healthy)])
            .with_overprovisioning_factor(u32::MAX);
        assert_eq!(tier.availability().healthy, 100);
    }

    #[test]
    fn test_empty_tier() {
        let tier = Tier::new(3, Vec::new());
        assert!(tier.is_empty());
        assert_eq!(tier.availability(), TierAvailability::default());
    }
}
