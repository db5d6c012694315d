//! Tier linearization.
//!
//! Member pools `[C0, C1, C2]` with tiers
//! ```text
//! C0 [P0, P1, P2]
//! C1 [P0, P1]
//! C2 [P0, P1, P2, P3]
//! ```
//! flatten to `[C0.P0, C0.P1, C0.P2, C1.P0, C1.P1, C2.P0, C2.P1, C2.P2, C2.P3]`,
//! leaving out every empty tier.

use std::collections::HashMap;
use std::sync::Arc;

use crate::priority::PriorityLoad;
use crate::topology::{Host, Pool, PoolRegistry, Tier, TierAvailability};

/// One entry of the flattened tier sequence.
#[derive(Debug, Clone)]
pub struct LinearTier {
    pool: Arc<Pool>,
    tier: Tier,
}

impl LinearTier {
    pub fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    pub fn tier(&self) -> &Tier {
        &self.tier
    }

    /// Tier index inside the owning pool.
    pub fn original_index(&self) -> u32 {
        self.tier.index()
    }
}

/// Immutable snapshot of the flattened tiers of an aggregate.
#[derive(Debug, Default)]
pub struct LinearTable {
    generation: u64,
    tiers: Vec<LinearTier>,
    positions: HashMap<(String, u32), usize>,
    default_load: PriorityLoad,
}

impl LinearTable {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    pub fn tiers(&self) -> &[LinearTier] {
        &self.tiers
    }

    pub fn tier(&self, linear: usize) -> Option<&LinearTier> {
        self.tiers.get(linear)
    }

    /// Linear position of a pool's original tier.
    pub fn linear_index(&self, pool: &str, tier: u32) -> Option<usize> {
        self.positions.get(&(pool.to_string(), tier)).copied()
    }

    /// Linear position of the tier a host belongs to.
    ///
    /// `None` if the host's pool/tier left the table since it was attempted.
    pub fn host_tier(&self, host: &Host) -> Option<usize> {
        self.linear_index(&host.pool, host.tier)
    }

    /// `(pool, original tier) -> linear index`, for inspection.
    pub fn positions(&self) -> &HashMap<(String, u32), usize> {
        &self.positions
    }

    /// Current availability of every linear tier.
    pub fn availability(&self) -> Vec<TierAvailability> {
        self.tiers.iter().map(|t| t.tier.availability()).collect()
    }

    /// Load used when no retry adjustment applies.
    pub fn default_load(&self) -> &PriorityLoad {
        &self.default_load
    }
}

/// Flatten `members` (in order) into a new table.
///
/// Pools missing from the registry, and `excluded` if given, are skipped.
pub fn relinearize(
    members: &[String],
    registry: &PoolRegistry,
    excluded: Option<&str>,
    generation: u64,
) -> LinearTable {
    let mut tiers = Vec::new();
    let mut positions = HashMap::new();

    for name in members {
        if excluded == Some(name.as_str()) {
            continue;
        }
        let Some(pool) = registry.get(name) else {
            tracing::debug!(pool = %name, "Pool absent during linearization, skipping");
            continue;
        };

        for tier in pool.tiers() {
            if tier.is_empty() {
                continue;
            }
            positions.insert((name.clone(), tier.index()), tiers.len());
            tiers.push(LinearTier {
                pool: pool.clone(),
                tier: tier.clone(),
            });
        }
    }

    let availability: Vec<_> = tiers.iter().map(|t| t.tier.availability()).collect();
    LinearTable {
        generation,
        tiers,
        positions,
        default_load: PriorityLoad::from_availability(&availability),
    }
}
