//! Healthy/degraded load distributions.
//!
//! A [`PriorityLoad`] assigns every linear tier a share of traffic for
//! healthy hosts and a share for degraded hosts, all in percent. Every
//! distribution built here sums to exactly 100.

use crate::topology::TierAvailability;

/// Per-tier load percentages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PriorityLoad {
    pub healthy: Vec<u32>,
    pub degraded: Vec<u32>,
}

impl PriorityLoad {
    /// All-zero distribution over `tiers` tiers.
    pub fn zeroed(tiers: usize) -> Self {
        Self {
            healthy: vec![0; tiers],
            degraded: vec![0; tiers],
        }
    }

    pub fn new(healthy: Vec<u32>, degraded: Vec<u32>) -> Self {
        debug_assert_eq!(healthy.len(), degraded.len());
        Self { healthy, degraded }
    }

    pub fn len(&self) -> usize {
        self.healthy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.healthy.is_empty()
    }

    pub fn total(&self) -> u32 {
        self.healthy.iter().sum::<u32>() + self.degraded.iter().sum::<u32>()
    }

    /// Load a proxy would use with no retry adjustments.
    ///
    /// Healthy availability is served first, degraded availability from
    /// what remains; rounding leftovers land on the first tier with healthy
    /// availability (else degraded). With no availability at all, tier 0
    /// healthy takes everything.
    pub fn from_availability(availability: &[TierAvailability]) -> Self {
        let mut load = Self::zeroed(availability.len());
        if availability.is_empty() {
            return load;
        }

        let total = normalized_total(availability);
        if total == 0 {
            load.healthy[0] = 100;
            return load;
        }

        let mut remaining = 100u32;
        let mut first_healthy = None;
        for (i, a) in availability.iter().enumerate() {
            if a.healthy > 0 && first_healthy.is_none() {
                first_healthy = Some(i);
            }
            let share = remaining.min(a.healthy * 100 / total);
            load.healthy[i] = share;
            remaining -= share;
        }

        let mut first_degraded = None;
        for (i, a) in availability.iter().enumerate() {
            if a.degraded > 0 && first_degraded.is_none() {
                first_degraded = Some(i);
            }
            let share = remaining.min(a.degraded * 100 / total);
            load.degraded[i] = share;
            remaining -= share;
        }

        if remaining > 0 {
            match (first_healthy, first_degraded) {
                (Some(i), _) => load.healthy[i] += remaining,
                (None, Some(i)) => load.degraded[i] += remaining,
                (None, None) => load.healthy[0] += remaining,
            }
        }
        load
    }
}

/// `min(100, Σhealthy + Σdegraded)`.
pub fn normalized_total(availability: &[TierAvailability]) -> u32 {
    availability
        .iter()
        .map(|a| a.healthy + a.degraded)
        .sum::<u32>()
        .min(100)
}

/// Availability with excluded tiers zeroed, and its capped total.
pub fn adjusted_availability(availability: &[TierAvailability], excluded: &[bool]) -> (Vec<TierAvailability>, u32) {
    let adjusted: Vec<_> = availability
        .iter()
        .enumerate()
        .map(|(i, a)| {
            if excluded.get(i).copied().unwrap_or(false) {
                TierAvailability::default()
            } else {
                *a
            }
        })
        .collect();
    let total = normalized_total(&adjusted);
    (adjusted, total)
}

/// Spread 100 units over tiers in proportion to `availability`.
///
/// Each pass walks healthy then degraded shares in tier order, granting
/// `min(remaining, weight * 100 / total)`; passes repeat until nothing is
/// left, so rounding leftovers go to the earliest tiers.
///
/// `total` must be `normalized_total(availability)` and non-zero.
pub fn distribute(availability: &[TierAvailability], total: u32) -> PriorityLoad {
    debug_assert!(total > 0);
    let mut load = PriorityLoad::zeroed(availability.len());
    let mut remaining = 100u32;

    while remaining != 0 {
        let before = remaining;
        for (i, a) in availability.iter().enumerate() {
            let delta = remaining.min(a.healthy * 100 / total);
            load.healthy[i] += delta;
            remaining -= delta;
        }
        for (i, a) in availability.iter().enumerate() {
            let delta = remaining.min(a.degraded * 100 / total);
            load.degraded[i] += delta;
            remaining -= delta;
        }
        if remaining == before {
            // Unreachable while total matches the availability; never spin.
            break;
        }
    }
    load
}
