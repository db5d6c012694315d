//! Weighted tier selection.

use crate::priority::load::PriorityLoad;

/// Which class of hosts a tier pick is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostAvailability {
    Healthy,
    Degraded,
}

impl HostAvailability {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostAvailability::Healthy => "healthy",
            HostAvailability::Degraded => "degraded",
        }
    }
}

/// Pick a tier from a random draw.
///
/// `[0, 100)` is cut into consecutive healthy buckets (one per tier) followed
/// by consecutive degraded buckets; `random % 100` falls into exactly one.
/// If the buckets do not cover the draw (loads summing below 100), tier 0
/// healthy is returned.
pub fn choose_tier(random: u64, load: &PriorityLoad) -> (usize, HostAvailability) {
    let point = (random % 100) as u32;
    let mut upper = 0u32;

    for (tier, share) in load.healthy.iter().enumerate() {
        upper += share;
        if point < upper {
            return (tier, HostAvailability::Healthy);
        }
    }
    for (tier, share) in load.degraded.iter().enumerate() {
        upper += share;
        if point < upper {
            return (tier, HostAvailability::Degraded);
        }
    }

    tracing::debug!(point, total = upper, "Random draw outside load buckets, using tier 0");
    (0, HostAvailability::Healthy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        let load = PriorityLoad::new(vec![50, 20], vec![0, 30]);
        assert_eq!(choose_tier(0, &load), (0, HostAvailability::Healthy));
        assert_eq!(choose_tier(49, &load), (0, HostAvailability::Healthy));
        assert_eq!(choose_tier(50, &load), (1, HostAvailability::Healthy));
        assert_eq!(choose_tier(69, &load), (1, HostAvailability::Healthy));
        assert_eq!(choose_tier(70, &load), (1, HostAvailability::Degraded));
        assert_eq!(choose_tier(99, &load), (1, HostAvailability::Degraded));
    }

    #[test]
    fn test_draw_is_reduced_mod_100() {
        let load = PriorityLoad::new(vec![10, 90], vec![0, 0]);
        assert_eq!(choose_tier(1_005, &load), (0, HostAvailability::Healthy));
        assert_eq!(choose_tier(u64::MAX, &load).0, 1);
    }

    #[test]
    fn test_zero_share_tier_never_chosen() {
        let load = PriorityLoad::new(vec![0, 100], vec![0, 0]);
        for draw in 0..100 {
            assert_eq!(choose_tier(draw, &load).0, 1);
        }
    }

    #[test]
    fn test_uncovered_draw_falls_back() {
        let load = PriorityLoad::new(vec![0, 40], vec![0, 0]);
        assert_eq!(choose_tier(75, &load), (0, HostAvailability::Healthy));
    }
}
