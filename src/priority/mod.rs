//! Priority load subsystem.
//!
//! # Data Flow
//! ```text
//! Host health (per tier)
//!     → Tier::availability() (overprovisioned healthy/degraded %)
//!     → load.rs (default distribution, exclusion-aware redistribution)
//!     → PriorityLoad { healthy[], degraded[] } summing to 100
//!     → selector.rs choose_tier(random % 100) → (tier, class)
//! ```
//!
//! # Design Decisions
//! - Everything here is pure; randomness is injected via random.rs
//! - Integer percentages, leftovers go to the earliest tiers

pub mod load;
pub mod random;
pub mod selector;

pub use load::{adjusted_availability, distribute, normalized_total, PriorityLoad};
pub use random::{FixedSequence, RandomSource, SeededRandom, ThreadRandom};
pub use selector::{choose_tier, HostAvailability};
