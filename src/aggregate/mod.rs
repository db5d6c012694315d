//! Aggregate pool: several pools presented as one priority-ordered list.
//!
//! # Data Flow
//! ```text
//! PoolRegistry event for a member pool
//!     → linearizer.rs relinearize() → LinearTable (non-empty tiers only)
//!     → ArcSwap store (readers keep their snapshot)
//!
//! choose_host(request context)
//!     → RetryState::determine_load(table)   (or default load)
//!     → all tiers excluded? reset, no host
//!     → choose_tier(random, load)
//!     → single-host tier below tier 0 that is the preferred host or
//!       rejected by a predicate? exclude it and recurse (depth + 1)
//!     → owning pool's balancer picks inside the tier
//! ```
//!
//! # Design Decisions
//! - Tables are rebuilt whole, never patched
//! - A removed pool is left out explicitly; it is still in the registry
//!   while subscribers run
//! - Recursion is bounded; hitting the limit is a no-host result

pub mod balancer;
pub mod linearizer;

pub use balancer::AggregateBalancer;
pub use linearizer::{relinearize, LinearTable, LinearTier};
