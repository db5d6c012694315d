//! Topology subsystem.
//!
//! # Data Flow
//! ```text
//! Configuration / external discovery
//!     → feed.rs (diff into registry operations)
//!     → registry.rs (pool map + subscribers)
//!         → TopologyEvent::{PoolAdded, PoolUpdated, PoolRemoved}
//!     → subscribers (aggregate balancer relinearizes)
//!
//! Health checker (external)
//!     → registry.set_host_health()
//!     → host.rs atomic state
//!     → TopologyEvent::PoolUpdated
//! ```
//!
//! # Design Decisions
//! - Pools and tiers are immutable snapshots, replaced wholesale
//! - Host health is the only state mutated in place (atomics)
//! - Host identity is the host name

pub mod error;
pub mod feed;
pub mod host;
pub mod pool;
pub mod registry;
pub mod tier;

pub use error::{TopologyError, TopologyResult};
pub use feed::TopologyFeed;
pub use host::{ActiveRequestGuard, HealthState, Host};
pub use pool::Pool;
pub use registry::{PoolRegistry, SubscriptionId, TopologyEvent};
pub use tier::{Tier, TierAvailability, DEFAULT_OVERPROVISIONING_FACTOR, MAX_OVERPROVISIONING_FACTOR};
