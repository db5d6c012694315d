//! Priority-tiered load balancing with exhaustion-aware redistribution.

pub mod aggregate;
pub mod config;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod priority;
pub mod retry;
pub mod simulation;
pub mod topology;

pub use aggregate::{AggregateBalancer, LinearTable};
pub use config::BalancerConfig;
pub use lifecycle::Shutdown;
pub use priority::{choose_tier, HostAvailability, PriorityLoad};
pub use retry::{RequestContext, RetryPolicy, RetryState};
pub use topology::{Host, Pool, PoolRegistry, TopologyFeed};
