//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the balancer.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::topology::HealthState;

/// Root configuration for the tiered balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// The aggregate pool that flattens member pools into linear tiers.
    pub aggregate: AggregateConfig,

    /// Retry behaviour across tiers.
    pub retry: RetryConfig,

    /// Backend pool definitions.
    pub pools: Vec<PoolConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Aggregate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AggregateConfig {
    /// Name used in logs and metrics.
    pub name: String,

    /// Member pools, in priority order.
    pub pools: Vec<String>,

    /// Hard ceiling on recursive tier reselection.
    pub max_recursion_depth: u32,

    /// Number of levels before the ceiling that are logged verbosely.
    pub verbose_recursion_window: u32,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            name: "aggregate".to_string(),
            pools: Vec::new(),
            max_recursion_depth: 100,
            verbose_recursion_window: 10,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempt budget per linear tier. A 0 entry means the tier is never used.
    pub update_frequency: Vec<u32>,

    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,

    /// Host predicates consulted before a host is returned.
    pub host_predicates: Vec<HostPredicateKind>,

    /// How many picks a pool balancer may make while predicates reject hosts.
    pub host_selection_retry_max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            update_frequency: vec![1],
            max_retries: 3,
            host_predicates: Vec::new(),
            host_selection_retry_max_attempts: 1,
        }
    }
}

/// Available host predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostPredicateKind {
    /// Skip hosts the request already passed through (via-header hosts).
    LoopPrevention,
    /// Skip canary hosts.
    OmitCanaryHosts,
    /// Skip hosts sharing the `host` metadata label of the first attempt.
    OmitHostMetadata,
}

/// Pool-local balancing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LbPolicy {
    #[default]
    RoundRobin,
    LeastRequest,
}

/// Backend pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Unique pool identifier.
    pub name: String,

    /// Balancer used inside each tier of this pool.
    #[serde(default)]
    pub lb_policy: LbPolicy,

    /// Overprovisioning factor in percent (default: 140).
    #[serde(default = "default_overprovisioning_factor")]
    pub overprovisioning_factor: u32,

    /// Tiers in priority order; index 0 is preferred.
    #[serde(default)]
    pub tiers: Vec<TierConfig>,
}

fn default_overprovisioning_factor() -> u32 {
    crate::topology::DEFAULT_OVERPROVISIONING_FACTOR
}

/// A tier of hosts.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TierConfig {
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
}

/// Host configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    /// Host identity (hostname).
    pub name: String,

    /// Host address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Initial health classification.
    #[serde(default)]
    pub health: HealthState,

    /// Round-robin share relative to the other hosts of the tier (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,

    #[serde(default)]
    pub canary: bool,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_weight() -> u32 {
    1
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
