//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Unique pool names, unique host names per pool
//! - Parseable host addresses
//! - Value ranges (recursion depth, overprovisioning factor in 1..=1000)
//! - A non-empty attempt budget table
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Aggregate members missing from `pools` are allowed; pools may appear later
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::BalancerConfig;
use crate::topology::MAX_OVERPROVISIONING_FACTOR;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate pool name '{0}'")]
    DuplicatePool(String),

    #[error("duplicate host '{host}' in pool '{pool}'")]
    DuplicateHost { pool: String, host: String },

    #[error("invalid address '{address}' for host '{host}'")]
    InvalidAddress { host: String, address: String },

    #[error("pool '{0}' has an overprovisioning factor of 0")]
    ZeroOverprovisioning(String),

    #[error("pool '{pool}' overprovisioning factor {factor} exceeds {max}")]
    OverprovisioningTooLarge { pool: String, factor: u32, max: u32 },

    #[error("aggregate.max_recursion_depth must be greater than 0")]
    ZeroRecursionDepth,

    #[error("aggregate.verbose_recursion_window ({window}) exceeds max_recursion_depth ({depth})")]
    VerboseWindowTooLarge { window: u32, depth: u32 },

    #[error("aggregate lists pool '{0}' more than once")]
    DuplicateMember(String),

    #[error("retry.update_frequency must list at least one attempt budget")]
    EmptyUpdateFrequency,
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let aggregate = &config.aggregate;
    if aggregate.max_recursion_depth == 0 {
        errors.push(ValidationError::ZeroRecursionDepth);
    } else if aggregate.verbose_recursion_window > aggregate.max_recursion_depth {
        errors.push(ValidationError::VerboseWindowTooLarge {
            window: aggregate.verbose_recursion_window,
            depth: aggregate.max_recursion_depth,
        });
    }

    if config.retry.update_frequency.is_empty() {
        errors.push(ValidationError::EmptyUpdateFrequency);
    }

    let mut members = HashSet::new();
    for name in &aggregate.pools {
        if !members.insert(name) {
            errors.push(ValidationError::DuplicateMember(name.clone()));
        }
    }

    let mut pools = HashSet::new();
    for pool in &config.pools {
        if !pools.insert(&pool.name) {
            errors.push(ValidationError::DuplicatePool(pool.name.clone()));
        }
        if pool.overprovisioning_factor == 0 {
            errors.push(ValidationError::ZeroOverprovisioning(pool.name.clone()));
        } else if pool.overprovisioning_factor > MAX_OVERPROVISIONING_FACTOR {
            errors.push(ValidationError::OverprovisioningTooLarge {
                pool: pool.name.clone(),
                factor: pool.overprovisioning_factor,
                max: MAX_OVERPROVISIONING_FACTOR,
            });
        }

        let mut hosts = HashSet::new();
        for host in pool.tiers.iter().flat_map(|t| t.hosts.iter()) {
            if !hosts.insert(&host.name) {
                errors.push(ValidationError::DuplicateHost {
                    pool: pool.name.clone(),
                    host: host.name.clone(),
                });
            }
            if host.address.parse::<SocketAddr>().is_err() {
                errors.push(ValidationError::InvalidAddress {
                    host: host.name.clone(),
                    address: host.address.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
