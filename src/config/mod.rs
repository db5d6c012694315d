//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated, immutable)
//!     → pools pushed into the topology registry
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → topology feed diffs pools into registry events
//!     → aggregate balancer relinearizes
//! ```
//!
//! # Design Decisions
//! - Attempt budgets and recursion cap are immutable once loaded
//! - Only pool membership is hot-reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AggregateConfig, BalancerConfig, HostConfig, HostPredicateKind, LbPolicy, ObservabilityConfig,
    PoolConfig, RetryConfig, TierConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
