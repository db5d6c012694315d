//! Cross-retry request state.
//!
//! # Data Flow
//! ```text
//! RetryPolicy (from [retry] config)
//!     → new_request() → RequestContext { RetryState, predicates, via hosts }
//!     → surrounding layer reports each attempt: on_host_attempted()
//!     → before the next pick: RetryState::determine_load(table)
//!         - budget left in current tier: same load
//!         - tier exhausted: exclude, advance, redistribute
//!     → aggregate balancer selects with the returned load
//! ```
//!
//! # Design Decisions
//! - One RequestContext per logical request, never shared; no locking
//! - Attempt budgets are shared read-only across requests
//! - Predicates are built per request since some carry state

pub mod context;
pub mod predicate;
pub mod state;

pub use context::{RequestContext, RetryPolicy};
pub use predicate::{HostPredicate, LoopPrevention, OmitCanaryHosts, OmitHostMetadata, HOST_METADATA_KEY};
pub use state::RetryState;
