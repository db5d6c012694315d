//! Request-scoped retry context.

use std::sync::Arc;

use uuid::Uuid;

use crate::config::{HostPredicateKind, RetryConfig};
use crate::retry::predicate::{self, HostPredicate};
use crate::retry::state::RetryState;
use crate::topology::Host;

/// Retry settings shared by every request of an aggregate.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    budgets: Arc<[u32]>,
    predicates: Vec<HostPredicateKind>,
    max_retries: u32,
    host_selection_attempts: u32,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            budgets: config.update_frequency.as_slice().into(),
            predicates: config.host_predicates.clone(),
            max_retries: config.max_retries,
            host_selection_attempts: config.host_selection_retry_max_attempts.max(1),
        }
    }

    /// Start a new logical request with fresh retry state.
    pub fn new_request(&self) -> RequestContext {
        RequestContext {
            id: Uuid::new_v4(),
            state: RetryState::new(Arc::clone(&self.budgets)),
            predicates: self.predicates.iter().map(|&kind| predicate::build(kind)).collect(),
            via_hosts: Vec::new(),
            host_selection_attempts: self.host_selection_attempts,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn budgets(&self) -> &[u32] {
        &self.budgets
    }
}

/// Everything the balancer knows about one logical request.
///
/// Created when the first attempt is scheduled and dropped when the request
/// completes, taking its retry state with it.
#[derive(Debug)]
pub struct RequestContext {
    id: Uuid,
    state: RetryState,
    predicates: Vec<Box<dyn HostPredicate>>,
    via_hosts: Vec<String>,
    host_selection_attempts: u32,
}

impl RequestContext {
    /// Hosts (names or `ip:port`) the request already passed through.
    pub fn with_via_hosts(mut self, via_hosts: Vec<String>) -> Self {
        self.via_hosts = via_hosts;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &RetryState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut RetryState {
        &mut self.state
    }

    pub fn host_selection_attempts(&self) -> u32 {
        self.host_selection_attempts
    }

    /// Record the host the request was just sent to.
    pub fn on_host_attempted(&mut self, host: &Arc<Host>) {
        tracing::debug!(request_id = %self.id, host = %host.name, "Host attempted");
        for predicate in &mut self.predicates {
            predicate.on_host_attempted(host);
        }
        self.state.on_host_attempted(Arc::clone(host));
    }

    /// True if any configured predicate rejects `host`.
    pub fn should_select_another_host(&self, host: &Host) -> bool {
        self.predicates
            .iter()
            .any(|p| p.should_select_another_host(host, &self.via_hosts))
    }
}
