//! Host retry predicates.
//!
//! A predicate answers "should another host be chosen instead of this one?"
//! for the request it belongs to, and is told about every attempted host.

use crate::config::HostPredicateKind;
use crate::topology::Host;

/// Metadata label compared by [`OmitHostMetadata`].
pub const HOST_METADATA_KEY: &str = "host";

pub trait HostPredicate: Send + Sync + std::fmt::Debug {
    fn should_select_another_host(&self, host: &Host, via_hosts: &[String]) -> bool;

    fn on_host_attempted(&mut self, _host: &Host) {}
}

/// Rejects hosts the request has already travelled through.
///
/// A via entry matches a host by name or by `ip:port`.
#[derive(Debug, Default)]
pub struct LoopPrevention;

impl HostPredicate for LoopPrevention {
    fn should_select_another_host(&self, host: &Host, via_hosts: &[String]) -> bool {
        if via_hosts.is_empty() {
            return false;
        }
        let addr = host.addr.to_string();
        via_hosts.iter().any(|via| *via == host.name || *via == addr)
    }
}

/// Rejects canary hosts.
#[derive(Debug, Default)]
pub struct OmitCanaryHosts;

impl HostPredicate for OmitCanaryHosts {
    fn should_select_another_host(&self, host: &Host, _via_hosts: &[String]) -> bool {
        host.canary
    }
}

/// Remembers the `host` label of the first attempted host and rejects every
/// host carrying the same label afterwards.
#[derive(Debug, Default)]
pub struct OmitHostMetadata {
    recorded: bool,
    label: Option<String>,
}

impl HostPredicate for OmitHostMetadata {
    fn should_select_another_host(&self, host: &Host, _via_hosts: &[String]) -> bool {
        self.label
            .as_ref()
            .is_some_and(|label| host.metadata.get(HOST_METADATA_KEY) == Some(label))
    }

    fn on_host_attempted(&mut self, host: &Host) {
        if self.recorded {
            return;
        }
        self.recorded = true;
        self.label = host.metadata.get(HOST_METADATA_KEY).cloned();
        tracing::debug!(host = %host.name, label = ?self.label, "Recorded metadata label to omit");
    }
}

/// Fresh predicate state for one request.
pub fn build(kind: HostPredicateKind) -> Box<dyn HostPredicate> {
    match kind {
        HostPredicateKind::LoopPrevention => Box::new(LoopPrevention),
        HostPredicateKind::OmitCanaryHosts => Box::new(OmitCanaryHosts),
        HostPredicateKind::OmitHostMetadata => Box::new(OmitHostMetadata::default()),
    }
}
