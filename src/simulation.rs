//! Drives logical requests through an aggregate balancer.
//!
//! Each request gets its own [`RequestContext`]; every attempt either
//! succeeds or fails at random, and failed attempts are retried until the
//! policy's retry limit is reached or no host is available.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregate::AggregateBalancer;
use crate::priority::RandomSource;
use crate::retry::RetryPolicy;

/// Outcome counts of a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub requests: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub no_host: u64,
    pub attempts: u64,
    /// Attempts per host name.
    pub picks: BTreeMap<String, u64>,
}

/// Run `requests` logical requests; each attempt fails with `failure_rate`.
pub fn simulate(
    balancer: &AggregateBalancer,
    policy: &RetryPolicy,
    outcomes: &dyn RandomSource,
    requests: u64,
    failure_rate: f64,
) -> Summary {
    let mut summary = Summary {
        requests,
        ..Default::default()
    };

    for _ in 0..requests {
        let mut ctx = policy.new_request();
        let mut retries = 0;

        loop {
            let Some(host) = balancer.choose_host(Some(&mut ctx)) else {
                summary.no_host += 1;
                break;
            };
            summary.attempts += 1;
            *summary.picks.entry(host.name.clone()).or_default() += 1;

            let failed = {
                let _in_flight = host.track_request();
                (outcomes.next_u64() % 10_000) as f64 / 10_000.0 < failure_rate
            };
            ctx.on_host_attempted(&host);

            if !failed {
                summary.succeeded += 1;
                break;
            }
            if retries >= policy.max_retries() {
                tracing::debug!(request_id = %ctx.id(), host = %host.name, "Retries exhausted");
                summary.failed += 1;
                break;
            }
            retries += 1;
        }
    }

    tracing::info!(
        requests = summary.requests,
        succeeded = summary.succeeded,
        failed = summary.failed,
        no_host = summary.no_host,
        "Simulation finished"
    );
    summary
}
