//! Topology changes flowing into the aggregate balancer.

use std::sync::Arc;

use tiered_balancer::config::parse_config;
use tiered_balancer::priority::FixedSequence;
use tiered_balancer::topology::HealthState;
use tiered_balancer::{Shutdown, TopologyFeed};

mod common;

const BOTH: &str = r#"
    [aggregate]
    pools = ["primary", "backup"]

    [[pools]]
    name = "primary"
    tiers = [
        { hosts = [{ name = "p1", address = "10.0.0.1:80" }, { name = "p2", address = "10.0.0.2:80" }] },
        { hosts = [] },
        { hosts = [{ name = "p3", address = "10.0.0.3:80" }] },
    ]

    [[pools]]
    name = "backup"
    tiers = [{ hosts = [{ name = "b1", address = "10.0.1.1:80" }] }]
"#;

const PRIMARY_ONLY: &str = r#"
    [aggregate]
    pools = ["primary", "backup"]

    [[pools]]
    name = "primary"
    tiers = [{ hosts = [{ name = "p1", address = "10.0.0.1:80" }] }]
"#;

#[tokio::test]
async fn test_feed_task_relinearizes() {
    let registry = Arc::new(tiered_balancer::PoolRegistry::new());
    let lb = common::aggregate(&registry, &["primary", "backup"], FixedSequence::constant(0));
    assert!(lb.table().is_empty());

    let shutdown = Shutdown::new();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let task = tokio::spawn(TopologyFeed::new(registry.clone()).run(rx, shutdown.subscribe()));

    tx.send(parse_config(BOTH).unwrap()).unwrap();
    assert!(common::eventually(|| lb.table().len() == 3).await);
    let table = lb.table();
    assert_eq!(table.linear_index("primary", 0), Some(0));
    assert_eq!(table.linear_index("primary", 2), Some(1));
    assert_eq!(table.linear_index("backup", 0), Some(2));

    tx.send(parse_config(PRIMARY_ONLY).unwrap()).unwrap();
    assert!(common::eventually(|| lb.table().len() == 1).await);
    assert_eq!(lb.table().linear_index("backup", 0), None);

    shutdown.trigger();
    task.await.unwrap();
}

#[tokio::test]
async fn test_feed_task_exits_when_channel_closes() {
    let registry = Arc::new(tiered_balancer::PoolRegistry::new());
    let shutdown = Shutdown::new();
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let task = tokio::spawn(TopologyFeed::new(registry).run(rx, shutdown.subscribe()));

    drop(tx);
    task.await.unwrap();
}

#[test]
fn test_old_snapshot_survives_removal() {
    let registry = common::registry_with(vec![
        common::pool("primary", &[&["p1"]]),
        common::pool("backup", &[&["b1"]]),
    ]);
    let lb = common::aggregate(&registry, &["primary", "backup"], FixedSequence::constant(0));

    let before = lb.table();
    registry.remove("backup");
    let after = lb.table();

    assert_eq!(before.len(), 2);
    assert_eq!(before.tier(1).unwrap().pool().name(), "backup");
    assert_eq!(after.len(), 1);
    assert!(after.generation() > before.generation());
}

#[test]
fn test_generation_increments_per_member_event() {
    let registry = common::registry_with(Vec::new());
    let lb = common::aggregate(&registry, &["primary"], FixedSequence::constant(0));
    let start = lb.table().generation();

    registry.upsert(common::pool("primary", &[&["p1"]]));
    registry.upsert(common::pool("primary", &[&["p1", "p2"]]));
    registry.upsert(common::pool("unrelated", &[&["u1"]]));

    assert_eq!(lb.table().generation(), start + 2);
    assert_eq!(lb.table().tier(0).unwrap().tier().len(), 2);
}

#[test]
fn test_health_change_shifts_default_load() {
    let registry = common::registry_with(vec![common::pool("p", &[&["a", "b"], &["c"]])]);
    let lb = common::aggregate(&registry, &["p"], FixedSequence::constant(0));
    assert_eq!(lb.table().default_load().healthy, vec![100, 0]);

    registry.set_host_health("p", "a", HealthState::Unhealthy).unwrap();
    assert_eq!(lb.table().default_load().healthy, vec![70, 30]);

    registry.set_host_health("p", "b", HealthState::Degraded).unwrap();
    let load = lb.table().default_load().clone();
    assert_eq!(load.healthy, vec![0, 100]);
    assert_eq!(load.degraded, vec![0, 0]);
    assert_eq!(lb.choose_host(None).unwrap().name, "c");
}

#[test]
fn test_unknown_host_health_is_an_error() {
    let registry = common::registry_with(vec![common::pool("p", &[&["a"]])]);
    assert!(registry.set_host_health("p", "nope", HealthState::Degraded).is_err());
    assert!(registry.set_host_health("missing", "a", HealthState::Degraded).is_err());
}
