//! Recovery timer behaviour under paused Tokio time.

use std::time::Duration;

use tokio::time::sleep;

use failover_control::config::{FailoverConfig, Strategy};
use failover_control::{InstanceState, RecoveryOutcome};

mod common;

fn rearming() -> FailoverConfig {
    FailoverConfig {
        rearm_on_recovery_failure: true,
        rearm_base_delay_ms: 1_000,
        rearm_max_delay_ms: 60_000,
        max_retries: 3,
        ..common::config(Strategy::ActivePassive)
    }
}

#[tokio::test(start_paused = true)]
async fn test_recovery_round_trip() {
    let (registry, probe) = common::registry_with(common::config(Strategy::ActivePassive));
    registry
        .register_pool("db", common::instances(&["a", "b", "c"]))
        .unwrap();

    assert_eq!(registry.report_failure("db", "a").unwrap().id, "b");
    assert_eq!(registry.pending_recoveries(), 1);

    sleep(Duration::from_secs(59)).await;
    assert_eq!(probe.calls(), 0);
    assert_eq!(registry.get_instance("db", "a").unwrap().state, InstanceState::Failed);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(probe.calls(), 1);
    let a = registry.get_instance("db", "a").unwrap();
    assert_eq!(a.state, InstanceState::Standby);
    assert_eq!(a.failure_count, 0);
    assert_eq!(registry.pending_recoveries(), 0);

    // b kept serving throughout
    assert_eq!(registry.select_active("db").unwrap().id, "b");
    assert_eq!(registry.get_pool_status("db").unwrap().active, 1);
}

#[tokio::test(start_paused = true)]
async fn test_repeat_failure_supersedes_pending_timer() {
    let (registry, probe) = common::registry_with(common::config(Strategy::ActivePassive));
    registry
        .register_pool("db", common::instances(&["a", "b"]))
        .unwrap();

    registry.report_failure("db", "a").unwrap();
    sleep(Duration::from_secs(30)).await;

    // a fails again before its timer fires
    registry.report_failure("db", "a").unwrap();
    assert_eq!(registry.pending_recoveries(), 1);
    assert_eq!(registry.get_instance("db", "a").unwrap().failure_count, 2);

    // the first timer would have fired here
    sleep(Duration::from_secs(31)).await;
    assert_eq!(probe.calls(), 0);
    assert_eq!(registry.get_instance("db", "a").unwrap().state, InstanceState::Failed);

    sleep(Duration::from_secs(30)).await;
    assert_eq!(probe.calls(), 1);
    assert_eq!(registry.get_instance("db", "a").unwrap().state, InstanceState::Standby);
    assert_eq!(registry.pending_recoveries(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_probe_is_not_rescheduled_by_default() {
    let (registry, probe) = common::registry_with(common::config(Strategy::ActivePassive));
    registry
        .register_pool("db", common::instances(&["a", "b"]))
        .unwrap();
    probe.set_healthy("a", false);

    registry.report_failure("db", "a").unwrap();
    sleep(Duration::from_secs(61)).await;
    assert_eq!(probe.calls(), 1);

    sleep(Duration::from_secs(600)).await;
    assert_eq!(probe.calls(), 1);
    let a = registry.get_instance("db", "a").unwrap();
    assert_eq!(a.state, InstanceState::Failed);
    assert_eq!(a.failure_count, 1);
    assert_eq!(registry.pending_recoveries(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_rearm_with_backoff_until_exhausted() {
    let (registry, probe) = common::registry_with(rearming());
    registry
        .register_pool("db", common::instances(&["a", "b"]))
        .unwrap();
    probe.set_healthy("a", false);

    registry.report_failure("db", "a").unwrap();

    sleep(Duration::from_secs(60) + Duration::from_millis(500)).await;
    assert_eq!(probe.calls(), 1);
    assert_eq!(registry.pending_recoveries(), 1);

    // second attempt after ~1s, third after ~2s more
    sleep(Duration::from_secs(10)).await;
    assert_eq!(probe.calls(), 3);
    assert_eq!(registry.pending_recoveries(), 0);

    sleep(Duration::from_secs(600)).await;
    assert_eq!(probe.calls(), 3);
    assert_eq!(registry.get_instance("db", "a").unwrap().state, InstanceState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_rearm_recovers_once_probe_passes() {
    let (registry, probe) = common::registry_with(rearming());
    registry
        .register_pool("db", common::instances(&["a", "b"]))
        .unwrap();
    probe.set_healthy("a", false);

    registry.report_failure("db", "a").unwrap();
    sleep(Duration::from_secs(60) + Duration::from_millis(500)).await;
    assert_eq!(probe.calls(), 1);

    probe.set_healthy("a", true);
    sleep(Duration::from_secs(5)).await;
    assert_eq!(probe.calls(), 2);
    assert_eq!(registry.get_instance("db", "a").unwrap().state, InstanceState::Standby);
    assert_eq!(registry.pending_recoveries(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_restores_active_after_total_outage() {
    let (registry, probe) = common::registry_with(common::config(Strategy::ActivePassive));
    registry.register_pool("db", common::instances(&["solo"])).unwrap();
    probe.set_healthy("solo", true);

    assert!(registry.report_failure("db", "solo").is_err());
    // nothing armed without a replacement
    assert_eq!(registry.pending_recoveries(), 0);

    assert!(registry.schedule_recovery("db", "solo").unwrap());
    sleep(Duration::from_secs(61)).await;

    let solo = registry.get_instance("db", "solo").unwrap();
    assert_eq!(solo.state, InstanceState::Active);
    assert_eq!(registry.select_active("db").unwrap().id, "solo");
}

#[tokio::test(start_paused = true)]
async fn test_active_active_recovery_rejoins_rotation() {
    let (registry, _) = common::registry_with(common::config(Strategy::RoundRobin));
    registry
        .register_pool("api", common::instances(&["r1", "r2"]))
        .unwrap();

    registry.report_failure("api", "r1").unwrap();
    assert_eq!(registry.select_active("api").unwrap().id, "r2");

    sleep(Duration::from_secs(61)).await;
    assert_eq!(registry.get_instance("api", "r1").unwrap().state, InstanceState::Active);
    assert_eq!(registry.get_pool_status("api").unwrap().active, 2);
}

#[tokio::test(start_paused = true)]
async fn test_manual_recovery_cancels_timer() {
    let (registry, probe) = common::registry_with(common::config(Strategy::ActivePassive));
    registry
        .register_pool("db", common::instances(&["a", "b"]))
        .unwrap();

    registry.report_failure("db", "a").unwrap();
    assert_eq!(
        registry.recover_now("db", "a").await.unwrap(),
        RecoveryOutcome::Recovered
    );
    assert_eq!(registry.pending_recoveries(), 0);

    sleep(Duration::from_secs(120)).await;
    assert_eq!(probe.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_registry_stops_timers() {
    let (registry, probe) = common::registry_with(common::config(Strategy::ActivePassive));
    registry
        .register_pool("db", common::instances(&["a", "b"]))
        .unwrap();
    registry.report_failure("db", "a").unwrap();
    drop(registry);

    sleep(Duration::from_secs(120)).await;
    assert_eq!(probe.calls(), 0);
}
