//! Health monitor and HTTP probe against live mock backends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use failover_control::config::{FailoverConfig, HealthCheckConfig, Strategy};
use failover_control::health::{HealthMonitor, HttpProbe};
use failover_control::lifecycle::Shutdown;
use failover_control::{FailoverRegistry, Instance, InstanceState, RecoveryOutcome, RecoveryProbe};

mod common;

async fn toggled_backend(healthy: Arc<AtomicBool>) -> u16 {
    let addr = common::start_programmable_backend(move || {
        let healthy = healthy.clone();
        async move {
            if healthy.load(Ordering::SeqCst) {
                200
            } else {
                503
            }
        }
    })
    .await;
    addr.port()
}

fn health_config() -> HealthCheckConfig {
    HealthCheckConfig {
        enabled: true,
        path: "/health".to_string(),
        timeout_secs: 1,
        unhealthy_threshold: 2,
    }
}

#[tokio::test]
async fn test_http_probe_follows_backend_status() {
    let healthy = Arc::new(AtomicBool::new(true));
    let port = toggled_backend(healthy.clone()).await;
    let probe = HttpProbe::new(&health_config());
    let instance = Instance::new("a", "127.0.0.1", port);

    assert!(probe.probe(&instance).await);
    healthy.store(false, Ordering::SeqCst);
    assert!(!probe.probe(&instance).await);
}

#[tokio::test]
async fn test_monitor_fails_over_and_http_recovery_restores() {
    let primary_up = Arc::new(AtomicBool::new(false));
    let primary = toggled_backend(primary_up.clone()).await;
    let secondary = toggled_backend(Arc::new(AtomicBool::new(true))).await;

    let config = FailoverConfig {
        strategy: Strategy::ActivePassive,
        health_check_interval_secs: 1,
        enable_auto_recovery: false,
        ..FailoverConfig::default()
    };
    let probe: Arc<dyn RecoveryProbe> = Arc::new(HttpProbe::new(&health_config()));
    let registry = FailoverRegistry::new(config, probe.clone());
    registry
        .register_pool(
            "db",
            vec![
                Instance::new("primary", "127.0.0.1", primary),
                Instance::new("secondary", "127.0.0.1", secondary),
            ],
        )
        .unwrap();

    let shutdown = Shutdown::new(registry.clone());
    let monitor = HealthMonitor::new(registry.clone(), health_config(), probe);
    let task = tokio::spawn(monitor.run(shutdown.subscribe()));

    // ticks at 0s and 1s reach the threshold of two
    let mut failed_over = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if registry.get_instance("db", "primary").unwrap().state == InstanceState::Failed {
            failed_over = true;
            break;
        }
    }
    assert!(failed_over, "primary never failed over");
    assert_eq!(registry.select_active("db").unwrap().id, "secondary");

    primary_up.store(true, Ordering::SeqCst);
    assert_eq!(
        registry.recover_now("db", "primary").await.unwrap(),
        RecoveryOutcome::Recovered
    );
    assert_eq!(registry.get_instance("db", "primary").unwrap().state, InstanceState::Standby);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}
