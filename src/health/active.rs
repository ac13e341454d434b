//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every eligible instance
//! - Stamp `last_health_check` on each probe
//! - Report a failure after `unhealthy_threshold` consecutive failed probes
//!
//! Failed and recovering instances are left to the recovery scheduler.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::error::FailoverError;
use crate::failover::{FailoverRegistry, RecoveryProbe};

pub struct HealthMonitor {
    registry: FailoverRegistry,
    config: HealthCheckConfig,
    interval: Duration,
    probe: Arc<dyn RecoveryProbe>,
    /// Consecutive failed probes per (service, instance).
    failures: HashMap<(String, String), u32>,
}

impl HealthMonitor {
    pub fn new(registry: FailoverRegistry, config: HealthCheckConfig, probe: Arc<dyn RecoveryProbe>) -> Self {
        let interval = registry.config().health_check_interval();
        Self {
            registry,
            config,
            interval,
            probe,
            failures: HashMap::new(),
        }
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            path = %self.config.path,
            unhealthy_threshold = self.config.unhealthy_threshold,
            "Health monitor starting"
        );

        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn check_all(&mut self) {
        let pools: Vec<_> = self
            .registry
            .pool_names()
            .iter()
            .filter_map(|service| self.registry.get_pool(service).ok())
            .collect();

        // Counts only carry over while an instance stays in rotation.
        let eligible: HashSet<(String, String)> = pools
            .iter()
            .flat_map(|pool| {
                pool.instances
                    .iter()
                    .filter(|i| i.is_healthy())
                    .map(move |i| (pool.service.clone(), i.id.clone()))
            })
            .collect();
        self.failures.retain(|key, _| eligible.contains(key));

        for pool in &pools {
            let service = &pool.service;
            for instance in pool.instances.iter().filter(|i| i.is_healthy()) {
                let healthy = self.probe.probe(instance).await;
                // the instance may have been removed from rotation meanwhile
                let _ = self.registry.record_health_check(service, &instance.id);

                let key = (service.clone(), instance.id.clone());
                if healthy {
                    self.failures.remove(&key);
                    continue;
                }

                let count = self.failures.entry(key.clone()).or_insert(0);
                *count += 1;
                if *count < self.config.unhealthy_threshold {
                    tracing::debug!(service = %service, instance = %instance.id, consecutive_failures = *count, "Health check failed");
                    continue;
                }

                let reason = format!("{} consecutive health checks failed", count);
                self.failures.remove(&key);
                match self.registry.report_failure_with_reason(service, &instance.id, &reason) {
                    Ok(replacement) => {
                        tracing::info!(service = %service, failed = %instance.id, replacement = %replacement.id, "Health monitor triggered failover");
                    }
                    // already logged as critical by the registry
                    Err(FailoverError::NoReplacementAvailable { .. }) => {}
                    Err(e) => {
                        tracing::warn!(service = %service, instance = %instance.id, error = %e, "Failed to report unhealthy instance");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FailoverConfig, Strategy};
    use crate::failover::FnProbe;
    use crate::load_balancer::instance::{Instance, InstanceState};

    fn setup(threshold: u32) -> (FailoverRegistry, HealthMonitor) {
        let config = FailoverConfig {
            strategy: Strategy::ActivePassive,
            health_check_interval_secs: 1,
            enable_auto_recovery: false,
            ..FailoverConfig::default()
        };
        let registry = FailoverRegistry::new(config, Arc::new(FnProbe(|_: &Instance| true)));
        registry
            .register_pool(
                "db",
                vec![Instance::new("a", "10.0.0.1", 5432), Instance::new("b", "10.0.0.2", 5432)],
            )
            .unwrap();

        let monitor = HealthMonitor::new(
            registry.clone(),
            HealthCheckConfig {
                unhealthy_threshold: threshold,
                ..HealthCheckConfig::default()
            },
            Arc::new(FnProbe(|i: &Instance| i.id != "a")),
        );
        (registry, monitor)
    }

    #[tokio::test]
    async fn test_threshold_triggers_failover() {
        let (registry, mut monitor) = setup(2);

        monitor.check_all().await;
        assert_eq!(registry.get_instance("db", "a").unwrap().state, InstanceState::Active);
        assert!(registry.get_instance("db", "b").unwrap().last_health_check.is_some());

        monitor.check_all().await;
        assert_eq!(registry.get_instance("db", "a").unwrap().state, InstanceState::Failed);
        assert_eq!(registry.select_active("db").unwrap().id, "b");

        let events = registry.recent_events(1);
        assert_eq!(events[0].reason, "2 consecutive health checks failed");
    }

    #[tokio::test]
    async fn test_failed_instances_not_probed() {
        let (registry, mut monitor) = setup(1);
        monitor.check_all().await;
        monitor.check_all().await;
        // a failed once and is then left to recovery
        assert_eq!(registry.get_instance("db", "a").unwrap().failure_count, 1);
    }

    #[tokio::test]
    async fn test_streak_reset_when_instance_leaves_rotation() {
        let (registry, mut monitor) = setup(2);

        monitor.check_all().await;
        // taken out of rotation by another reporter mid-streak
        registry.report_failure("db", "a").unwrap();
        monitor.check_all().await;
        registry.recover_now("db", "a").await.unwrap();
        assert_eq!(registry.get_instance("db", "a").unwrap().state, InstanceState::Standby);

        // one failed check after recovery is below the threshold
        monitor.check_all().await;
        assert_eq!(registry.get_instance("db", "a").unwrap().state, InstanceState::Standby);

        monitor.check_all().await;
        assert_eq!(registry.get_instance("db", "a").unwrap().state, InstanceState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let (registry, monitor) = setup(3);
        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(monitor.run(rx));

        // ticks at 0s, 1s, 2s
        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(registry.get_instance("db", "a").unwrap().state, InstanceState::Failed);

        tx.send(()).unwrap();
        task.await.unwrap();
    }
}
