//! Read-only status views.

use std::time::{Duration, SystemTime};

use serde::Serialize;

use crate::config::Strategy;
use crate::error::FailoverResult;
use crate::failover::registry::FailoverRegistry;
use crate::load_balancer::instance::InstanceState;

const ROLLING_WINDOW: Duration = Duration::from_secs(3600);

/// Per-pool state counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub service: String,
    pub strategy: Strategy,
    pub total: usize,
    pub active: usize,
    pub standby: usize,
    pub failed: usize,
    pub recovering: usize,
    /// Designated active instance (active-passive only).
    pub active_instance: Option<String>,
    /// Failover events ever recorded for this service.
    pub failover_events: u64,
}

/// Aggregate metrics across every registered pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailoverMetrics {
    pub total_failovers: u64,
    pub failovers_last_hour: u64,
    pub healthy_instances: usize,
    pub total_instances: usize,
    /// `healthy / total * 100`; 0 when no instance is registered.
    pub uptime_percentage: f64,
    pub pending_recoveries: usize,
}

impl FailoverRegistry {
    pub fn get_pool_status(&self, service: &str) -> FailoverResult<PoolStatus> {
        let pool = self.inner.pool(service)?;
        let pool = pool.lock();
        Ok(PoolStatus {
            service: pool.service.clone(),
            strategy: pool.strategy,
            total: pool.instances.len(),
            active: pool.count_in(InstanceState::Active),
            standby: pool.count_in(InstanceState::Standby),
            failed: pool.count_in(InstanceState::Failed),
            recovering: pool.count_in(InstanceState::Recovering),
            active_instance: match pool.strategy {
                Strategy::ActivePassive => pool.designated.map(|idx| pool.instances[idx].id.clone()),
                Strategy::ActiveActive | Strategy::RoundRobin => None,
            },
            failover_events: pool.event_count,
        })
    }

    pub fn get_failover_metrics(&self) -> FailoverMetrics {
        // Collect handles first so no map shard is held while pools are locked.
        let pools: Vec<_> = self.inner.pools.iter().map(|p| p.value().clone()).collect();

        let (healthy, total) = pools.iter().fold((0, 0), |(healthy, total), pool| {
            let pool = pool.lock();
            (healthy + pool.healthy_count(), total + pool.instances.len())
        });

        let uptime_percentage = if total > 0 {
            healthy as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        FailoverMetrics {
            total_failovers: self.inner.events.total(),
            failovers_last_hour: self.inner.events.count_within(ROLLING_WINDOW, SystemTime::now()),
            healthy_instances: healthy,
            total_instances: total,
            uptime_percentage,
            pending_recoveries: self.inner.recovery.pending_count(),
        }
    }
}
