//! Failure handling.
//!
//! # Flow
//! ```text
//! report_failure(service, id)
//!     → [pool lock] mark Failed, count, record event
//!     → [pool lock] choose replacement, promote, transfer connections
//!     → callbacks (lock released)
//!     → arm recovery timer
//! ```

use std::time::Instant;

use crate::config::Strategy;
use crate::error::{FailoverError, FailoverResult};
use crate::failover::events::FailoverEvent;
use crate::failover::recovery::RecoveryKey;
use crate::failover::registry::FailoverRegistry;
use crate::load_balancer::instance::{Instance, InstanceState};
use crate::load_balancer::pool::Pool;
use crate::observability::metrics;

/// Reason recorded when the caller gives none.
pub const DEFAULT_FAILURE_REASON: &str = "reported unhealthy";

/// Pick the instance that takes over from `failed`.
///
/// Candidates are healthy instances other than `failed`. Active-passive
/// pools keep a surviving designated active; otherwise they prefer standbys.
/// Ties on `failure_count` go to registration order.
pub(crate) fn choose_replacement(pool: &Pool, failed: usize) -> Option<usize> {
    let candidates = || {
        pool.instances
            .iter()
            .enumerate()
            .filter(move |(idx, i)| *idx != failed && i.is_healthy())
    };

    match pool.strategy {
        Strategy::ActivePassive => {
            if let Some(active) = pool.designated.filter(|&idx| idx != failed) {
                return Some(active);
            }
            least_failed(candidates().filter(|(_, i)| i.state == InstanceState::Standby))
                .or_else(|| least_failed(candidates()))
        }
        Strategy::ActiveActive | Strategy::RoundRobin => least_failed(candidates()),
    }
}

fn least_failed<'a>(candidates: impl Iterator<Item = (usize, &'a Instance)>) -> Option<usize> {
    candidates
        .min_by_key(|(_, i)| i.failure_count)
        .map(|(idx, _)| idx)
}

impl FailoverRegistry {
    /// Report a failed instance and fail over to a replacement.
    pub fn report_failure(&self, service: &str, instance_id: &str) -> FailoverResult<Instance> {
        self.report_failure_with_reason(service, instance_id, DEFAULT_FAILURE_REASON)
    }

    /// Like [`report_failure`](Self::report_failure) with an explicit reason
    /// for the event log.
    pub fn report_failure_with_reason(
        &self,
        service: &str,
        instance_id: &str,
        reason: &str,
    ) -> FailoverResult<Instance> {
        let started = Instant::now();
        let pool = self.inner.pool(service)?;

        let (failed, replacement) = {
            let mut pool = pool.lock();
            let failed_idx = pool
                .position(instance_id)
                .ok_or_else(|| FailoverError::instance_not_found(service, instance_id))?;

            pool.mark_failed(failed_idx);
            self.inner
                .events
                .record(FailoverEvent::new(service, instance_id, reason));
            metrics::record_failover(service);
            metrics::record_instance_health(service, instance_id, false);

            let Some(replacement_idx) = choose_replacement(&pool, failed_idx) else {
                tracing::error!(
                    severity = "critical",
                    service = %service,
                    failed = %instance_id,
                    failure_count = pool.instances[failed_idx].failure_count,
                    reason = %reason,
                    "No replacement available, service has lost all redundancy"
                );
                metrics::record_no_replacement(service);
                return Err(FailoverError::NoReplacementAvailable {
                    service: service.to_string(),
                    failed: instance_id.to_string(),
                });
            };

            pool.fail_over(failed_idx, replacement_idx);
            metrics::record_instance_health(service, &pool.instances[replacement_idx].id, true);
            (
                pool.instances[failed_idx].clone(),
                pool.instances[replacement_idx].clone(),
            )
        };

        tracing::info!(
            service = %service,
            failed = %failed.id,
            replacement = %replacement.id,
            failure_count = failed.failure_count,
            transferred_connections = replacement.active_connections,
            reason = %reason,
            "Failover completed"
        );

        let callback_errors = self.inner.callbacks.invoke(service, &failed, &replacement);

        let elapsed = started.elapsed();
        if elapsed > self.inner.config.failover_timeout() {
            tracing::warn!(
                service = %service,
                elapsed_ms = elapsed.as_millis() as u64,
                timeout_secs = self.inner.config.failover_timeout_secs,
                callback_errors,
                "Failover exceeded its timeout"
            );
        }

        if self.inner.config.enable_auto_recovery {
            self.inner.recovery.arm(
                &self.inner,
                RecoveryKey::new(service, &failed.id),
                self.inner.config.recovery_timeout(),
                0,
            );
        }

        Ok(replacement)
    }
}
