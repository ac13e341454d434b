//! Deferred recovery of failed instances.
//!
//! # State Transitions
//! ```text
//! Failed → Recovering: timer fired, probe in flight
//! Recovering → Standby: probe healthy (Active if the pool has none left,
//!                       always Active for active-active pools)
//! Recovering → Failed: probe unhealthy, optionally re-armed with backoff
//! ```
//!
//! # Design Decisions
//! - At most one pending timer per (service, instance); arming aborts the
//!   previous task and bumps a generation so a stale task can never apply
//! - Timers hold a weak reference; dropping the registry stops them
//! - The probe runs without the pool lock

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{FailoverError, FailoverResult};
use crate::failover::registry::{FailoverRegistry, RegistryInner};
use crate::load_balancer::instance::{Instance, InstanceState};
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// Decides whether a failed instance is healthy again.
#[async_trait]
pub trait RecoveryProbe: Send + Sync {
    async fn probe(&self, instance: &Instance) -> bool;
}

/// Adapts a synchronous closure into a [`RecoveryProbe`].
pub struct FnProbe<F>(pub F);

#[async_trait]
impl<F> RecoveryProbe for FnProbe<F>
where
    F: Fn(&Instance) -> bool + Send + Sync,
{
    async fn probe(&self, instance: &Instance) -> bool {
        (self.0)(instance)
    }
}

/// Identity of a pending recovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecoveryKey {
    pub service: String,
    pub instance: String,
}

impl RecoveryKey {
    pub fn new(service: &str, instance: &str) -> Self {
        Self {
            service: service.to_string(),
            instance: instance.to_string(),
        }
    }
}

impl fmt::Display for RecoveryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.instance)
    }
}

/// What a recovery attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryOutcome {
    /// Probe healthy; the instance is eligible again.
    Recovered,
    /// Probe unhealthy; the instance stays failed.
    StillFailed,
    /// A newer failure or cancellation took over.
    Superseded,
    /// Nothing to recover (instance not failed or gone).
    Skipped,
}

impl RecoveryOutcome {
    fn as_str(self) -> &'static str {
        match self {
            RecoveryOutcome::Recovered => "recovered",
            RecoveryOutcome::StillFailed => "still_failed",
            RecoveryOutcome::Superseded => "superseded",
            RecoveryOutcome::Skipped => "skipped",
        }
    }
}

impl fmt::Display for RecoveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct PendingRecovery {
    generation: u64,
    handle: JoinHandle<()>,
}

pub(crate) struct RecoveryScheduler {
    probe: Arc<dyn RecoveryProbe>,
    /// Runtime the registry was built in; used when the caller has none.
    runtime: Option<Handle>,
    pending: DashMap<RecoveryKey, PendingRecovery>,
    generations: AtomicU64,
}

impl RecoveryScheduler {
    pub(crate) fn new(probe: Arc<dyn RecoveryProbe>) -> Self {
        Self {
            probe,
            runtime: Handle::try_current().ok(),
            pending: DashMap::new(),
            generations: AtomicU64::new(0),
        }
    }

    /// Arm a recovery for `key` after `delay`, superseding any pending one.
    ///
    /// Timers run on the caller's runtime, falling back to the one the
    /// registry was built in. Returns false when neither exists.
    pub(crate) fn arm(&self, inner: &Arc<RegistryInner>, key: RecoveryKey, delay: Duration, attempt: u32) -> bool {
        let Some(runtime) = Handle::try_current().ok().or_else(|| self.runtime.clone()) else {
            tracing::warn!(key = %key, "No async runtime, recovery not scheduled");
            return false;
        };

        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let weak: Weak<RegistryInner> = Arc::downgrade(inner);
        let task_key = key.clone();

        // The entry guard is held until the new task is recorded, so two
        // concurrent arms for one key cannot both survive.
        let entry = self.pending.entry(key);
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                run_recovery(inner, task_key, Some(generation), attempt).await;
            }
        });
        let pending = PendingRecovery { generation, handle };

        match entry {
            Entry::Occupied(mut slot) => {
                let stale = slot.insert(pending);
                stale.handle.abort();
                tracing::debug!(key = %slot.key(), "Pending recovery superseded");
            }
            Entry::Vacant(slot) => {
                slot.insert(pending);
            }
        }

        tracing::debug!(delay_ms = delay.as_millis() as u64, attempt, "Recovery armed");
        true
    }

    fn is_current(&self, key: &RecoveryKey, generation: Option<u64>) -> bool {
        match generation {
            Some(generation) => self
                .pending
                .get(key)
                .is_some_and(|p| p.generation == generation),
            None => true,
        }
    }

    fn finish(&self, key: &RecoveryKey, generation: Option<u64>) {
        if let Some(generation) = generation {
            self.pending.remove_if(key, |_, p| p.generation == generation);
        }
    }

    /// Abort the pending timer for `key`, if any.
    fn cancel(&self, key: &RecoveryKey) -> bool {
        match self.pending.remove(key) {
            Some((_, pending)) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn pending_keys(&self) -> Vec<RecoveryKey> {
        self.pending.iter().map(|p| p.key().clone()).collect()
    }
}

impl RegistryInner {
    /// Cancel a pending recovery and put an interrupted probe back to Failed.
    fn cancel_recovery(&self, key: &RecoveryKey) -> bool {
        let cancelled = self.recovery.cancel(key);
        if let Ok(pool) = self.pool(&key.service) {
            let mut pool = pool.lock();
            if let Some(idx) = pool.position(&key.instance) {
                if pool.instances[idx].state == InstanceState::Recovering {
                    pool.instances[idx].state = InstanceState::Failed;
                }
            }
        }
        cancelled
    }

    async fn probe_and_apply(&self, key: &RecoveryKey, generation: Option<u64>) -> RecoveryOutcome {
        let Ok(pool) = self.pool(&key.service) else {
            return RecoveryOutcome::Skipped;
        };

        let snapshot = {
            let mut pool = pool.lock();
            if !self.recovery.is_current(key, generation) {
                return RecoveryOutcome::Superseded;
            }
            let Some(idx) = pool.position(&key.instance) else {
                return RecoveryOutcome::Skipped;
            };
            match pool.instances[idx].state {
                InstanceState::Failed => {
                    pool.instances[idx].state = InstanceState::Recovering;
                    pool.instances[idx].clone()
                }
                InstanceState::Active | InstanceState::Standby | InstanceState::Recovering => {
                    return RecoveryOutcome::Skipped;
                }
            }
        };

        let healthy = self.recovery.probe.probe(&snapshot).await;

        let mut pool = pool.lock();
        if !self.recovery.is_current(key, generation) {
            return RecoveryOutcome::Superseded;
        }
        let Some(idx) = pool.position(&key.instance) else {
            return RecoveryOutcome::Skipped;
        };
        match pool.instances[idx].state {
            InstanceState::Recovering => {}
            // failed again while the probe ran
            InstanceState::Active | InstanceState::Standby | InstanceState::Failed => {
                return RecoveryOutcome::Superseded;
            }
        }

        if healthy {
            pool.complete_recovery(idx);
            metrics::record_instance_health(&key.service, &key.instance, true);
            tracing::info!(
                service = %key.service,
                instance = %key.instance,
                state = %pool.instances[idx].state,
                "Instance recovered"
            );
            RecoveryOutcome::Recovered
        } else {
            pool.instances[idx].state = InstanceState::Failed;
            tracing::warn!(
                service = %key.service,
                instance = %key.instance,
                failure_count = pool.instances[idx].failure_count,
                "Recovery probe failed, instance remains failed"
            );
            RecoveryOutcome::StillFailed
        }
    }
}

/// Probe, apply the result, and re-arm on failure when configured.
async fn run_recovery(
    inner: Arc<RegistryInner>,
    key: RecoveryKey,
    generation: Option<u64>,
    attempt: u32,
) -> RecoveryOutcome {
    let outcome = inner.probe_and_apply(&key, generation).await;
    inner.recovery.finish(&key, generation);
    metrics::record_recovery(&key.service, outcome.as_str());

    // Manual recoveries (no generation) never re-arm.
    if outcome == RecoveryOutcome::StillFailed && generation.is_some() {
        let config = &inner.config;
        let next_attempt = attempt + 1;
        if config.rearm_on_recovery_failure && next_attempt < config.max_retries {
            let delay = calculate_backoff(next_attempt, config.rearm_base_delay_ms, config.rearm_max_delay_ms);
            inner.recovery.arm(&inner, key, delay, next_attempt);
        } else if config.rearm_on_recovery_failure {
            tracing::warn!(
                key = %key,
                attempts = next_attempt,
                "Recovery attempts exhausted"
            );
        }
    }
    outcome
}

impl FailoverRegistry {
    /// Arm a recovery timer for a failed instance, superseding any pending one.
    ///
    /// Returns `Ok(false)` when auto recovery is disabled or no async runtime
    /// is available.
    pub fn schedule_recovery(&self, service: &str, instance_id: &str) -> FailoverResult<bool> {
        self.get_instance(service, instance_id)?;
        if !self.inner.config.enable_auto_recovery {
            return Ok(false);
        }
        let key = RecoveryKey::new(service, instance_id);
        self.inner.cancel_recovery(&key);
        Ok(self
            .inner
            .recovery
            .arm(&self.inner, key, self.inner.config.recovery_timeout(), 0))
    }

    /// Cancel any pending timer and probe the instance immediately.
    pub async fn recover_now(&self, service: &str, instance_id: &str) -> FailoverResult<RecoveryOutcome> {
        let pool = self.inner.pool(service)?;
        if pool.lock().position(instance_id).is_none() {
            return Err(FailoverError::instance_not_found(service, instance_id));
        }
        let key = RecoveryKey::new(service, instance_id);
        self.inner.cancel_recovery(&key);
        Ok(run_recovery(self.inner.clone(), key, None, 0).await)
    }

    /// Number of armed recovery timers.
    pub fn pending_recoveries(&self) -> usize {
        self.inner.recovery.pending_count()
    }

    /// Cancel every pending recovery timer.
    pub fn shutdown(&self) {
        let keys = self.inner.recovery.pending_keys();
        let cancelled = keys
            .iter()
            .filter(|key| self.inner.cancel_recovery(key))
            .count();
        tracing::info!(cancelled, "Pending recoveries cancelled");
    }
}
