//! Pool registry.
//!
//! # Responsibilities
//! - Own every pool, callback list, pending recovery and the event log
//! - Register pools and assign initial states
//! - Serve snapshots and selections
//!
//! # Design Decisions
//! - One mutex per service: services fail over independently, operations on
//!   one service never interleave
//! - The registry is a cheap `Clone` handle over shared state; there is no
//!   global instance
//! - Callers only ever receive owned snapshots

use std::sync::Arc;
use std::time::SystemTime;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::config::FailoverConfig;
use crate::error::{FailoverError, FailoverResult};
use crate::failover::callbacks::{CallbackRegistry, FailoverCallback};
use crate::failover::events::{EventLog, FailoverEvent};
use crate::failover::recovery::{RecoveryProbe, RecoveryScheduler};
use crate::load_balancer::instance::Instance;
use crate::load_balancer::pool::{Pool, PoolSnapshot};
use crate::observability::metrics;

/// Shared state behind a [`FailoverRegistry`] handle.
pub(crate) struct RegistryInner {
    pub(crate) config: FailoverConfig,
    pub(crate) pools: DashMap<String, Arc<Mutex<Pool>>>,
    pub(crate) callbacks: CallbackRegistry,
    pub(crate) events: EventLog,
    pub(crate) recovery: RecoveryScheduler,
}

impl RegistryInner {
    pub(crate) fn pool(&self, service: &str) -> FailoverResult<Arc<Mutex<Pool>>> {
        self.pools
            .get(service)
            .map(|p| p.value().clone())
            .ok_or_else(|| FailoverError::pool_not_found(service))
    }
}

/// Handle to the failover control state.
///
/// Built once at startup and cloned into every consumer.
#[derive(Clone)]
pub struct FailoverRegistry {
    pub(crate) inner: Arc<RegistryInner>,
}

impl FailoverRegistry {
    /// Create an empty registry.
    ///
    /// `probe` decides whether a failed instance is healthy again when a
    /// recovery timer fires.
    pub fn new(config: FailoverConfig, probe: Arc<dyn RecoveryProbe>) -> Self {
        let events = EventLog::new(config.event_log_capacity);
        Self {
            inner: Arc::new(RegistryInner {
                config,
                pools: DashMap::new(),
                callbacks: CallbackRegistry::default(),
                events,
                recovery: RecoveryScheduler::new(probe),
            }),
        }
    }

    pub fn config(&self) -> &FailoverConfig {
        &self.inner.config
    }

    /// Register a pool; initial states come from the configured strategy.
    pub fn register_pool(&self, service: &str, instances: Vec<Instance>) -> FailoverResult<()> {
        for (idx, instance) in instances.iter().enumerate() {
            if instances[..idx].iter().any(|other| other.id == instance.id) {
                return Err(FailoverError::DuplicateInstance {
                    service: service.to_string(),
                    instance: instance.id.clone(),
                });
            }
        }

        match self.inner.pools.entry(service.to_string()) {
            Entry::Occupied(_) => Err(FailoverError::DuplicateService {
                service: service.to_string(),
            }),
            Entry::Vacant(slot) => {
                let pool = Pool::new(service, self.inner.config.strategy, instances);
                for instance in &pool.instances {
                    metrics::record_instance_health(service, &instance.id, instance.is_healthy());
                }
                tracing::info!(
                    service = %service,
                    strategy = %pool.strategy,
                    instances = pool.instances.len(),
                    active = ?pool.designated.map(|idx| pool.instances[idx].id.as_str()),
                    "Pool registered"
                );
                slot.insert(Arc::new(Mutex::new(pool)));
                Ok(())
            }
        }
    }

    /// Snapshot of a registered pool.
    pub fn get_pool(&self, service: &str) -> FailoverResult<PoolSnapshot> {
        let pool = self.inner.pool(service)?;
        let snapshot = pool.lock().snapshot();
        Ok(snapshot)
    }

    /// Registered service names, sorted.
    pub fn pool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.pools.iter().map(|p| p.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshot of a single instance.
    pub fn get_instance(&self, service: &str, instance_id: &str) -> FailoverResult<Instance> {
        self.with_instance(service, instance_id, |instance| instance.clone())
    }

    /// Instance that should currently serve a request for `service`.
    pub fn select_active(&self, service: &str) -> FailoverResult<Instance> {
        let pool = self.inner.pool(service)?;
        let pool = pool.lock();
        match pool.select() {
            Some(idx) => {
                let instance = pool.instances[idx].clone();
                tracing::debug!(service = %service, instance = %instance.id, "Instance selected");
                Ok(instance)
            }
            None => {
                tracing::debug!(
                    service = %service,
                    instance_count = pool.instances.len(),
                    "No healthy instance found in pool"
                );
                Err(FailoverError::NoHealthyInstance {
                    service: service.to_string(),
                })
            }
        }
    }

    /// Set the load counter used by least-connections selection.
    pub fn set_active_connections(
        &self,
        service: &str,
        instance_id: &str,
        active_connections: u64,
    ) -> FailoverResult<()> {
        self.with_instance(service, instance_id, |instance| {
            instance.active_connections = active_connections;
        })
    }

    /// Stamp the time of the latest external health check.
    pub fn record_health_check(&self, service: &str, instance_id: &str) -> FailoverResult<()> {
        self.with_instance(service, instance_id, |instance| {
            instance.last_health_check = Some(SystemTime::now());
        })
    }

    /// Append a failover callback for `service`.
    ///
    /// The service does not need to be registered yet.
    pub fn register_callback<C>(&self, service: &str, callback: C)
    where
        C: FailoverCallback + 'static,
    {
        self.inner.callbacks.register(service, Arc::new(callback));
    }

    /// Number of callbacks registered for `service`.
    pub fn callback_count(&self, service: &str) -> usize {
        self.inner.callbacks.count(service)
    }

    /// Up to `limit` retained failover events, newest first.
    pub fn recent_events(&self, limit: usize) -> Vec<FailoverEvent> {
        self.inner.events.recent(limit)
    }

    fn with_instance<T>(
        &self,
        service: &str,
        instance_id: &str,
        f: impl FnOnce(&mut Instance) -> T,
    ) -> FailoverResult<T> {
        let pool = self.inner.pool(service)?;
        let mut pool = pool.lock();
        let idx = pool
            .position(instance_id)
            .ok_or_else(|| FailoverError::instance_not_found(service, instance_id))?;
        Ok(f(&mut pool.instances[idx]))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Strategy;
    use crate::failover::recovery::FnProbe;
    use crate::load_balancer::instance::InstanceState;

    pub(crate) fn registry(strategy: Strategy) -> FailoverRegistry {
        let config = FailoverConfig {
            strategy,
            enable_auto_recovery: false,
            ..FailoverConfig::default()
        };
        FailoverRegistry::new(config, Arc::new(FnProbe(|_: &Instance| true)))
    }

    pub(crate) fn instances(ids: &[&str]) -> Vec<Instance> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| Instance::new(*id, "10.0.0.1", 5000 + i as u16))
            .collect()
    }

    #[test]
    fn test_register_and_get_pool() {
        let registry = registry(Strategy::ActivePassive);
        registry.register_pool("db", instances(&["a", "b"])).unwrap();

        let pool = registry.get_pool("db").unwrap();
        assert_eq!(pool.designated_active.as_deref(), Some("a"));
        assert_eq!(pool.instance("b").unwrap().state, InstanceState::Standby);
        assert_eq!(registry.pool_names(), vec!["db".to_string()]);
    }

    #[test]
    fn test_register_duplicate_service() {
        let registry = registry(Strategy::ActivePassive);
        registry.register_pool("db", instances(&["a"])).unwrap();
        let err = registry.register_pool("db", instances(&["b"])).unwrap_err();
        assert_eq!(err, FailoverError::DuplicateService { service: "db".into() });
        // the original pool is untouched
        assert!(registry.get_pool("db").unwrap().instance("a").is_some());
    }

    #[test]
    fn test_register_duplicate_instance() {
        let registry = registry(Strategy::RoundRobin);
        let err = registry.register_pool("db", instances(&["a", "a"])).unwrap_err();
        assert!(matches!(err, FailoverError::DuplicateInstance { .. }));
        assert!(registry.get_pool("db").is_err());
    }

    #[test]
    fn test_unknown_pool() {
        let registry = registry(Strategy::ActivePassive);
        assert_eq!(
            registry.get_pool("nope").unwrap_err(),
            FailoverError::PoolNotFound { service: "nope".into() }
        );
        assert!(matches!(
            registry.select_active("nope"),
            Err(FailoverError::PoolNotFound { .. })
        ));
    }

    #[test]
    fn test_select_round_robin_per_service() {
        let registry = registry(Strategy::RoundRobin);
        registry.register_pool("a", instances(&["a1", "a2"])).unwrap();
        registry.register_pool("b", instances(&["b1", "b2"])).unwrap();

        assert_eq!(registry.select_active("a").unwrap().id, "a1");
        assert_eq!(registry.select_active("a").unwrap().id, "a2");
        // counters are independent per service
        assert_eq!(registry.select_active("b").unwrap().id, "b1");
        assert_eq!(registry.select_active("a").unwrap().id, "a1");
    }

    #[test]
    fn test_select_least_connections() {
        let registry = registry(Strategy::ActiveActive);
        registry.register_pool("cache", instances(&["x", "y", "z"])).unwrap();
        registry.set_active_connections("cache", "x", 5).unwrap();
        registry.set_active_connections("cache", "y", 2).unwrap();
        registry.set_active_connections("cache", "z", 2).unwrap();

        assert_eq!(registry.select_active("cache").unwrap().id, "y");
    }

    #[test]
    fn test_select_empty_pool() {
        let registry = registry(Strategy::ActivePassive);
        registry.register_pool("empty", Vec::new()).unwrap();
        assert_eq!(
            registry.select_active("empty").unwrap_err(),
            FailoverError::NoHealthyInstance { service: "empty".into() }
        );
    }

    #[test]
    fn test_record_health_check() {
        let registry = registry(Strategy::ActivePassive);
        registry.register_pool("db", instances(&["a"])).unwrap();
        assert!(registry.get_instance("db", "a").unwrap().last_health_check.is_none());

        registry.record_health_check("db", "a").unwrap();
        assert!(registry.get_instance("db", "a").unwrap().last_health_check.is_some());
        assert!(matches!(
            registry.record_health_check("db", "zzz"),
            Err(FailoverError::InstanceNotFound { .. })
        ));
    }

    #[test]
    fn test_snapshots_are_detached() {
        let registry = registry(Strategy::ActivePassive);
        registry.register_pool("db", instances(&["a"])).unwrap();
        let mut copy = registry.get_instance("db", "a").unwrap();
        copy.state = InstanceState::Failed;
        assert_eq!(registry.get_instance("db", "a").unwrap().state, InstanceState::Active);
    }
}
