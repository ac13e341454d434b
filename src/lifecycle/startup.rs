//! Startup orchestration.
//!
//! Builds the registry from a validated [`AppConfig`] and registers every
//! configured pool. Fails fast: the first registration error aborts startup.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::FailoverResult;
use crate::failover::{FailoverRegistry, RecoveryProbe};
use crate::load_balancer::instance::Instance;

pub fn build_registry(config: &AppConfig, probe: Arc<dyn RecoveryProbe>) -> FailoverResult<FailoverRegistry> {
    let registry = FailoverRegistry::new(config.failover.clone(), probe);

    for pool in &config.pools {
        let instances = pool.instances.iter().map(Instance::from).collect();
        registry.register_pool(&pool.service, instances)?;
    }

    tracing::info!(
        pools = config.pools.len(),
        strategy = %config.failover.strategy,
        auto_recovery = config.failover.enable_auto_recovery,
        "Registry initialized"
    );
    Ok(registry)
}
