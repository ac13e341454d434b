//! Failover control library.
//!
//! Tracks pools of redundant service instances, selects the instance that
//! should serve, fails over when an instance is reported unhealthy and
//! probes failed instances for recovery.

pub mod admin;
pub mod config;
pub mod error;
pub mod failover;
pub mod health;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod resilience;

pub use config::schema::AppConfig;
pub use error::{CallbackError, FailoverError, FailoverResult};
pub use failover::{
    FailoverCallback, FailoverEvent, FailoverMetrics, FailoverRegistry, FnProbe, PoolStatus, RecoveryOutcome,
    RecoveryProbe,
};
pub use lifecycle::Shutdown;
pub use load_balancer::instance::{Instance, InstanceState};
pub use load_balancer::pool::PoolSnapshot;
