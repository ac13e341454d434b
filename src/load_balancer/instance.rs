//! Instance abstraction.
//!
//! # Responsibilities
//! - Represent a single replica of a logical service
//! - Track lifecycle state (Active/Standby/Failed/Recovering)
//! - Carry the load counter used by least-connections selection
//! - Count reported failures until a successful recovery

use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;

use serde::Serialize;

use crate::config::InstanceConfig;

/// Lifecycle state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    /// Serving traffic.
    Active,
    /// Hot spare, eligible for promotion.
    Standby,
    /// Reported unhealthy; excluded from selection.
    Failed,
    /// A recovery probe is in flight.
    Recovering,
}

impl InstanceState {
    /// Active and Standby count as healthy; Failed and Recovering do not.
    pub fn is_healthy(self) -> bool {
        match self {
            InstanceState::Active | InstanceState::Standby => true,
            InstanceState::Failed | InstanceState::Recovering => false,
        }
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstanceState::Active => "active",
            InstanceState::Standby => "standby",
            InstanceState::Failed => "failed",
            InstanceState::Recovering => "recovering",
        };
        f.write_str(name)
    }
}

/// A single replica of a service.
///
/// Values handed out by the registry are snapshots; mutating them has no
/// effect on the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instance {
    /// Unique within its pool.
    pub id: String,
    pub host: String,
    pub port: u16,
    pub state: InstanceState,
    /// Relative selection weight, reserved for weighted strategies.
    pub weight: f64,
    /// Connections attributed to this instance; moved to the replacement on failover.
    pub active_connections: u64,
    /// Stamped by the health-check collaborator.
    pub last_health_check: Option<SystemTime>,
    /// Failures reported since the last successful recovery.
    pub failure_count: u32,
    pub metadata: HashMap<String, String>,
}

impl Instance {
    /// Create a new instance. The registry assigns the initial state on
    /// registration.
    pub fn new(id: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port,
            state: InstanceState::Standby,
            weight: 1.0,
            active_connections: 0,
            last_health_check: None,
            failure_count: 0,
            metadata: HashMap::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_connections(mut self, active_connections: u64) -> Self {
        self.active_connections = active_connections;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// `host:port` of the instance.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_healthy(&self) -> bool {
        self.state.is_healthy()
    }

    /// Record a reported failure.
    pub(crate) fn mark_failed(&mut self) {
        self.state = InstanceState::Failed;
        self.failure_count = self.failure_count.saturating_add(1);
    }

    /// Move this instance's connections onto `replacement`.
    pub(crate) fn transfer_connections(&mut self, replacement: &mut Instance) {
        replacement.active_connections = replacement
            .active_connections
            .saturating_add(self.active_connections);
        self.active_connections = 0;
    }
}

impl From<&InstanceConfig> for Instance {
    fn from(config: &InstanceConfig) -> Self {
        Self {
            weight: config.weight,
            metadata: config.metadata.clone(),
            ..Instance::new(config.id.clone(), config.host.clone(), config.port)
        }
    }
}
