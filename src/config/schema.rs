//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the failover
//! daemon. All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Failover behaviour shared by every pool.
    pub failover: FailoverConfig,

    /// Reference health monitor settings.
    pub health_check: HealthCheckConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Pools registered at startup.
    pub pools: Vec<PoolConfig>,
}

/// Selection and failover algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One instance serves, the rest stand by.
    #[default]
    ActivePassive,
    /// Every healthy instance serves; least connections wins.
    ActiveActive,
    /// Every healthy instance serves in strict rotation.
    RoundRobin,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::ActivePassive => "active_passive",
            Strategy::ActiveActive => "active_active",
            Strategy::RoundRobin => "round_robin",
        };
        f.write_str(name)
    }
}

/// Process-wide failover configuration.
///
/// Immutable once the registry has been built.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FailoverConfig {
    pub strategy: Strategy,

    /// Consumed by the health-check loop, not by the registry.
    pub health_check_interval_secs: u64,

    /// Budget for a single failover, callbacks included. Exceeding it is logged.
    pub failover_timeout_secs: u64,

    /// Delay before a recovery probe fires.
    pub recovery_timeout_secs: u64,

    /// Upper bound on recovery attempts per failure when re-arming. The
    /// initial attempt counts, so the probe fires at most this many times.
    pub max_retries: u32,

    /// Arm recovery timers after failover.
    pub enable_auto_recovery: bool,

    /// Re-arm recovery with backoff when the probe reports unhealthy.
    pub rearm_on_recovery_failure: bool,

    /// Base delay for re-arm backoff in milliseconds.
    pub rearm_base_delay_ms: u64,

    /// Maximum delay for re-arm backoff in milliseconds.
    pub rearm_max_delay_ms: u64,

    /// Number of failover events retained in memory.
    pub event_log_capacity: usize,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::ActivePassive,
            health_check_interval_secs: 30,
            failover_timeout_secs: 10,
            recovery_timeout_secs: 60,
            max_retries: 3,
            enable_auto_recovery: true,
            rearm_on_recovery_failure: false,
            rearm_base_delay_ms: 1_000,
            rearm_max_delay_ms: 60_000,
            event_log_capacity: 1_000,
        }
    }
}

impl FailoverConfig {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }

    pub fn failover_timeout(&self) -> Duration {
        Duration::from_secs(self.failover_timeout_secs)
    }

    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }
}

/// Health monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the built-in health monitor.
    pub enabled: bool,

    /// Path to probe for HTTP health checks.
    pub path: String,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,

    /// Number of consecutive failed probes before reporting a failure.
    pub unhealthy_threshold: u32,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/health".to_string(),
            timeout_secs: 5,
            unhealthy_threshold: 3,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// A pool registered at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Logical service name, unique across the registry.
    pub service: String,

    /// Instances in registration order.
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

/// A single instance of a pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstanceConfig {
    /// Unique identifier within the pool.
    pub id: String,

    pub host: String,

    pub port: u16,

    /// Relative selection weight (default: 1.0).
    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Caller-defined annotations.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_weight() -> f64 {
    1.0
}
