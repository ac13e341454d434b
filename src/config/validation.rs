//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, capacities > 0)
//! - Detect duplicate services and instance ids
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let failover = &config.failover;

    if failover.recovery_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "failover.recovery_timeout_secs",
            "must be greater than 0",
        ));
    }
    if failover.health_check_interval_secs == 0 {
        errors.push(ValidationError::new(
            "failover.health_check_interval_secs",
            "must be greater than 0",
        ));
    }
    if failover.event_log_capacity == 0 {
        errors.push(ValidationError::new(
            "failover.event_log_capacity",
            "must be greater than 0",
        ));
    }
    if failover.rearm_base_delay_ms > failover.rearm_max_delay_ms {
        errors.push(ValidationError::new(
            "failover.rearm_base_delay_ms",
            "must not exceed rearm_max_delay_ms",
        ));
    }
    if failover.rearm_on_recovery_failure && failover.max_retries == 0 {
        errors.push(ValidationError::new(
            "failover.max_retries",
            "must be greater than 0 when rearm_on_recovery_failure is set",
        ));
    }
    if config.health_check.enabled && config.health_check.unhealthy_threshold == 0 {
        errors.push(ValidationError::new(
            "health_check.unhealthy_threshold",
            "must be greater than 0",
        ));
    }

    let mut services = HashSet::new();
    for (i, pool) in config.pools.iter().enumerate() {
        let field = format!("pools[{}]", i);
        if !services.insert(pool.service.as_str()) {
            errors.push(ValidationError::new(
                &field,
                format!("duplicate service '{}'", pool.service),
            ));
        }
        if pool.instances.is_empty() {
            errors.push(ValidationError::new(
                &field,
                format!("service '{}' has no instances", pool.service),
            ));
        }

        let mut ids = HashSet::new();
        for (j, instance) in pool.instances.iter().enumerate() {
            if !ids.insert(instance.id.as_str()) {
                errors.push(ValidationError::new(
                    format!("{}.instances[{}]", field, j),
                    format!("duplicate instance id '{}'", instance.id),
                ));
            }
            if !(instance.weight.is_finite() && instance.weight > 0.0) {
                errors.push(ValidationError::new(
                    format!("{}.instances[{}].weight", field, j),
                    "must be a positive number",
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
