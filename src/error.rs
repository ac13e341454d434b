//! Error types for the failover subsystem.

use thiserror::Error;

/// Errors surfaced by registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailoverError {
    /// The service name was never registered.
    #[error("pool not found: {service}")]
    PoolNotFound { service: String },

    /// `register_pool` called twice for the same service.
    #[error("service already registered: {service}")]
    DuplicateService { service: String },

    /// Two instances in one pool share an id.
    #[error("duplicate instance {instance} in pool {service}")]
    DuplicateInstance { service: String, instance: String },

    /// The instance id is not part of the service's pool.
    #[error("instance {instance} not found in pool {service}")]
    InstanceNotFound { service: String, instance: String },

    /// Selection found zero eligible instances.
    #[error("no healthy instance available for service {service}")]
    NoHealthyInstance { service: String },

    /// A failure was reported but nothing is left to take over.
    #[error("no replacement available for failed instance {failed} of service {service}")]
    NoReplacementAvailable { service: String, failed: String },
}

impl FailoverError {
    pub(crate) fn pool_not_found(service: &str) -> Self {
        Self::PoolNotFound {
            service: service.to_string(),
        }
    }

    pub(crate) fn instance_not_found(service: &str, instance: &str) -> Self {
        Self::InstanceNotFound {
            service: service.to_string(),
            instance: instance.to_string(),
        }
    }
}

/// Result alias for registry operations.
pub type FailoverResult<T> = Result<T, FailoverError>;

/// A failover callback did not complete.
///
/// Caught and logged per callback; never propagated to the caller of
/// `report_failure`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    /// The callback returned an error.
    #[error("callback failed: {0}")]
    Failed(String),

    /// The callback panicked.
    #[error("callback panicked: {0}")]
    Panicked(String),
}

impl CallbackError {
    /// Build a `Failed` error from any displayable value.
    pub fn failed(msg: impl std::fmt::Display) -> Self {
        Self::Failed(msg.to_string())
    }
}
