//! Failover callback registry.
//!
//! Callbacks run after the per-service lock has been released and only see
//! snapshots, so they can neither stall later failure reports on the lock
//! nor mutate registry state.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::CallbackError;
use crate::load_balancer::instance::Instance;
use crate::observability::metrics;

/// Side-effect hook invoked on every failover of a service.
pub trait FailoverCallback: Send + Sync {
    /// Called with the failed instance and its replacement.
    fn on_failover(&self, failed: &Instance, replacement: &Instance) -> Result<(), CallbackError>;
}

impl<F> FailoverCallback for F
where
    F: Fn(&Instance, &Instance) -> Result<(), CallbackError> + Send + Sync,
{
    fn on_failover(&self, failed: &Instance, replacement: &Instance) -> Result<(), CallbackError> {
        self(failed, replacement)
    }
}

#[derive(Default)]
pub(crate) struct CallbackRegistry {
    callbacks: DashMap<String, Vec<Arc<dyn FailoverCallback>>>,
}

impl CallbackRegistry {
    /// Append a callback; no deduplication.
    pub(crate) fn register(&self, service: &str, callback: Arc<dyn FailoverCallback>) {
        self.callbacks
            .entry(service.to_string())
            .or_default()
            .push(callback);
    }

    pub(crate) fn count(&self, service: &str) -> usize {
        self.callbacks.get(service).map_or(0, |c| c.len())
    }

    /// Run every callback for `service` in registration order.
    ///
    /// Returns the number of callbacks that failed.
    pub(crate) fn invoke(&self, service: &str, failed: &Instance, replacement: &Instance) -> usize {
        // Clone the list so the map shard is not held while user code runs.
        let callbacks: Vec<Arc<dyn FailoverCallback>> = match self.callbacks.get(service) {
            Some(list) => list.clone(),
            None => return 0,
        };

        let mut errors = 0;
        for (position, callback) in callbacks.iter().enumerate() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                callback.on_failover(failed, replacement)
            }))
            .unwrap_or_else(|payload| Err(CallbackError::Panicked(panic_message(payload))));

            if let Err(e) = result {
                errors += 1;
                metrics::record_callback_error(service);
                tracing::warn!(
                    service = %service,
                    callback = position,
                    failed = %failed.id,
                    replacement = %replacement.id,
                    error = %e,
                    "Failover callback failed"
                );
            }
        }
        errors
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
