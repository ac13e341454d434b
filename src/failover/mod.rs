//! Failover control subsystem.
//!
//! # Data Flow
//! ```text
//! register_pool(service, instances)
//!     → registry.rs (initial states from the strategy)
//!
//! report_failure(service, id)        (from a health-check loop)
//!     → handler.rs (mark failed, pick replacement, transfer load)
//!     → events.rs (bounded event log)
//!     → callbacks.rs (side-effect hooks, lock released)
//!     → recovery.rs (arm deferred probe)
//!
//! get_pool_status / get_failover_metrics
//!     → status.rs (snapshot reads)
//! ```
//!
//! # Design Decisions
//! - Mutations of one service are serialized by that service's lock
//! - Reads copy out under the lock and never hand out references
//! - Errors degrade gracefully; only total loss of redundancy is logged as critical

pub mod callbacks;
pub mod events;
pub mod handler;
pub mod recovery;
pub mod registry;
pub mod status;

pub use callbacks::FailoverCallback;
pub use events::FailoverEvent;
pub use handler::DEFAULT_FAILURE_REASON;
pub use recovery::{FnProbe, RecoveryKey, RecoveryOutcome, RecoveryProbe};
pub use registry::FailoverRegistry;
pub use status::{FailoverMetrics, PoolStatus};
