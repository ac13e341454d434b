//! Instance model and selection strategies.
//!
//! # Data Flow
//! ```text
//! select_active(service)
//!     → pool.rs (per-service instances + designated active)
//!     → Apply the strategy's selector:
//!         - active_passive.rs (the designated active instance)
//!         - round_robin.rs (rotate through active instances)
//!         - least_conn.rs (active instance with fewest connections)
//!     → Return a snapshot of the chosen instance or NoHealthyInstance
//! ```
//!
//! # Design Decisions
//! - Selectors are stateless apart from the round-robin counter
//! - One selector per pool, so counters are per service
//! - Failed and Recovering instances are never selected

pub mod active_passive;
pub mod instance;
pub mod least_conn;
pub mod pool;
pub mod round_robin;

use std::fmt::Debug;

use crate::load_balancer::instance::Instance;

/// Selection algorithm applied to one pool.
pub trait Selector: Send + Sync + Debug {
    /// Index of the instance that should serve the next request.
    ///
    /// `designated` is the pool's designated active instance, used by
    /// active-passive selection.
    fn next_instance(&self, instances: &[Instance], designated: Option<usize>) -> Option<usize>;
}
