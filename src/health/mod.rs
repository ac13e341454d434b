//! Reference health checking.
//!
//! # Data Flow
//! ```text
//! Periodic timer (active.rs)
//!     → probe.rs (HTTP GET per eligible instance)
//!     → consecutive failures ≥ threshold
//!     → FailoverRegistry::report_failure_with_reason
//!
//! Recovery timer fired
//!     → probe.rs (same HTTP probe)
//! ```

pub mod active;
pub mod probe;

pub use active::HealthMonitor;
pub use probe::HttpProbe;
