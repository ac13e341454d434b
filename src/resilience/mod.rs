//! Resilience helpers.
//!
//! # Design Decisions
//! - A recovery probe that keeps failing is retried with exponential
//!   backoff, bounded by `max_retries`

pub mod backoff;
