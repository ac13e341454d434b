//! Failover event log.
//!
//! Bounded ring buffer: once `capacity` events are held the oldest is
//! evicted. The lifetime total is kept separately so counts stay exact.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use serde::Serialize;

/// Immutable record of one reported failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailoverEvent {
    pub timestamp: SystemTime,
    pub service_name: String,
    pub failed_instance_id: String,
    pub reason: String,
}

impl FailoverEvent {
    pub fn new(service_name: &str, failed_instance_id: &str, reason: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            service_name: service_name.to_string(),
            failed_instance_id: failed_instance_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct EventLog {
    capacity: usize,
    events: Mutex<VecDeque<FailoverEvent>>,
    total: AtomicU64,
}

impl EventLog {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            total: AtomicU64::new(0),
        }
    }

    pub(crate) fn record(&self, event: FailoverEvent) {
        let mut events = self.events.lock();
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Events ever recorded, including evicted ones.
    pub(crate) fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Retained events newer than `now - window`.
    pub(crate) fn count_within(&self, window: Duration, now: SystemTime) -> u64 {
        let cutoff = now.checked_sub(window).unwrap_or(SystemTime::UNIX_EPOCH);
        self.events
            .lock()
            .iter()
            .filter(|e| e.timestamp >= cutoff)
            .count() as u64
    }

    /// Up to `limit` most recent events, newest first.
    pub(crate) fn recent(&self, limit: usize) -> Vec<FailoverEvent> {
        self.events.lock().iter().rev().take(limit).cloned().collect()
    }
}
