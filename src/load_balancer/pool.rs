//! Per-service instance pool.
//!
//! # Responsibilities
//! - Hold the ordered instances of one service
//! - Assign initial states from the strategy
//! - Track the designated active instance (active-passive only)
//! - Own the service's selector (and its round-robin counter)

use serde::Serialize;

use crate::config::Strategy;
use crate::load_balancer::{
    active_passive::ActivePassive,
    instance::{Instance, InstanceState},
    least_conn::LeastConnections,
    round_robin::RoundRobin,
    Selector,
};

/// Instances of one logical service plus selection state.
///
/// Always accessed under the registry's per-service lock.
#[derive(Debug)]
pub(crate) struct Pool {
    pub(crate) service: String,
    pub(crate) strategy: Strategy,
    pub(crate) instances: Vec<Instance>,
    /// Index of the designated active instance (active-passive only).
    pub(crate) designated: Option<usize>,
    selector: Box<dyn Selector>,
    /// Failure events ever recorded for this service.
    pub(crate) event_count: u64,
}

fn selector_for(strategy: Strategy) -> Box<dyn Selector> {
    match strategy {
        Strategy::ActivePassive => Box::new(ActivePassive::new()),
        Strategy::ActiveActive => Box::new(LeastConnections::new()),
        Strategy::RoundRobin => Box::new(RoundRobin::new()),
    }
}

impl Pool {
    /// Build a pool, overriding each instance's state from the strategy.
    pub(crate) fn new(service: impl Into<String>, strategy: Strategy, mut instances: Vec<Instance>) -> Self {
        let designated = match strategy {
            Strategy::ActivePassive => {
                for (idx, instance) in instances.iter_mut().enumerate() {
                    instance.state = if idx == 0 {
                        InstanceState::Active
                    } else {
                        InstanceState::Standby
                    };
                }
                (!instances.is_empty()).then_some(0)
            }
            Strategy::ActiveActive | Strategy::RoundRobin => {
                for instance in instances.iter_mut() {
                    instance.state = InstanceState::Active;
                }
                None
            }
        };

        Self {
            service: service.into(),
            strategy,
            instances,
            designated,
            selector: selector_for(strategy),
            event_count: 0,
        }
    }

    pub(crate) fn position(&self, id: &str) -> Option<usize> {
        self.instances.iter().position(|i| i.id == id)
    }

    /// Apply the strategy's selector.
    pub(crate) fn select(&self) -> Option<usize> {
        self.selector.next_instance(&self.instances, self.designated)
    }

    /// Mark `idx` failed; clears the designation if it pointed there.
    pub(crate) fn mark_failed(&mut self, idx: usize) {
        self.instances[idx].mark_failed();
        self.event_count += 1;
        if self.designated == Some(idx) {
            self.designated = None;
        }
    }

    /// Hand traffic from `failed` to `replacement`.
    pub(crate) fn fail_over(&mut self, failed: usize, replacement: usize) {
        match self.instances[replacement].state {
            InstanceState::Standby => self.instances[replacement].state = InstanceState::Active,
            InstanceState::Active => {}
            // replacements are drawn from healthy instances only
            InstanceState::Failed | InstanceState::Recovering => return,
        }
        match self.strategy {
            Strategy::ActivePassive => self.designated = Some(replacement),
            Strategy::ActiveActive | Strategy::RoundRobin => {}
        }

        let (from, to) = pair_mut(&mut self.instances, failed, replacement);
        from.transfer_connections(to);
    }

    /// Return a recovered instance to service eligibility.
    ///
    /// Active-passive pools get a standby back, or a new active when the pool
    /// had no active instance left. Active-active pools get another active.
    pub(crate) fn complete_recovery(&mut self, idx: usize) {
        let state = match self.strategy {
            Strategy::ActivePassive => {
                if self.designated.is_none() {
                    self.designated = Some(idx);
                    InstanceState::Active
                } else {
                    InstanceState::Standby
                }
            }
            Strategy::ActiveActive | Strategy::RoundRobin => InstanceState::Active,
        };
        let instance = &mut self.instances[idx];
        instance.state = state;
        instance.failure_count = 0;
    }

    pub(crate) fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            service: self.service.clone(),
            strategy: self.strategy,
            instances: self.instances.clone(),
            designated_active: self.designated.map(|idx| self.instances[idx].id.clone()),
        }
    }

    pub(crate) fn count_in(&self, state: InstanceState) -> usize {
        self.instances.iter().filter(|i| i.state == state).count()
    }

    pub(crate) fn healthy_count(&self) -> usize {
        self.instances.iter().filter(|i| i.is_healthy()).count()
    }
}

fn pair_mut(instances: &mut [Instance], a: usize, b: usize) -> (&mut Instance, &mut Instance) {
    if a < b {
        let (left, right) = instances.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = instances.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

/// Owned copy of a pool handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolSnapshot {
    pub service: String,
    pub strategy: Strategy,
    pub instances: Vec<Instance>,
    pub designated_active: Option<String>,
}

impl PoolSnapshot {
    pub fn instance(&self, id: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.id == id)
    }
}
