//! Active-passive selection strategy.

use crate::load_balancer::{instance::Instance, instance::InstanceState, Selector};

/// Returns the pool's designated active instance, if it is still active.
#[derive(Debug, Default)]
pub struct ActivePassive;

impl ActivePassive {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for ActivePassive {
    fn next_instance(&self, instances: &[Instance], designated: Option<usize>) -> Option<usize> {
        designated.filter(|&idx| {
            instances
                .get(idx)
                .is_some_and(|i| i.state == InstanceState::Active)
        })
    }
}
