//! Least Connections selection strategy.

use crate::load_balancer::{instance::Instance, instance::InstanceState, Selector};

/// Least connections selector.
/// Selects the active instance with the minimum number of active connections.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl Selector for LeastConnections {
    fn next_instance(&self, instances: &[Instance], _designated: Option<usize>) -> Option<usize> {
        // In case of tie, the first one is selected (stability)
        instances
            .iter()
            .enumerate()
            .filter(|(_, i)| i.state == InstanceState::Active)
            .min_by_key(|(_, i)| i.active_connections)
            .map(|(idx, _)| idx)
    }
}
