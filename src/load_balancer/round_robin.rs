//! Round-robin selection strategy.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::load_balancer::{instance::Instance, instance::InstanceState, Selector};

/// Round-robin selector.
/// Stores an internal counter to rotate through active instances.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Selector for RoundRobin {
    fn next_instance(&self, instances: &[Instance], _designated: Option<usize>) -> Option<usize> {
        let active: Vec<usize> = instances
            .iter()
            .enumerate()
            .filter(|(_, i)| i.state == InstanceState::Active)
            .map(|(idx, _)| idx)
            .collect();

        if active.is_empty() {
            return None;
        }

        // Only advance when something can be returned.
        let count = self.counter.fetch_add(1, Ordering::Relaxed);
        Some(active[count % active.len()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active(id: &str) -> Instance {
        let mut i = Instance::new(id, "127.0.0.1", 8080);
        i.state = InstanceState::Active;
        i
    }

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let instances = vec![active("a"), active("b"), active("c")];

        let picks: Vec<_> = (0..6)
            .map(|_| lb.next_instance(&instances, None).unwrap())
            .collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_round_robin_skips_failed() {
        let lb = RoundRobin::new();
        let mut instances = vec![active("a"), active("b"), active("c")];
        instances[1].state = InstanceState::Failed;

        assert_eq!(lb.next_instance(&instances, None), Some(0));
        assert_eq!(lb.next_instance(&instances, None), Some(2));
        assert_eq!(lb.next_instance(&instances, None), Some(0));
    }

    #[test]
    fn test_round_robin_none_active() {
        let lb = RoundRobin::new();
        let mut instances = vec![active("a")];
        instances[0].state = InstanceState::Failed;
        assert_eq!(lb.next_instance(&instances, None), None);
        assert_eq!(lb.next_instance(&[], None), None);
    }
}
