//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{backend::Backend, Strategy};

/// Round-robin selector.
///
/// The cursor holds the index of the last backend returned. Each call scans
/// forward from the slot after it, skipping dead backends, and commits the
/// new position with a single compare-and-swap so two callers never claim
/// the same rotation step.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the last backend returned (0 before any selection).
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}

/// First alive index strictly after `from`, wrapping, scanning at most `len` slots.
fn next_alive(backends: &[Arc<Backend>], from: usize) -> Option<usize> {
    let len = backends.len();
    let mut index = from;
    for _ in 0..len {
        index = (index + 1) % len;
        if backends[index].is_alive() {
            return Some(index);
        }
    }
    None
}

impl Strategy for RoundRobin {
    fn select(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }

        let mut current = self.cursor.load(Ordering::Acquire);
        loop {
            let index = next_alive(backends, current)?;
            match self
                .cursor
                .compare_exchange_weak(current, index, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Some(backends[index].clone()),
                Err(actual) => current = actual,
            }
        }
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::test_backends;

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let backends = test_backends(&["http://a:1", "http://b:1", "http://c:1"]);

        // The cursor starts at 0, so rotation begins after the first slot.
        let picks: Vec<_> = (0..6)
            .map(|_| lb.select(&backends).unwrap().address().to_string())
            .collect();
        assert_eq!(
            picks,
            ["http://b:1", "http://c:1", "http://a:1", "http://b:1", "http://c:1", "http://a:1"]
        );
        assert_eq!(lb.cursor(), 0);
    }

    #[test]
    fn test_skips_dead() {
        let lb = RoundRobin::new();
        let backends = test_backends(&["http://a:1", "http://b:1", "http://c:1"]);
        backends[1].mark_failure(1);

        let s1 = lb.select(&backends).unwrap();
        assert_eq!(s1.address(), "http://c:1");
        let s2 = lb.select(&backends).unwrap();
        assert_eq!(s2.address(), "http://a:1");
        let s3 = lb.select(&backends).unwrap();
        assert_eq!(s3.address(), "http://c:1");
    }

    #[test]
    fn test_all_dead_keeps_cursor() {
        let lb = RoundRobin::new();
        let backends = test_backends(&["http://a:1", "http://b:1"]);
        lb.select(&backends).unwrap();
        for b in &backends {
            b.mark_failure(1);
        }
        assert!(lb.select(&backends).is_none());
        assert_eq!(lb.cursor(), 1);
    }

    #[test]
    fn test_single_backend() {
        let lb = RoundRobin::new();
        let backends = test_backends(&["http://a:1"]);
        for _ in 0..3 {
            assert_eq!(lb.select(&backends).unwrap().address(), "http://a:1");
        }
        assert!(lb.select(&[]).is_none());
    }
}
