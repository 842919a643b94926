//! Smooth weighted round-robin strategy.
//!
//! Each alive backend earns its static weight as credit on every call; the
//! richest backend wins and pays back the total weight of the alive set.
//! Over `total_weight` consecutive calls each backend is chosen in
//! proportion to its weight, with picks interleaved rather than bunched.
//!
//! Dead backends neither earn nor pay. A backend that comes back resumes
//! from whatever credit it held when it went down; there is no reset, so
//! short-term fairness is skewed after a flap.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::load_balancer::{backend::Backend, Strategy};

/// Weighted selector. Credits are indexed like the backend sequence.
#[derive(Debug)]
pub struct WeightedRoundRobin {
    current_weights: Mutex<Vec<i64>>,
}

impl WeightedRoundRobin {
    /// Start every backend with credit equal to its weight.
    pub fn new(backends: &[Arc<Backend>]) -> Self {
        Self {
            current_weights: Mutex::new(backends.iter().map(|b| i64::from(b.weight())).collect()),
        }
    }

    /// Current credit per backend, in registry order.
    pub fn current_weights(&self) -> Vec<i64> {
        self.current_weights.lock().clone()
    }
}

impl Strategy for WeightedRoundRobin {
    fn select(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        // Held across the whole pass: the winner depends on every credit
        // updated in this same pass.
        let mut current = self.current_weights.lock();

        let mut best: Option<(usize, i64)> = None;
        let mut total_weight = 0i64;

        for (index, (backend, credit)) in backends.iter().zip(current.iter_mut()).enumerate() {
            if !backend.is_alive() {
                continue;
            }
            let weight = i64::from(backend.weight());
            *credit += weight;
            total_weight += weight;

            // Strictly greater: the first of equal credits keeps the win.
            if best.map_or(true, |(_, top)| *credit > top) {
                best = Some((index, *credit));
            }
        }

        let (index, _) = best?;
        current[index] -= total_weight;
        Some(backends[index].clone())
    }

    fn name(&self) -> &'static str {
        "weighted_round_robin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::test_weighted_backends;

    fn picks(lb: &WeightedRoundRobin, backends: &[Arc<Backend>], n: usize) -> Vec<String> {
        (0..n)
            .map(|_| lb.select(backends).unwrap().address().to_string())
            .collect()
    }

    #[test]
    fn test_three_to_one() {
        let backends = test_weighted_backends(&[("http://a:1", 3), ("http://b:1", 1)]);
        let lb = WeightedRoundRobin::new(&backends);

        for _ in 0..5 {
            assert_eq!(
                picks(&lb, &backends, 4),
                ["http://a:1", "http://a:1", "http://a:1", "http://b:1"]
            );
            // Credits return to their starting point at each cycle boundary.
            assert_eq!(lb.current_weights(), vec![3, 1]);
        }
    }

    #[test]
    fn test_smooth_interleaving() {
        let backends =
            test_weighted_backends(&[("http://a:1", 5), ("http://b:1", 1), ("http://c:1", 1)]);
        let lb = WeightedRoundRobin::new(&backends);

        let cycle = picks(&lb, &backends, 7);
        assert_eq!(cycle.iter().filter(|a| *a == "http://a:1").count(), 5);
        assert_eq!(cycle.iter().filter(|a| *a == "http://b:1").count(), 1);
        assert_eq!(cycle.iter().filter(|a| *a == "http://c:1").count(), 1);
        // "a" never runs five times in a row.
        assert!(cycle.windows(5).all(|w| w.iter().any(|a| a != "http://a:1")));
    }

    #[test]
    fn test_dead_backend_keeps_credit() {
        let backends = test_weighted_backends(&[("http://a:1", 1), ("http://b:1", 1)]);
        let lb = WeightedRoundRobin::new(&backends);

        backends[1].mark_failure(1);
        assert_eq!(picks(&lb, &backends, 3), ["http://a:1", "http://a:1", "http://a:1"]);
        assert_eq!(lb.current_weights(), vec![1, 1]);

        backends[1].mark_success();
        // Equal credit after the update: the first backend wins the tie.
        assert_eq!(picks(&lb, &backends, 2), ["http://a:1", "http://b:1"]);
    }

    #[test]
    fn test_none_alive() {
        let backends = test_weighted_backends(&[("http://a:1", 2)]);
        let lb = WeightedRoundRobin::new(&backends);
        backends[0].mark_failure(1);
        assert!(lb.select(&backends).is_none());
        assert_eq!(lb.current_weights(), vec![2]);
    }
}
