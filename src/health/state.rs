//! Backend health state machine.
//!
//! # States
//! - Alive: backend receives traffic
//! - Dead: backend excluded from load balancing
//!
//! # State Transitions
//! ```text
//! Alive → Dead: consecutive failures >= max_consecutive_failures
//! Dead → Alive: first successful probe
//! ```
//!
//! # Design Decisions
//! - All health fields live in one value guarded by one lock, so readers
//!   never observe a half-applied probe result
//! - Transitions are returned to the caller, which owns the aggregate
//!   active-backend counter

use std::time::SystemTime;

/// Health of a single backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthState {
    pub alive: bool,
    pub consecutive_failures: u32,
    /// Time of the most recent probe, successful or not.
    pub last_checked_at: Option<SystemTime>,
}

/// An `alive` flip caused by a probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    WentDown,
    CameUp,
}

impl Default for HealthState {
    fn default() -> Self {
        Self {
            alive: true,
            consecutive_failures: 0,
            last_checked_at: None,
        }
    }
}

impl HealthState {
    /// Apply a failed probe.
    pub fn record_failure(&mut self, max_failures: u32, at: SystemTime) -> Option<Transition> {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_checked_at = Some(at);

        if self.alive && self.consecutive_failures >= max_failures {
            self.alive = false;
            return Some(Transition::WentDown);
        }
        None
    }

    /// Apply a successful probe.
    pub fn record_success(&mut self, at: SystemTime) -> Option<Transition> {
        self.consecutive_failures = 0;
        self.last_checked_at = Some(at);

        if !self.alive {
            self.alive = true;
            return Some(Transition::CameUp);
        }
        None
    }
}
