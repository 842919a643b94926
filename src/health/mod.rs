//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer (or on-demand call)
//!     → Probe every backend concurrently at <address>/health
//!     → Join all probes
//!     → Update state.rs per backend, adjust alive count in Metrics
//!
//! State machine (state.rs):
//!     Alive ←→ Dead
//!     N consecutive failures to go down, one success to come back
//! ```
//!
//! # Design Decisions
//! - Health state is per-backend, guarded by the backend's own lock
//! - Probe failures are absorbed into state, never returned as errors
//! - The periodic loop is cancellable through the shutdown broadcast

pub mod active;
pub mod state;

pub use active::{HealthChecker, ProbeError};
pub use state::{HealthState, Transition};
