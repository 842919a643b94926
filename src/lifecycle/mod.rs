//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Build load balancer (spawns health loop)
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Trigger broadcast → Health loop exits → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
