//! Sextant Clock Infrastructure
//!
//! Time sources behind the `Clock` port:
//!
//! - [`SystemClock`] - wall-clock time for the live loop
//! - [`FixedClock`] - frozen, explicitly advanced time for deterministic
//!   tests of the market-hours gate and the scheduler
//!
//! The engine never reads `Utc::now()` directly; every time-dependent
//! decision goes through an injected clock so scheduling is testable
//! without real waiting.

mod fixed;
mod system;

pub use fixed::FixedClock;
pub use system::SystemClock;

// Re-export the Clock trait for convenience
pub use sextant_ports::Clock;
