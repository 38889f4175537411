//! Actor running the monitoring loop
//!
//! ```text
//! Timer tick ─► SensorReader ─► AlertEvaluator ─► LocalOutput + AlertPublisher
//!     ▲
//!     └─── Commands (CycleNow, Shutdown)
//! ```
//!
//! The binary owns a [`monitor::MonitorHandle`]; the actor itself owns the
//! sensors, the evaluator and the broker connection. Exactly one cycle runs at
//! a time.

pub mod messages;
pub mod monitor;
