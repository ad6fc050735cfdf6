//! Event system for reporting harvest progress
//!
//! The external control surface never blocks the run: it subscribes to a
//! one-way broadcast of [`HarvestEvent`]s while the harvest proceeds on its
//! own task.

// Sub-modules
pub mod bus;
pub mod errors;
pub mod metrics;
pub mod types;

// Re-exports for public API
pub use bus::HarvestEventBus;
pub use errors::EventBusError;
pub use metrics::{EventBusMetrics, MetricsSnapshot};
pub use types::{HarvestEvent, Severity, ShutdownReason};
