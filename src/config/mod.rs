//! Configuration module for catalog harvesting
//!
//! This module provides the `HarvestConfig` struct and its type-safe builder
//! for configuring harvest runs with validation and sensible defaults.

// Sub-modules
pub mod builder;
pub mod getters;
pub mod methods;
pub mod types;

// Re-exports for public API
pub use builder::{HarvestConfigBuilder, WithDatabase, WithDiagnostics};
pub use types::{HarvestConfig, NavigatorSettings, SessionConfig};
