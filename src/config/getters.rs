//! Getter methods for `HarvestConfig`
//!
//! This module provides all the accessor methods for retrieving configuration
//! values from a `HarvestConfig` instance.

use std::path::Path;
use std::sync::Arc;

use super::types::{HarvestConfig, NavigatorSettings, SessionConfig};
use crate::catalog::Source;
use crate::events::HarvestEventBus;
use crate::executor::RetryPolicy;

impl HarvestConfig {
    #[must_use]
    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    #[must_use]
    pub fn diagnostics_root(&self) -> &Path {
        &self.diagnostics_root
    }

    #[must_use]
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    #[must_use]
    pub fn session(&self) -> &SessionConfig {
        &self.session
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    #[must_use]
    pub fn navigator(&self) -> &NavigatorSettings {
        &self.navigator
    }

    #[must_use]
    pub fn dump_page_on_entry_failure(&self) -> bool {
        self.dump_page_on_entry_failure
    }

    #[must_use]
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }

    #[must_use]
    pub fn event_bus(&self) -> Option<&Arc<HarvestEventBus>> {
        self.event_bus.as_ref()
    }
}
