//! Type-safe builder for `HarvestConfig` using the typestate pattern
//!
//! This module provides a fluent builder interface with compile-time validation
//! ensuring that the database path and diagnostics root are set before building.

use anyhow::{Result, anyhow, bail};
use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::{HarvestConfig, NavigatorSettings, SessionConfig};
use crate::catalog::Source;
use crate::executor::RetryPolicy;

// Type states for the builder
pub struct WithDatabase;
pub struct WithDiagnostics;

pub struct HarvestConfigBuilder<State = ()> {
    pub(crate) database_path: Option<PathBuf>,
    pub(crate) diagnostics_root: Option<PathBuf>,
    pub(crate) sources: Vec<Source>,
    pub(crate) session: SessionConfig,
    pub(crate) retry: RetryPolicy,
    pub(crate) navigator: NavigatorSettings,
    pub(crate) dump_page_on_entry_failure: bool,
    pub(crate) event_capacity: usize,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for HarvestConfigBuilder<()> {
    fn default() -> Self {
        Self {
            database_path: None,
            diagnostics_root: None,
            sources: Source::ALL.to_vec(),
            session: SessionConfig::default(),
            retry: RetryPolicy::default(),
            navigator: NavigatorSettings::default(),
            dump_page_on_entry_failure: true,
            event_capacity: 1024,
            _phantom: PhantomData,
        }
    }
}

impl HarvestConfig {
    /// Create a builder for configuring a `HarvestConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> HarvestConfigBuilder<()> {
        HarvestConfigBuilder::default()
    }
}

impl HarvestConfigBuilder<()> {
    pub fn database_path(self, path: impl Into<PathBuf>) -> HarvestConfigBuilder<WithDatabase> {
        HarvestConfigBuilder {
            database_path: Some(path.into()),
            diagnostics_root: self.diagnostics_root,
            sources: self.sources,
            session: self.session,
            retry: self.retry,
            navigator: self.navigator,
            dump_page_on_entry_failure: self.dump_page_on_entry_failure,
            event_capacity: self.event_capacity,
            _phantom: PhantomData,
        }
    }
}

impl HarvestConfigBuilder<WithDatabase> {
    pub fn diagnostics_root(self, dir: impl Into<PathBuf>) -> HarvestConfigBuilder<WithDiagnostics> {
        HarvestConfigBuilder {
            database_path: self.database_path,
            diagnostics_root: Some(dir.into()),
            sources: self.sources,
            session: self.session,
            retry: self.retry,
            navigator: self.navigator,
            dump_page_on_entry_failure: self.dump_page_on_entry_failure,
            event_capacity: self.event_capacity,
            _phantom: PhantomData,
        }
    }
}

// Build method only available when all required fields are set
impl HarvestConfigBuilder<WithDiagnostics> {
    pub fn build(self) -> Result<HarvestConfig> {
        if self.sources.is_empty() {
            bail!("at least one source must be selected");
        }
        let (width, height) = self.session.window_size;
        if width == 0 || height == 0 {
            bail!("window size must be non-zero, got {width}x{height}");
        }
        if self.session.page_load_timeout_ms == 0 || self.session.script_timeout_ms == 0 {
            bail!("page load and script timeouts must be greater than zero");
        }
        if self.navigator.entry_timeout_ms == 0 || self.navigator.list_timeout_ms == 0 {
            bail!("navigator wait timeouts must be greater than zero");
        }
        if self.navigator.max_scroll_rounds == 0 {
            bail!("max_scroll_rounds must be at least 1");
        }
        if self.event_capacity == 0 {
            bail!("event_capacity must be at least 1");
        }

        // Sources run in a fixed order; duplicates collapse.
        let mut sources = self.sources;
        sources.sort();
        sources.dedup();

        Ok(HarvestConfig {
            database_path: self
                .database_path
                .ok_or_else(|| anyhow!("database_path is required"))?,
            diagnostics_root: self
                .diagnostics_root
                .ok_or_else(|| anyhow!("diagnostics_root is required"))?,
            sources,
            session: self.session,
            retry: self.retry,
            navigator: self.navigator,
            dump_page_on_entry_failure: self.dump_page_on_entry_failure,
            event_capacity: self.event_capacity,
            event_bus: None,
        })
    }
}
