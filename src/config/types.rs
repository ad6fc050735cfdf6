//! Core configuration types for catalog harvesting
//!
//! This module contains `HarvestConfig` and the option groups it nests:
//! browser session options, navigator timing, and the executor's retry policy.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::catalog::Source;
use crate::events::HarvestEventBus;
use crate::executor::RetryPolicy;
use crate::utils::{
    DEFAULT_ENTRY_TIMEOUT_MS, DEFAULT_LIST_TIMEOUT_MS, DEFAULT_MAX_SCROLL_ROUNDS,
    DEFAULT_PAGE_LOAD_TIMEOUT_MS, DEFAULT_SCRIPT_TIMEOUT_MS, DEFAULT_SCROLL_PAUSE_MS,
    DEFAULT_WINDOW_SIZE,
};

/// The complete set of options the browser session recognizes.
///
/// Nothing else about the browser is exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub(crate) headless: bool,
    pub(crate) window_size: (u32, u32),
    pub(crate) disable_images: bool,
    pub(crate) page_load_timeout_ms: u64,
    pub(crate) script_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: DEFAULT_WINDOW_SIZE,
            disable_images: true,
            page_load_timeout_ms: DEFAULT_PAGE_LOAD_TIMEOUT_MS,
            script_timeout_ms: DEFAULT_SCRIPT_TIMEOUT_MS,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn window_size(&self) -> (u32, u32) {
        self.window_size
    }

    #[must_use]
    pub fn disable_images(&self) -> bool {
        self.disable_images
    }

    #[must_use]
    pub fn page_load_timeout_ms(&self) -> u64 {
        self.page_load_timeout_ms
    }

    #[must_use]
    pub fn script_timeout_ms(&self) -> u64 {
        self.script_timeout_ms
    }
}

/// Timing knobs of the navigation state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigatorSettings {
    /// Bounded wait for the category filter on the entry page.
    pub entry_timeout_ms: u64,
    /// Bounded wait for the material list after selecting a category.
    pub list_timeout_ms: u64,
    /// Pause after each scroll-to-bottom.
    pub scroll_pause_ms: u64,
    /// Cap on scroll rounds while waiting for the document height to settle.
    pub max_scroll_rounds: u32,
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self {
            entry_timeout_ms: DEFAULT_ENTRY_TIMEOUT_MS,
            list_timeout_ms: DEFAULT_LIST_TIMEOUT_MS,
            scroll_pause_ms: DEFAULT_SCROLL_PAUSE_MS,
            max_scroll_rounds: DEFAULT_MAX_SCROLL_ROUNDS,
        }
    }
}

/// Main configuration struct for a harvest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// SQLite file holding the persisted snapshot.
    pub(crate) database_path: PathBuf,
    /// Parent of the per-run `screenshots_<timestamp>` folders.
    pub(crate) diagnostics_root: PathBuf,
    /// Sources to visit, in order. Never empty.
    pub(crate) sources: Vec<Source>,
    pub(crate) session: SessionConfig,
    pub(crate) retry: RetryPolicy,
    pub(crate) navigator: NavigatorSettings,
    /// Write `debug_page_<source>.html` when the entry page never becomes ready.
    pub(crate) dump_page_on_entry_failure: bool,
    pub(crate) event_capacity: usize,

    /// Event bus for progress events
    #[serde(skip)]
    pub(crate) event_bus: Option<Arc<HarvestEventBus>>,
}

impl HarvestConfig {
    /// Attach an event bus the run publishes progress to.
    #[must_use]
    pub fn with_event_bus(mut self, bus: Arc<HarvestEventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }
}
