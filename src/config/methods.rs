//! Builder methods available for all states
//!
//! This module contains methods that can be called on the builder
//! regardless of its current type state.

use super::builder::HarvestConfigBuilder;
use super::types::{NavigatorSettings, SessionConfig};
use crate::catalog::Source;
use crate::executor::RetryPolicy;

impl<State> HarvestConfigBuilder<State> {
    /// Restrict the run to a subset of sources.
    ///
    /// Sources are always visited in their fixed order regardless of the
    /// order given here.
    #[must_use]
    pub fn sources(mut self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.sources = sources.into_iter().collect();
        self
    }

    /// Set browser headless mode (visible vs invisible browser window)
    ///
    /// Headed mode is meant for watching a run while debugging selectors.
    /// It needs a display server and renders noticeably slower.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.session.headless = headless;
        self
    }

    #[must_use]
    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.session.window_size = (width, height);
        self
    }

    /// Skip image decoding in the browser.
    ///
    /// The catalogs are image heavy and none of the extracted fields live in
    /// images, so this is on by default.
    #[must_use]
    pub fn disable_images(mut self, disable: bool) -> Self {
        self.session.disable_images = disable;
        self
    }

    #[must_use]
    pub fn page_load_timeout_ms(mut self, ms: u64) -> Self {
        self.session.page_load_timeout_ms = ms;
        self
    }

    #[must_use]
    pub fn script_timeout_ms(mut self, ms: u64) -> Self {
        self.session.script_timeout_ms = ms;
        self
    }

    /// Replace all session options at once.
    #[must_use]
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Retry policy applied to every interactive action.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use kodegen_tools_catalogscrape::config::HarvestConfig;
    /// # use kodegen_tools_catalogscrape::executor::RetryPolicy;
    /// let config = HarvestConfig::builder()
    ///     .database_path("materials.db")
    ///     .diagnostics_root("diagnostics")
    ///     .retry_policy(RetryPolicy::new(3, 500))
    ///     .build()?;
    /// assert_eq!(config.retry_policy().max_retries, 3);
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    #[must_use]
    pub fn navigator_settings(mut self, settings: NavigatorSettings) -> Self {
        self.navigator = settings;
        self
    }

    #[must_use]
    pub fn entry_timeout_ms(mut self, ms: u64) -> Self {
        self.navigator.entry_timeout_ms = ms;
        self
    }

    #[must_use]
    pub fn scroll_pause_ms(mut self, ms: u64) -> Self {
        self.navigator.scroll_pause_ms = ms;
        self
    }

    /// Dump the raw entry page when its category filter never renders.
    #[must_use]
    pub fn dump_page_on_entry_failure(mut self, dump: bool) -> Self {
        self.dump_page_on_entry_failure = dump;
        self
    }

    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}
