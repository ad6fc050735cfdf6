//! Browser session lifecycle
//!
//! [`SessionHandle::acquire`] launches one Chromium instance, health-checks
//! it and opens the single page the harvest runs on. [`SessionHandle::release`]
//! is idempotent and captures a final screenshot before tearing the browser
//! down. If the owning task is aborted before release, [`BrowserWrapper`]'s
//! `Drop` still stops the handler and removes the temp profile.

pub mod factory;
pub mod launch;
pub mod wrapper;

pub use factory::{ChromiumSessions, SessionFactory, SiteSession};
pub use launch::{download_managed_browser, find_browser_executable, launch_browser};
pub use wrapper::BrowserWrapper;

use chromiumoxide::Page;
use chromiumoxide_cdp::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::catalog::SiteProfile;
use crate::config::SessionConfig;
use crate::diagnostics::{DiagnosticsSink, artifact_timestamp};
use crate::driver::ChromiumDriver;
use crate::events::Severity;
use crate::utils::artifact_file_name;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Browser binary missing, failed to start, or failed its health check.
    #[error("browser session could not be started: {0}")]
    Init(String),

    #[error("browser session already released")]
    Released,
}

/// One live browser session and its working page.
pub struct SessionHandle {
    wrapper: Option<BrowserWrapper>,
    page: Option<Page>,
    config: SessionConfig,
    sink: Arc<dyn DiagnosticsSink>,
}

impl SessionHandle {
    /// Launch and health-check a browser configured from `config`.
    pub async fn acquire(config: &SessionConfig, sink: Arc<dyn DiagnosticsSink>) -> Result<Self, SessionError> {
        let (browser, handler, user_data_dir) = launch_browser(config)
            .await
            .map_err(|e| SessionError::Init(format!("{e:#}")))?;
        let mut wrapper = BrowserWrapper::new(browser, handler, user_data_dir);

        let version = match wrapper.browser().version().await {
            Ok(version) => version,
            Err(e) => {
                wrapper.shutdown().await;
                return Err(SessionError::Init(format!("health check failed: {e}")));
            }
        };
        info!("Browser ready: {}", version.product);

        let page = match wrapper.browser().new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                wrapper.shutdown().await;
                return Err(SessionError::Init(format!("failed to open page: {e}")));
            }
        };

        Ok(Self {
            wrapper: Some(wrapper),
            page: Some(page),
            config: config.clone(),
            sink,
        })
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.wrapper.is_none()
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Driver for `profile` over this session's page.
    pub fn driver(&self, profile: &'static SiteProfile) -> Result<Arc<ChromiumDriver>, SessionError> {
        let page = self.page.clone().ok_or(SessionError::Released)?;
        Ok(Arc::new(ChromiumDriver::new(page, profile, &self.config)))
    }

    /// Capture a final screenshot and shut the browser down.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub async fn release(&mut self) {
        let Some(mut wrapper) = self.wrapper.take() else {
            debug!("Session already released");
            return;
        };
        if let Some(page) = self.page.take() {
            self.final_screenshot(&page).await;
        }
        info!("Releasing browser session");
        wrapper.shutdown().await;
    }

    async fn final_screenshot(&self, page: &Page) {
        let params = CaptureScreenshotParams {
            format: Some(CaptureScreenshotFormat::Png),
            ..Default::default()
        };
        let limit = Duration::from_millis(self.config.script_timeout_ms());
        let bytes = match tokio::time::timeout(limit, page.screenshot(params)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                self.sink
                    .log(Severity::Warn, format!("Final screenshot failed: {e}"));
                return;
            }
            Err(_) => {
                self.sink
                    .log(Severity::Warn, "Final screenshot timed out".to_string());
                return;
            }
        };
        let name = artifact_file_name("release", "session", &artifact_timestamp(), "png");
        if let Err(e) = self.sink.capture_artifact(&name, &bytes).await {
            self.sink
                .log(Severity::Warn, format!("Could not save final screenshot: {e}"));
        }
    }
}
