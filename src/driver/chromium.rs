//! Chromium implementation of [`PageDriver`] over chromiumoxide

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide_cdp::cdp::browser_protocol::input::{DispatchMouseEventParams, DispatchMouseEventType};
use chromiumoxide_cdp::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::error::CdpError;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::trace;

use super::scripts::{HoverPoint, ScriptReply, ScriptRequest, resolve_target};
use super::{DriverError, DriverResult, NameList, PageDriver, Target};
use crate::catalog::SiteProfile;
use crate::config::SessionConfig;
use crate::executor::failure::is_fatal_message;

/// Drives one live page against one site profile.
#[derive(Clone)]
pub struct ChromiumDriver {
    page: Page,
    profile: &'static SiteProfile,
    page_load_timeout: Duration,
    script_timeout: Duration,
}

impl ChromiumDriver {
    #[must_use]
    pub fn new(page: Page, profile: &'static SiteProfile, session: &SessionConfig) -> Self {
        Self {
            page,
            profile,
            page_load_timeout: Duration::from_millis(session.page_load_timeout_ms()),
            script_timeout: Duration::from_millis(session.script_timeout_ms()),
        }
    }

    #[must_use]
    pub fn profile(&self) -> &'static SiteProfile {
        self.profile
    }

    #[must_use]
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Bound a CDP round trip by `limit`, mapping both failure modes.
    async fn bounded<F, T>(&self, limit: Duration, operation: &str, fut: F) -> DriverResult<T>
    where
        F: Future<Output = Result<T, CdpError>>,
    {
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(map_cdp_error),
            Err(_) => Err(DriverError::Timeout {
                operation: operation.to_string(),
                timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }

    async fn bridge(&self, request: &ScriptRequest<'_>) -> DriverResult<ScriptReply> {
        let expression = request.to_expression()?;
        trace!(target: "catalogscrape::driver", op = request.op, "evaluating bridge script");
        let result = self
            .bounded(self.script_timeout, request.op, self.page.evaluate(expression.as_str()))
            .await?;
        result
            .into_value::<ScriptReply>()
            .map_err(|e| DriverError::Other(format!("Malformed bridge reply for '{}': {e}", request.op)))
    }

    async fn on_target(&self, op: &'static str, target: &Target) -> DriverResult<serde_json::Value> {
        let resolve = resolve_target(self.profile, target)
            .ok_or_else(|| DriverError::NotFound(target.to_string()))?;
        self.bridge(&ScriptRequest::on(op, resolve))
            .await?
            .into_value(target)
    }

    async fn query<T: DeserializeOwned>(&self, request: &ScriptRequest<'_>, what: &Target) -> DriverResult<T> {
        let value = self.bridge(request).await?.into_value(what)?;
        serde_json::from_value(value)
            .map_err(|e| DriverError::Other(format!("Unexpected '{}' result: {e}", request.op)))
    }
}

/// CDP errors that mean the browser is gone become [`DriverError::Fatal`].
fn map_cdp_error(err: CdpError) -> DriverError {
    let message = err.to_string();
    if is_fatal_message(&message) {
        DriverError::Fatal(message)
    } else {
        DriverError::Other(message)
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn goto(&self, url: &str) -> DriverResult<()> {
        let operation = format!("navigation to {url}");
        self.bounded(self.page_load_timeout, &operation, self.page.goto(url))
            .await
            .map(|_| ())
    }

    async fn click(&self, target: &Target) -> DriverResult<()> {
        self.on_target("click", target).await.map(|_| ())
    }

    /// Move the real mouse pointer over the target so `:hover` menus open.
    async fn hover(&self, target: &Target) -> DriverResult<()> {
        let value = self.on_target("hover", target).await?;
        let point: HoverPoint = serde_json::from_value(value)
            .map_err(|e| DriverError::Other(format!("Unexpected 'hover' result: {e}")))?;
        let params = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseMoved)
            .x(point.x)
            .y(point.y)
            .build()
            .map_err(DriverError::Other)?;
        self.bounded(self.script_timeout, "hover", self.page.execute(params))
            .await
            .map(|_| ())
    }

    async fn scroll_into_view(&self, target: &Target) -> DriverResult<()> {
        self.on_target("scroll", target).await.map(|_| ())
    }

    async fn is_present(&self, target: &Target) -> DriverResult<bool> {
        if resolve_target(self.profile, target).is_none() {
            return Ok(false);
        }
        let value = self.on_target("present", target).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn is_visible(&self, target: &Target) -> DriverResult<bool> {
        if resolve_target(self.profile, target).is_none() {
            return Ok(false);
        }
        let value = self.on_target("visible", target).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn link_href(&self, target: &Target) -> DriverResult<Option<String>> {
        let value = self.on_target("href", target).await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn names(&self, list: &NameList) -> DriverResult<Vec<String>> {
        let what = match list {
            NameList::Categories => Target::ReadyMarker,
            NameList::Materials { category } => Target::Category(category.clone()),
        };
        self.query(&ScriptRequest::names(self.profile, list), &what).await
    }

    async fn variant_count(&self, category: &str, material: &str) -> DriverResult<usize> {
        let target = Target::VariantControl {
            category: category.to_string(),
            material: material.to_string(),
            index: 0,
        };
        let Some(resolve) = resolve_target(self.profile, &target) else {
            return Ok(0);
        };
        self.query(&ScriptRequest::on("count", resolve), &target).await
    }

    async fn region_html(&self) -> DriverResult<Option<String>> {
        self.query(&ScriptRequest::region(self.profile), &Target::DetailReady)
            .await
    }

    async fn scroll_height(&self) -> DriverResult<u64> {
        let height: f64 = self
            .query(&ScriptRequest::op("height"), &Target::MaterialList)
            .await?;
        Ok(height.max(0.0) as u64)
    }

    async fn scroll_to_bottom(&self) -> DriverResult<()> {
        self.bridge(&ScriptRequest::op("bottom"))
            .await?
            .into_value(&Target::MaterialList)
            .map(|_| ())
    }

    async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        let params = CaptureScreenshotParams {
            format: Some(CaptureScreenshotFormat::Png),
            ..Default::default()
        };
        self.bounded(self.script_timeout, "screenshot", self.page.screenshot(params))
            .await
    }

    async fn page_source(&self) -> DriverResult<String> {
        self.bounded(self.script_timeout, "page content", self.page.content())
            .await
    }
}
