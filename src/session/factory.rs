//! Session acquisition as a seam
//!
//! The harvest loop asks a [`SessionFactory`] for one [`SiteSession`] per
//! site. [`ChromiumSessions`] launches a real browser; tests hand in a
//! factory over an in-memory catalog.

use async_trait::async_trait;
use std::sync::Arc;

use super::{SessionError, SessionHandle};
use crate::catalog::SiteProfile;
use crate::config::SessionConfig;
use crate::diagnostics::DiagnosticsSink;
use crate::driver::PageDriver;

/// A live session bound to one site profile.
#[async_trait]
pub trait SiteSession: Send {
    fn driver(&self) -> Arc<dyn PageDriver>;

    /// Tear the session down. Must be idempotent.
    async fn release(&mut self);
}

#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn acquire(
        &self,
        profile: &'static SiteProfile,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Result<Box<dyn SiteSession>, SessionError>;
}

/// Production factory: one Chromium instance per site.
#[derive(Debug, Clone)]
pub struct ChromiumSessions {
    config: SessionConfig,
}

impl ChromiumSessions {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }
}

struct ChromiumSite {
    handle: SessionHandle,
    driver: Arc<dyn PageDriver>,
}

#[async_trait]
impl SiteSession for ChromiumSite {
    fn driver(&self) -> Arc<dyn PageDriver> {
        Arc::clone(&self.driver)
    }

    async fn release(&mut self) {
        self.handle.release().await;
    }
}

#[async_trait]
impl SessionFactory for ChromiumSessions {
    async fn acquire(
        &self,
        profile: &'static SiteProfile,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Result<Box<dyn SiteSession>, SessionError> {
        let mut handle = SessionHandle::acquire(&self.config, sink).await?;
        let driver: Arc<dyn PageDriver> = match handle.driver(profile) {
            Ok(driver) => driver,
            Err(e) => {
                handle.release().await;
                return Err(e);
            }
        };
        Ok(Box::new(ChromiumSite { handle, driver }))
    }
}
