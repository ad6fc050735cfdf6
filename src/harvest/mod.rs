//! Run orchestration
//!
//! A run visits every configured source in order, one browser session per
//! site, merges the per-site records, and commits the merged set against the
//! persisted snapshot. [`Harvester::start`] spawns the run and hands back a
//! [`HarvestRequest`] that can be awaited, cancelled, or subscribed to.

pub mod cancel;
pub mod request;
pub mod run;

pub use cancel::CancelToken;
pub use request::HarvestRequest;
pub use run::{run_harvest, run_harvest_with};

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::catalog::Source;
use crate::config::HarvestConfig;
use crate::events::HarvestEventBus;
use crate::extraction::SpecRecord;
use crate::merge::{ChangeReport, StoreError};
use crate::navigator::NavigationError;
use crate::session::SessionError;

/// Errors that end a run without committing.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Navigation(NavigationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("harvest cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<NavigationError> for HarvestError {
    fn from(e: NavigationError) -> Self {
        match e {
            NavigationError::Cancelled => Self::Cancelled,
            other => Self::Navigation(other),
        }
    }
}

/// Per-site totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteSummary {
    pub source: Source,
    /// Records this site produced before the cross-site merge.
    pub records: usize,
    pub materials_visited: usize,
    pub failed_materials: usize,
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct HarvestOutcome {
    /// Merged records in harvest order, as committed.
    pub records: Vec<SpecRecord>,
    pub report: ChangeReport,
    pub sites: Vec<SiteSummary>,
}

/// Spawns harvest runs on the current tokio runtime.
#[derive(Debug, Clone)]
pub struct Harvester {
    config: HarvestConfig,
}

impl Harvester {
    #[must_use]
    pub fn new(config: HarvestConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Spawn the run against Chromium.
    ///
    /// An event bus is created from `event_capacity` when the config carries
    /// none, so the returned request can always be subscribed to.
    #[must_use]
    pub fn start(self) -> HarvestRequest {
        let bus = match self.config.event_bus() {
            Some(bus) => Arc::clone(bus),
            None => Arc::new(HarvestEventBus::new(self.config.event_capacity())),
        };
        let config = self.config.with_event_bus(Arc::clone(&bus));
        let cancel = CancelToken::new();
        let (tx, rx) = oneshot::channel();

        let token = cancel.clone();
        tokio::spawn(async move {
            let result = run_harvest(&config, token).await;
            let _ = tx.send(result);
        });

        HarvestRequest::new(rx, cancel, bus)
    }
}
