use anyhow::Context as _;
use std::sync::Arc;
use std::time::Instant;

use super::{CancelToken, HarvestError, HarvestOutcome, SiteSummary};
use crate::catalog::SiteProfile;
use crate::config::HarvestConfig;
use crate::diagnostics::{DiagnosticsSink, FolderDiagnostics};
use crate::events::{HarvestEvent, Severity, ShutdownReason};
use crate::extraction::RecordSet;
use crate::merge::{self, SnapshotStore};
use crate::navigator::{Navigator, TraversalOutcome};
use crate::session::{ChromiumSessions, SessionFactory};

/// Run a full harvest against Chromium.
pub async fn run_harvest(config: &HarvestConfig, cancel: CancelToken) -> Result<HarvestOutcome, HarvestError> {
    let sessions = ChromiumSessions::new(config.session().clone());
    run_harvest_with(config, &sessions, cancel).await
}

/// Run a full harvest with sessions from `sessions`.
///
/// Sites run sequentially. Any error, including cancellation, returns before
/// the store is opened, so the previous snapshot stays untouched.
pub async fn run_harvest_with(
    config: &HarvestConfig,
    sessions: &dyn SessionFactory,
    cancel: CancelToken,
) -> Result<HarvestOutcome, HarvestError> {
    let started = Instant::now();
    let bus = config.event_bus().cloned();
    let folder = FolderDiagnostics::create(config.diagnostics_root(), bus.clone())
        .with_context(|| format!("Failed to create diagnostics folder under {}", config.diagnostics_root().display()))?;
    let run_dir = folder.run_dir().to_path_buf();
    let sink: Arc<dyn DiagnosticsSink> = Arc::new(folder);

    sink.log_event(HarvestEvent::run_started(config.sources().to_vec(), run_dir));

    let result = match harvest_sites(config, sessions, &sink, &cancel).await {
        Ok((records, sites)) if !cancel.is_cancelled() => commit_run(config, records, sites, started, &sink).await,
        Ok(_) => Err(HarvestError::Cancelled),
        Err(e) => Err(e),
    };

    let reason = match &result {
        Ok(_) => ShutdownReason::RunCompleted,
        Err(HarvestError::Cancelled) => {
            sink.log(Severity::Warn, "Run cancelled; snapshot left unchanged".to_string());
            ShutdownReason::Cancelled
        }
        Err(e) => {
            sink.log(Severity::Error, format!("Run aborted: {e}; snapshot left unchanged"));
            ShutdownReason::Error(e.to_string())
        }
    };
    if let Some(bus) = bus {
        bus.shutdown(reason);
    }
    result
}

async fn harvest_sites(
    config: &HarvestConfig,
    sessions: &dyn SessionFactory,
    sink: &Arc<dyn DiagnosticsSink>,
    cancel: &CancelToken,
) -> Result<(RecordSet, Vec<SiteSummary>), HarvestError> {
    let mut merged = RecordSet::new();
    let mut sites = Vec::with_capacity(config.sources().len());

    for &source in config.sources() {
        if cancel.is_cancelled() {
            return Err(HarvestError::Cancelled);
        }
        sink.log_event(HarvestEvent::site_started(source));

        let outcome = harvest_site(config, sessions, source.profile(), sink, cancel).await?;
        let summary = SiteSummary {
            source,
            records: outcome.records.len(),
            materials_visited: outcome.materials_visited,
            failed_materials: outcome.failed_materials,
        };
        let kept = merged.extend(outcome.records);
        if kept < summary.records {
            log::debug!(
                "{source}: {} records already harvested from an earlier site",
                summary.records - kept
            );
        }
        sink.log_event(HarvestEvent::site_completed(
            source,
            summary.records,
            summary.materials_visited,
        ));
        sites.push(summary);
    }
    Ok((merged, sites))
}

/// Traverse one site. The session is released on every path.
async fn harvest_site(
    config: &HarvestConfig,
    sessions: &dyn SessionFactory,
    profile: &'static SiteProfile,
    sink: &Arc<dyn DiagnosticsSink>,
    cancel: &CancelToken,
) -> Result<TraversalOutcome, HarvestError> {
    let mut session = sessions.acquire(profile, Arc::clone(sink)).await?;

    let navigator = Navigator::new(
        session.driver(),
        Arc::clone(sink),
        profile,
        *config.retry_policy(),
        config.navigator().clone(),
        cancel.clone(),
    )
    .with_entry_page_dump(config.dump_page_on_entry_failure());
    let result = navigator.run().await;

    session.release().await;
    result.map_err(HarvestError::from)
}

async fn commit_run(
    config: &HarvestConfig,
    records: RecordSet,
    sites: Vec<SiteSummary>,
    started: Instant,
    sink: &Arc<dyn DiagnosticsSink>,
) -> Result<HarvestOutcome, HarvestError> {
    let records = records.into_vec();
    let store = SnapshotStore::open(config.database_path()).await?;
    let committed = merge::commit(&store, &records).await;
    store.close().await;
    let report = committed?;

    sink.log_event(HarvestEvent::run_completed(
        records.len(),
        report.added_count,
        started.elapsed(),
    ));
    Ok(HarvestOutcome {
        records,
        report,
        sites,
    })
}
