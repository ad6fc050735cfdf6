use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::DiagnosticsSink;
use crate::events::{EventBusError, HarvestEvent, HarvestEventBus, Severity};
use crate::utils::DIAGNOSTICS_DIR_PREFIX;

/// Production sink: tracing output, optional event bus fan-out, and a
/// per-run folder `screenshots_%Y-%m-%d_%H-%M-%S` for artifacts.
#[derive(Debug, Clone)]
pub struct FolderDiagnostics {
    run_dir: PathBuf,
    bus: Option<Arc<HarvestEventBus>>,
}

impl FolderDiagnostics {
    /// Create the run folder under `root`.
    pub fn create(root: &Path, bus: Option<Arc<HarvestEventBus>>) -> io::Result<Self> {
        let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
        let run_dir = root.join(format!("{DIAGNOSTICS_DIR_PREFIX}_{stamp}"));
        std::fs::create_dir_all(&run_dir)?;
        info!(target: "catalogscrape::diagnostics", "Diagnostics folder: {}", run_dir.display());
        Ok(Self { run_dir, bus })
    }

    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

#[async_trait]
impl DiagnosticsSink for FolderDiagnostics {
    fn log_event(&self, event: HarvestEvent) {
        let line = event.summary();
        match event.severity() {
            Severity::Debug => debug!(target: "catalogscrape::run", "{line}"),
            Severity::Info => info!(target: "catalogscrape::run", "{line}"),
            Severity::Warn => warn!(target: "catalogscrape::run", "{line}"),
            Severity::Error => error!(target: "catalogscrape::run", "{line}"),
        }
        if let Some(bus) = &self.bus {
            match bus.publish(event) {
                Ok(_) | Err(EventBusError::NoSubscribers) => {}
                Err(e) => debug!(target: "catalogscrape::run", "Event not published: {e}"),
            }
        }
    }

    async fn capture_artifact(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.run_dir.join(name);
        tokio::fs::write(&path, bytes).await?;
        self.log_event(HarvestEvent::artifact_captured(path.clone()));
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn artifacts_land_in_timestamped_run_folder() {
        let root = tempfile::tempdir().expect("tempdir");
        let sink = FolderDiagnostics::create(root.path(), None).expect("create");

        let dir_name = sink
            .run_dir()
            .file_name()
            .and_then(|n| n.to_str())
            .expect("utf-8 dir name")
            .to_string();
        assert!(dir_name.starts_with("screenshots_"));

        let path = sink
            .capture_artifact("click_x_1.png", b"\x89PNG")
            .await
            .expect("write artifact");
        assert_eq!(path.parent(), Some(sink.run_dir()));
        assert_eq!(std::fs::read(&path).expect("read back"), b"\x89PNG");
    }

    #[tokio::test]
    async fn events_reach_bus_subscribers() {
        let root = tempfile::tempdir().expect("tempdir");
        let bus = Arc::new(HarvestEventBus::new(16));
        let mut rx = bus.subscribe();
        let sink = FolderDiagnostics::create(root.path(), Some(bus)).expect("create");

        sink.log(Severity::Warn, "filter reset failed".to_string());
        let event = rx.recv().await.expect("event");
        assert_eq!(event.summary(), "filter reset failed");
    }
}
