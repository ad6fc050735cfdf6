//! Injected diagnostics: event logging and write-only artifacts
//!
//! Components never log through globals; they receive a [`DiagnosticsSink`]
//! and report through it. [`FolderDiagnostics`] is the production sink,
//! [`MemorySink`] keeps everything in memory for embedding and tests.

pub mod folder;
pub mod page_dump;

pub use folder::FolderDiagnostics;
pub use page_dump::{BLOCK_PHRASES, detect_block_signals, dump_entry_page};

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::driver::PageDriver;
use crate::events::{HarvestEvent, Severity};
use crate::utils::artifact_file_name;

/// Capability handed to every component that reports progress or failures.
#[async_trait]
pub trait DiagnosticsSink: Send + Sync {
    fn log_event(&self, event: HarvestEvent);

    /// Persist an artifact under `name` and return where it went.
    async fn capture_artifact(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf>;

    fn log(&self, severity: Severity, message: String) {
        self.log_event(HarvestEvent::diagnostic(severity, message));
    }
}

/// Timestamp component of artifact names, millisecond resolution.
#[must_use]
pub fn artifact_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S_%3f").to_string()
}

/// Screenshot the page and hand it to the sink, best-effort.
///
/// Failures are logged and swallowed: a missing screenshot must never turn a
/// recoverable failure into a fatal one.
pub async fn capture_screenshot<D>(
    driver: &D,
    sink: &dyn DiagnosticsSink,
    action: &str,
    target: &str,
) -> Option<PathBuf>
where
    D: PageDriver + ?Sized,
{
    let name = artifact_file_name(action, target, &artifact_timestamp(), "png");
    let bytes = match driver.screenshot().await {
        Ok(bytes) => bytes,
        Err(e) => {
            sink.log(Severity::Warn, format!("Could not capture screenshot '{name}': {e}"));
            return None;
        }
    };
    match sink.capture_artifact(&name, &bytes).await {
        Ok(path) => Some(path),
        Err(e) => {
            sink.log(Severity::Warn, format!("Could not save screenshot '{name}': {e}"));
            None
        }
    }
}

/// In-memory sink that records events and artifact names.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<HarvestEvent>>,
    artifacts: Mutex<Vec<(String, usize)>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<HarvestEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Names of captured artifacts, in capture order.
    #[must_use]
    pub fn artifact_names(&self) -> Vec<String> {
        self.artifacts
            .lock()
            .map(|a| a.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DiagnosticsSink for MemorySink {
    fn log_event(&self, event: HarvestEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    async fn capture_artifact(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        if let Ok(mut artifacts) = self.artifacts.lock() {
            artifacts.push((name.to_string(), bytes.len()));
        }
        Ok(PathBuf::from(name))
    }
}
