//! Event type definitions for the harvest event stream

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::catalog::Source;
use crate::executor::FailureKind;

/// Reason for event bus shutdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShutdownReason {
    /// Run completed and the merged set was committed
    RunCompleted,
    /// Run aborted on a fatal error
    Error(String),
    /// Run was cancelled by the control surface
    Cancelled,
}

/// How loudly an event should be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// Event types emitted during a harvest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HarvestEvent {
    RunStarted {
        sources: Vec<Source>,
        diagnostics_dir: PathBuf,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    SiteStarted {
        source: Source,
        entry_url: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    CategoriesDiscovered {
        source: Source,
        categories: Vec<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    CategoryStarted {
        source: Source,
        category: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// A material was processed and produced `records` rows.
    MaterialHarvested {
        source: Source,
        category: String,
        material: String,
        records: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// A material failed and was recorded with the sentinel row only.
    MaterialSkipped {
        source: Source,
        category: String,
        material: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    CategoryFailed {
        source: Source,
        category: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// An action hit a transient failure and will be retried.
    ActionRetried {
        action: String,
        target: String,
        kind: FailureKind,
        attempt: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    ArtifactCaptured {
        path: PathBuf,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Free-form diagnostic line for the log display.
    Diagnostic {
        severity: Severity,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    SiteCompleted {
        source: Source,
        records: usize,
        materials_visited: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    RunCompleted {
        total_records: usize,
        added_count: usize,
        duration: std::time::Duration,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Signals that the event bus is shutting down
    ///
    /// Subscribers should exit their event loops when receiving this event.
    Shutdown {
        reason: ShutdownReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl HarvestEvent {
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::MaterialSkipped { .. } | Self::CategoryFailed { .. } | Self::ActionRetried { .. } => {
                Severity::Warn
            }
            Self::ArtifactCaptured { .. } => Severity::Debug,
            Self::Diagnostic { severity, .. } => *severity,
            Self::Shutdown {
                reason: ShutdownReason::Error(_),
                ..
            } => Severity::Error,
            _ => Severity::Info,
        }
    }

    /// One-line human readable rendering for log displays.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::RunStarted { sources, .. } => {
                let names: Vec<_> = sources.iter().map(|s| s.label()).collect();
                format!("Run started for {}", names.join(", "))
            }
            Self::SiteStarted { source, entry_url, .. } => format!("{source}: loading {entry_url}"),
            Self::CategoriesDiscovered {
                source, categories, ..
            } => format!("{source}: {} categories found", categories.len()),
            Self::CategoryStarted { source, category, .. } => {
                format!("{source}: processing category '{category}'")
            }
            Self::MaterialHarvested {
                source,
                category,
                material,
                records,
                ..
            } => format!("{source}: {category} / {material} -> {records} record(s)"),
            Self::MaterialSkipped {
                source,
                category,
                material,
                reason,
                ..
            } => format!("{source}: skipped {category} / {material}: {reason}"),
            Self::CategoryFailed {
                source,
                category,
                reason,
                ..
            } => format!("{source}: category '{category}' failed: {reason}"),
            Self::ActionRetried {
                action,
                target,
                kind,
                attempt,
                ..
            } => format!("{action} on {target} failed ({}), attempt {attempt}", kind.slug()),
            Self::ArtifactCaptured { path, .. } => format!("Saved {}", path.display()),
            Self::Diagnostic { message, .. } => message.clone(),
            Self::SiteCompleted {
                source,
                records,
                materials_visited,
                ..
            } => format!("{source}: done, {records} record(s) from {materials_visited} material(s)"),
            Self::RunCompleted {
                total_records,
                added_count,
                duration,
                ..
            } => format!(
                "Run completed in {:.1}s: {total_records} record(s), {added_count} new",
                duration.as_secs_f64()
            ),
            Self::Shutdown { reason, .. } => format!("Shutdown: {reason:?}"),
        }
    }
}

/// Helper functions for creating common events
impl HarvestEvent {
    #[must_use]
    pub fn run_started(sources: Vec<Source>, diagnostics_dir: PathBuf) -> Self {
        Self::RunStarted {
            sources,
            diagnostics_dir,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn site_started(source: Source) -> Self {
        Self::SiteStarted {
            source,
            entry_url: source.profile().entry_url.to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn categories_discovered(source: Source, categories: Vec<String>) -> Self {
        Self::CategoriesDiscovered {
            source,
            categories,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn category_started(source: Source, category: &str) -> Self {
        Self::CategoryStarted {
            source,
            category: category.to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn material_harvested(source: Source, category: &str, material: &str, records: usize) -> Self {
        Self::MaterialHarvested {
            source,
            category: category.to_string(),
            material: material.to_string(),
            records,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn material_skipped(source: Source, category: &str, material: &str, reason: String) -> Self {
        Self::MaterialSkipped {
            source,
            category: category.to_string(),
            material: material.to_string(),
            reason,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn category_failed(source: Source, category: &str, reason: String) -> Self {
        Self::CategoryFailed {
            source,
            category: category.to_string(),
            reason,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn action_retried(action: &str, target: &str, kind: FailureKind, attempt: u32) -> Self {
        Self::ActionRetried {
            action: action.to_string(),
            target: target.to_string(),
            kind,
            attempt,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn artifact_captured(path: PathBuf) -> Self {
        Self::ArtifactCaptured {
            path,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn diagnostic(severity: Severity, message: impl Into<String>) -> Self {
        Self::Diagnostic {
            severity,
            message: message.into(),
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn site_completed(source: Source, records: usize, materials_visited: usize) -> Self {
        Self::SiteCompleted {
            source,
            records,
            materials_visited,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn run_completed(total_records: usize, added_count: usize, duration: std::time::Duration) -> Self {
        Self::RunCompleted {
            total_records,
            added_count,
            duration,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Create a Shutdown event
    #[must_use]
    pub fn shutdown(reason: ShutdownReason) -> Self {
        Self::Shutdown {
            reason,
            timestamp: chrono::Utc::now(),
        }
    }
}
