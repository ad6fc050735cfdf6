pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod events;
pub mod executor;
pub mod extraction;
pub mod harvest;
pub mod merge;
pub mod navigator;
pub mod session;
pub mod utils;

pub use catalog::{SiteProfile, Source};
pub use config::{HarvestConfig, NavigatorSettings, SessionConfig};
pub use diagnostics::{DiagnosticsSink, FolderDiagnostics, MemorySink};
pub use driver::{ChromiumDriver, DriverError, NameList, PageDriver, Target};
pub use events::{HarvestEvent, HarvestEventBus, Severity, ShutdownReason};
pub use executor::{Action, ActionError, ActionExecutor, FailureKind, RetryPolicy};
pub use extraction::{MechanicalProperty, RecordSet, SpecRecord};
pub use harvest::{
    CancelToken, HarvestError, HarvestOutcome, HarvestRequest, Harvester, SiteSummary, run_harvest,
    run_harvest_with,
};
pub use merge::{COLUMNS, CatalogRow, ChangeReport, SnapshotStore, StoreError};
pub use navigator::{NavState, NavigationError, Navigator, TraversalOutcome};
pub use session::{ChromiumSessions, SessionError, SessionFactory, SessionHandle, SiteSession};

/// Run a full harvest and wait for it.
pub async fn harvest(config: HarvestConfig) -> Result<HarvestOutcome, HarvestError> {
    Harvester::new(config).start().await
}
