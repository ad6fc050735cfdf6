//! DOM-query capability used by the navigator and the action executor
//!
//! [`PageDriver`] speaks in semantic [`Target`]s ("category Aluminum", "the
//! second More info button under 5052 H32") rather than selectors, so the
//! state machine can be exercised against an in-memory catalog in tests and
//! against Chromium in production ([`chromium::ChromiumDriver`]).

pub mod chromium;
pub mod scripts;

pub use chromium::ChromiumDriver;

use async_trait::async_trait;
use std::fmt;

/// Result type alias for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Something on the page an action can be aimed at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Marker that the entry page (category filter) has rendered.
    ReadyMarker,
    Category(String),
    /// Marker that materials of the selected category are listed.
    MaterialList,
    Material {
        category: String,
        name: String,
    },
    VariantControl {
        category: String,
        material: String,
        index: usize,
    },
    /// Marker that a detail region has rendered.
    DetailReady,
    /// n-th close control of the detail modal, in profile order.
    CloseControl(usize),
    BackControl,
    ActiveFilter,
    FilterReset,
}

impl Target {
    /// Short token used in diagnostic artifact names.
    #[must_use]
    pub fn slug(&self) -> String {
        match self {
            Self::ReadyMarker => "ready".to_string(),
            Self::Category(name) => format!("category-{name}"),
            Self::MaterialList => "material-list".to_string(),
            Self::Material { name, .. } => format!("material-{name}"),
            Self::VariantControl {
                material, index, ..
            } => format!("variant-{material}-{index}"),
            Self::DetailReady => "detail".to_string(),
            Self::CloseControl(i) => format!("close-{i}"),
            Self::BackControl => "back".to_string(),
            Self::ActiveFilter => "active-filter".to_string(),
            Self::FilterReset => "filter-reset".to_string(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadyMarker => f.write_str("category filter"),
            Self::Category(name) => write!(f, "category '{name}'"),
            Self::MaterialList => f.write_str("material list"),
            Self::Material { category, name } => write!(f, "material '{name}' in '{category}'"),
            Self::VariantControl {
                material, index, ..
            } => write!(f, "more-info control #{} of '{material}'", index + 1),
            Self::DetailReady => f.write_str("detail region"),
            Self::CloseControl(i) => write!(f, "close control #{}", i + 1),
            Self::BackControl => f.write_str("return-to-list control"),
            Self::ActiveFilter => f.write_str("active filter pill"),
            Self::FilterReset => f.write_str("filter reset control"),
        }
    }
}

/// Named entity lists the navigator enumerates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameList {
    Categories,
    Materials { category: String },
}

/// Failures surfaced by a [`PageDriver`].
///
/// The variants map onto the executor's failure taxonomy; see
/// [`crate::executor::FailureKind::classify`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DriverError {
    #[error("{0} is not present")]
    NotFound(String),

    #[error("{0} is not interactable")]
    NotInteractable(String),

    #[error("click on {0} was intercepted by another element")]
    Intercepted(String),

    #[error("stale reference to {0} after DOM mutation")]
    Stale(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Session terminated, browser crashed, or the CDP channel is gone.
    #[error("browser session lost: {0}")]
    Fatal(String),

    /// Any other CDP or script failure, classified by message.
    #[error("{0}")]
    Other(String),
}

/// Live page operations the harvester needs.
///
/// Every method is a suspension point. Implementations must not retry
/// internally; retry policy belongs to the executor.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate and wait for the load event, bounded by the page-load timeout.
    async fn goto(&self, url: &str) -> DriverResult<()>;

    async fn click(&self, target: &Target) -> DriverResult<()>;

    async fn hover(&self, target: &Target) -> DriverResult<()>;

    async fn scroll_into_view(&self, target: &Target) -> DriverResult<()>;

    async fn is_present(&self, target: &Target) -> DriverResult<bool>;

    async fn is_visible(&self, target: &Target) -> DriverResult<bool>;

    /// Display names in DOM order.
    async fn names(&self, list: &NameList) -> DriverResult<Vec<String>>;

    /// Absolute `href` of a link target, `None` when the element is not a link.
    async fn link_href(&self, target: &Target) -> DriverResult<Option<String>>;

    /// Number of variant controls under an expanded material.
    async fn variant_count(&self, category: &str, material: &str) -> DriverResult<usize>;

    /// Outer HTML of the current detail region, if one is rendered.
    async fn region_html(&self) -> DriverResult<Option<String>>;

    async fn scroll_height(&self) -> DriverResult<u64>;

    async fn scroll_to_bottom(&self) -> DriverResult<()>;

    /// PNG bytes of the current viewport.
    async fn screenshot(&self) -> DriverResult<Vec<u8>>;

    /// Full serialized document, for raw page dumps.
    async fn page_source(&self) -> DriverResult<String>;
}
