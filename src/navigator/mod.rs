//! Navigation state machine
//!
//! [`Navigator`] walks one site's catalog as explicit [`NavState`]
//! transitions over a [`PageDriver`](crate::driver::PageDriver), so the whole
//! traversal runs against an in-memory catalog in tests.
//!
//! Failures are isolated per material and per category. Only fatal browser
//! failures, an entry page that never renders, and cancellation end a
//! traversal early.

pub mod machine;
pub mod progress;
pub mod state;

pub use machine::Navigator;
pub use progress::TraversalProgress;
pub use state::NavState;

use crate::catalog::Source;
use crate::extraction::SpecRecord;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("{site}: category filter did not render within {timeout_ms}ms")]
    EntryTimeout { site: Source, timeout_ms: u64 },

    #[error("browser session lost: {0}")]
    Fatal(String),

    #[error("traversal cancelled")]
    Cancelled,
}

/// Result of traversing one site.
#[derive(Debug, Clone)]
pub struct TraversalOutcome {
    pub source: Source,
    /// Deduplicated records in harvest order.
    pub records: Vec<SpecRecord>,
    pub materials_visited: usize,
    /// Materials that ended with a sentinel because processing failed.
    pub failed_materials: usize,
    pub transitions: usize,
}
