//! Shared configuration constants for catalogscrape
//!
//! This module contains default values and timing constants used
//! throughout the harvester to ensure consistency and avoid magic numbers.

/// Default retry budget for interactive actions: 5 attempts
///
/// Rendered catalogs mutate the DOM while filters animate, so a click
/// that fails once usually lands on the second or third try.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Fixed delay between action retries: 2 seconds
pub const DEFAULT_BACKOFF_MS: u64 = 2_000;

/// Explicit wait applied when an element is not yet present: 10 seconds
pub const DEFAULT_LOAD_TIMEOUT_MS: u64 = 10_000;

/// Page load budget for `goto` navigations: 60 seconds
pub const DEFAULT_PAGE_LOAD_TIMEOUT_MS: u64 = 60_000;

/// Budget for a single `Runtime.evaluate` round trip: 30 seconds
pub const DEFAULT_SCRIPT_TIMEOUT_MS: u64 = 30_000;

/// Bounded wait for the category filter on the entry page: 60 seconds
///
/// Timing out here is fatal for the site; no categories means no work.
pub const DEFAULT_ENTRY_TIMEOUT_MS: u64 = 60_000;

/// Bounded wait for the material list after a category selection: 30 seconds
pub const DEFAULT_LIST_TIMEOUT_MS: u64 = 30_000;

/// Pause after each scroll-to-bottom while lazy content materializes
pub const DEFAULT_SCROLL_PAUSE_MS: u64 = 1_000;

/// Upper bound on scroll rounds before the document height is declared stable
pub const DEFAULT_MAX_SCROLL_ROUNDS: u32 = 25;

/// Interval used by every polling wait
pub const POLL_INTERVAL_MS: u64 = 250;

/// Default browser viewport
pub const DEFAULT_WINDOW_SIZE: (u32, u32) = (1920, 1080);

/// Thickness placeholder for materials without any structured layout
pub const SENTINEL_THICKNESS: &str = "N/A";

/// Default database file for the persisted snapshot
pub const DEFAULT_DATABASE_FILE: &str = "materials.db";

/// Table holding the authoritative merged dataset
pub const SNAPSHOT_TABLE: &str = "materials_combined";

/// Prefix of the per-run diagnostics folder (`screenshots_%Y-%m-%d_%H-%M-%S`)
pub const DIAGNOSTICS_DIR_PREFIX: &str = "screenshots";

/// Chrome user agent string presented by the controlled browser
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";
