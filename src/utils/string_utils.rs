//! Text normalization helpers shared by the driver, extraction and diagnostics layers
//!
//! Labels scraped from rendered catalogs carry layout whitespace, non-breaking
//! spaces and inconsistent casing. Everything that compares names goes through
//! these helpers so the browser side and the Rust side agree on identity.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\u{00A0}]+").expect("Invalid whitespace regex"));

/// Safely truncate a string to a maximum number of CHARACTERS (not bytes).
///
/// Never panics on multi-byte characters.
///
/// # Examples
/// ```
/// # use kodegen_tools_catalogscrape::utils::string_utils::safe_truncate_chars;
/// assert_eq!(safe_truncate_chars("Hello, World!", 5), "Hello");
/// assert_eq!(safe_truncate_chars("Hi", 100), "Hi");
/// ```
#[inline]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        None => s,
        Some((byte_idx, _)) => &s[..byte_idx],
    }
}

/// Collapse every whitespace run (including `&nbsp;`) into one space and trim.
#[must_use]
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s.trim(), " ").trim().to_string()
}

/// Build the deterministic file name of a diagnostic artifact.
///
/// Format: `<action>_<target>_<timestamp>.<ext>`, with characters that are
/// illegal on common filesystems replaced by `_` and the target capped at
/// 80 characters.
#[must_use]
pub fn artifact_file_name(action: &str, target: &str, timestamp: &str, ext: &str) -> String {
    let target = collapse_whitespace(target).replace(' ', "_");
    let target = safe_truncate_chars(&target, 80);
    let raw = format!("{action}_{target}_{timestamp}.{ext}");
    sanitize_filename::sanitize_with_options(
        raw,
        sanitize_filename::Options {
            truncate: true,
            windows: true,
            replacement: "_",
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_handles_nbsp_and_newlines() {
        assert_eq!(collapse_whitespace("  K\u{00A0}Factor \n\t "), "K Factor");
    }

    #[test]
    fn artifact_names_are_filesystem_safe() {
        let name = artifact_file_name("click", "Category: \"Steel/Mild\"", "20250101_120000", "png");
        assert!(!name.contains('/'));
        assert!(!name.contains('"'));
        assert!(!name.contains(':'));
        assert!(name.starts_with("click_Category"));
        assert!(name.ends_with("_20250101_120000.png"));
    }
}
