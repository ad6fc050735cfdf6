//! Raw page dumps for entry pages that never became ready
//!
//! When the category filter does not render, the page is usually a bot
//! wall or an error page rather than a slow catalog. The dump is saved next to
//! the screenshots and scanned for the usual blocking phrases so the log says
//! why.

use scraper::{Html, Selector};
use std::path::PathBuf;

use super::DiagnosticsSink;
use crate::catalog::Source;
use crate::driver::PageDriver;
use crate::events::Severity;
use crate::utils::{collapse_whitespace, safe_truncate_chars};

/// Phrases that indicate the request was blocked or challenged.
pub const BLOCK_PHRASES: &[&str] = &[
    "Access Denied",
    "403 Forbidden",
    "Cloudflare",
    "captcha",
    "Just a moment",
    "Please enable JavaScript",
    "bot detection",
    "Request blocked",
    "Too Many Requests",
];

/// Blocking phrases found in `html`, matched case-insensitively.
#[must_use]
pub fn detect_block_signals(html: &str) -> Vec<&'static str> {
    let haystack = html.to_lowercase();
    BLOCK_PHRASES
        .iter()
        .copied()
        .filter(|phrase| haystack.contains(&phrase.to_lowercase()))
        .collect()
}

fn page_title(html: &str) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let document = Html::parse_document(html);
    let title = document.select(&selector).next()?;
    let text = collapse_whitespace(&title.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

/// Save the current page as `debug_page_<source>.html` and log an analysis.
///
/// Best-effort: returns `None` when the page cannot be read or written.
pub async fn dump_entry_page<D>(driver: &D, sink: &dyn DiagnosticsSink, source: Source) -> Option<PathBuf>
where
    D: PageDriver + ?Sized,
{
    let html = match driver.page_source().await {
        Ok(html) => html,
        Err(e) => {
            sink.log(Severity::Warn, format!("{source}: could not read page source: {e}"));
            return None;
        }
    };

    let name = format!("debug_page_{}.html", source.slug());
    let path = match sink.capture_artifact(&name, html.as_bytes()).await {
        Ok(path) => path,
        Err(e) => {
            sink.log(Severity::Warn, format!("{source}: could not save page dump: {e}"));
            return None;
        }
    };

    let title = page_title(&html).unwrap_or_else(|| "<untitled>".to_string());
    sink.log(
        Severity::Info,
        format!(
            "{source}: page dump saved ({} bytes, title '{}')",
            html.len(),
            safe_truncate_chars(&title, 120)
        ),
    );
    let signals = detect_block_signals(&html);
    if signals.is_empty() {
        sink.log(Severity::Info, format!("{source}: no blocking phrases found in page dump"));
    }
    for phrase in signals {
        sink.log(
            Severity::Warn,
            format!("{source}: page contains '{phrase}', the site may be blocking automation"),
        );
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cloudflare_challenge() {
        let html = "<html><head><title>Just a moment...</title></head>\
                    <body>Checking your browser. Cloudflare Ray ID</body></html>";
        let found = detect_block_signals(html);
        assert!(found.contains(&"Cloudflare"));
        assert!(found.contains(&"Just a moment"));
        assert_eq!(page_title(html).as_deref(), Some("Just a moment..."));
    }

    #[test]
    fn clean_catalog_has_no_signals() {
        let html = "<html><body><div class=\"filterBoxHeader\">Material</div></body></html>";
        assert!(detect_block_signals(html).is_empty());
    }
}
