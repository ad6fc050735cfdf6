//! Locating, downloading, and launching Chromium

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tokio::task::{self, JoinHandle};
use tracing::{error, info, trace, warn};

use crate::config::SessionConfig;
use crate::utils::CHROME_USER_AGENT;

const PATH_OVERRIDE_VAR: &str = "CHROMIUM_PATH";

#[cfg(target_os = "windows")]
const INSTALL_LOCATIONS: &[&str] = &[
    r"%PROGRAMFILES%\Google\Chrome\Application\chrome.exe",
    r"%PROGRAMFILES(X86)%\Google\Chrome\Application\chrome.exe",
    r"%LOCALAPPDATA%\Google\Chrome\Application\chrome.exe",
    r"%PROGRAMFILES%\Chromium\Application\chrome.exe",
];

#[cfg(target_os = "macos")]
const INSTALL_LOCATIONS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "~/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/opt/homebrew/bin/chromium",
];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const INSTALL_LOCATIONS: &[&str] = &[
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/snap/bin/chromium",
    "/opt/google/chrome/chrome",
];

const PATH_COMMANDS: &[&str] = &["chromium", "chromium-browser", "google-chrome", "chrome"];

/// Turn an install location into a concrete path: `~/` is resolved against
/// the home directory and `%VAR%` tokens are expanded.
fn resolve_location(raw: &str) -> Option<PathBuf> {
    if let Some(rest) = raw.strip_prefix("~/") {
        return dirs::home_dir().map(|home| home.join(rest));
    }
    if raw.contains('%') {
        return Some(PathBuf::from(expand_windows_env_vars(raw)));
    }
    Some(PathBuf::from(raw))
}

fn lookup_on_path() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        return None;
    }
    PATH_COMMANDS.iter().find_map(|cmd| {
        let output = Command::new("which").arg(cmd).output().ok()?;
        if !output.status.success() {
            return None;
        }
        let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!found.is_empty()).then(|| PathBuf::from(found))
    })
}

/// Locate an installed Chrome or Chromium.
///
/// Checks `CHROMIUM_PATH`, the usual install locations for this platform,
/// then `which`. `None` means a managed browser has to be downloaded.
#[must_use]
pub fn find_browser_executable() -> Option<PathBuf> {
    if let Some(raw) = std::env::var_os(PATH_OVERRIDE_VAR) {
        let path = PathBuf::from(raw);
        if path.exists() {
            info!("Using browser from {PATH_OVERRIDE_VAR}: {}", path.display());
            return Some(path);
        }
        warn!("{PATH_OVERRIDE_VAR} is set but {} does not exist", path.display());
    }

    let installed = INSTALL_LOCATIONS
        .iter()
        .filter_map(|raw| resolve_location(raw))
        .find(|path| path.exists());
    if let Some(path) = installed.or_else(lookup_on_path) {
        info!("Found browser at {}", path.display());
        return Some(path);
    }

    warn!("No local Chrome/Chromium found");
    None
}

/// Expand `%VAR%` tokens. Unknown variables and unterminated tokens are kept
/// verbatim; `%%` becomes `%`.
fn expand_windows_env_vars(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut chars = path.chars();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            result.push(ch);
            continue;
        }

        let mut var_name = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '%' {
                closed = true;
                break;
            }
            var_name.push(c);
        }

        match (closed, var_name.is_empty()) {
            (true, true) => result.push('%'),
            (true, false) => match std::env::var(&var_name) {
                Ok(value) => result.push_str(&value),
                Err(_) => {
                    result.push('%');
                    result.push_str(&var_name);
                    result.push('%');
                }
            },
            (false, _) => {
                result.push('%');
                result.push_str(&var_name);
            }
        }
    }

    result
}

/// Download a managed Chromium into the user cache directory and return the
/// executable path.
pub async fn download_managed_browser() -> Result<PathBuf> {
    info!("Downloading a managed Chromium build");

    let cache_dir = dirs::cache_dir()
        .map(|dir| dir.join("kodegen").join("catalogscrape"))
        .unwrap_or_else(|| {
            let fallback = std::env::temp_dir().join("catalogscrape_chrome_cache");
            warn!(
                "Could not determine user cache directory, using temp directory fallback: {}",
                fallback.display()
            );
            fallback
        })
        .join("chromium");

    std::fs::create_dir_all(&cache_dir).context("Failed to create cache directory")?;

    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("Failed to build fetcher options")?,
    );
    let installed = fetcher
        .fetch()
        .await
        .context("Failed to download Chromium")?;
    info!("Managed Chromium ready in {}", installed.folder_path.display());
    Ok(installed.executable_path)
}

/// Quiet, non-interactive Chromium that does not advertise automation.
const LAUNCH_FLAGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-notifications",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-extensions",
    "--disable-popup-blocking",
    "--disable-background-networking",
    "--no-first-run",
    "--no-default-browser-check",
    "--no-sandbox",
    "--mute-audio",
];

/// Fresh user-data directory for one session.
#[must_use]
pub fn unique_user_data_dir() -> PathBuf {
    std::env::temp_dir().join(format!(
        "catalogscrape_chrome_{}_{}",
        std::process::id(),
        uuid::Uuid::new_v4().simple()
    ))
}

/// Launch Chromium configured from `session`.
///
/// Returns the browser, its tracked CDP handler task, and the temporary
/// profile directory that must be removed once the browser has exited.
pub async fn launch_browser(session: &SessionConfig) -> Result<(Browser, JoinHandle<()>, PathBuf)> {
    let chrome_path = match find_browser_executable() {
        Some(path) => path,
        None => download_managed_browser().await?,
    };

    let user_data_dir = unique_user_data_dir();
    std::fs::create_dir_all(&user_data_dir).context("Failed to create user data directory")?;

    let (width, height) = session.window_size();
    let mut config_builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_millis(session.page_load_timeout_ms()))
        .window_size(width, height)
        .user_data_dir(user_data_dir.clone())
        .chrome_executable(chrome_path);

    config_builder = if session.headless() {
        config_builder.headless_mode(HeadlessMode::default())
    } else {
        config_builder.with_head()
    };

    if session.disable_images() {
        config_builder = config_builder.arg("--blink-settings=imagesEnabled=false");
    }

    config_builder = config_builder.arg(format!("--user-agent={CHROME_USER_AGENT}"));
    for flag in LAUNCH_FLAGS {
        config_builder = config_builder.arg(*flag);
    }

    let browser_config = config_builder
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build browser config: {e}"))?;

    info!(
        headless = session.headless(),
        width, height, "Launching browser"
    );
    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("Failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let message = e.to_string();
                // chromiumoxide does not know every CDP event Chrome sends
                let benign = message.contains("data did not match any variant of untagged enum Message")
                    || message.contains("Failed to deserialize WS response");
                if benign {
                    trace!("Suppressed benign CDP serialization error: {message}");
                } else {
                    error!("Browser handler error: {e:?}");
                }
            }
        }
        info!("Browser handler task completed");
    });

    Ok((browser, handler_task, user_data_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_variables_and_keeps_unknown_ones() {
        // SAFETY: single-threaded test touching a variable only it uses
        unsafe { std::env::set_var("CATALOGSCRAPE_TEST_DIR", "C:\\Tools") };
        assert_eq!(
            expand_windows_env_vars("%CATALOGSCRAPE_TEST_DIR%\\chrome.exe"),
            "C:\\Tools\\chrome.exe"
        );
        assert_eq!(
            expand_windows_env_vars("%CATALOGSCRAPE_SURELY_UNSET%\\x"),
            "%CATALOGSCRAPE_SURELY_UNSET%\\x"
        );
        assert_eq!(expand_windows_env_vars("100%%"), "100%");
        assert_eq!(expand_windows_env_vars("50%off"), "50%off");
    }

    #[test]
    fn home_relative_locations_resolve_under_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(resolve_location("~/bin/chromium"), Some(home.join("bin/chromium")));
        }
        assert_eq!(
            resolve_location("/usr/bin/chromium"),
            Some(PathBuf::from("/usr/bin/chromium"))
        );
    }

    #[test]
    fn user_data_dirs_are_unique_per_session() {
        assert_ne!(unique_user_data_dir(), unique_user_data_dir());
    }
}
