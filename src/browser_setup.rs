//! Browser discovery, launch and teardown
//!
//! Finds a system Chrome/Chromium (env override, well-known paths, `which`),
//! falls back to downloading a managed Chromium, launches it with a unique
//! profile directory, and spawns the handler task that drives the CDP
//! connection. Cleanup closes the browser and removes the profile directory
//! on every exit path.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use log::{debug, info, trace, warn};
use tokio::task::{self, JoinHandle};

/// Find a Chrome/Chromium executable on this system.
pub async fn find_browser_executable() -> Result<PathBuf> {
    // environment variable overrides all other methods
    if let Ok(path) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            info!("using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!(
            "CHROMIUM_PATH points to a non-existent file: {}",
            path.display()
        );
    }

    let paths: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else if cfg!(target_os = "windows") {
        &[
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else {
        &[
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    };
    for path_str in paths {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("found browser at: {}", path.display());
            return Ok(path);
        }
    }

    if !cfg!(target_os = "windows") {
        for cmd in &["chromium", "chromium-browser", "google-chrome", "chrome"] {
            if let Ok(output) = Command::new("which").arg(cmd).output()
                && output.status.success()
            {
                let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path_str.is_empty() {
                    let path = PathBuf::from(path_str);
                    info!("found browser via 'which': {}", path.display());
                    return Ok(path);
                }
            }
        }
    }

    Err(anyhow::anyhow!("Chrome/Chromium executable not found"))
}

/// Download a managed Chromium and return its executable path.
pub async fn download_managed_browser() -> Result<PathBuf> {
    info!("downloading managed Chromium browser");
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("pagesift")
        .join("chromium");
    std::fs::create_dir_all(&cache_dir).context("failed to create browser cache directory")?;

    let fetcher = BrowserFetcher::new(
        BrowserFetcherOptions::builder()
            .with_path(&cache_dir)
            .build()
            .context("failed to build fetcher options")?,
    );
    let revision = fetcher.fetch().await.context("failed to fetch browser")?;
    info!("downloaded Chromium to {}", revision.folder_path.display());
    Ok(revision.executable_path)
}

/// Launch the browser and spawn its handler task.
///
/// Returns the browser, the handler task, and the profile directory that
/// the caller must remove during cleanup.
pub async fn launch_browser(
    headless: bool,
    user_agent: &str,
    profile_dir: Option<PathBuf>,
) -> Result<(Browser, JoinHandle<()>, PathBuf)> {
    let chrome_path = match find_browser_executable().await {
        Ok(path) => path,
        Err(_) => download_managed_browser().await?,
    };

    let user_data_dir = profile_dir.unwrap_or_else(|| {
        std::env::temp_dir().join(format!("pagesift_chrome_{}", std::process::id()))
    });
    std::fs::create_dir_all(&user_data_dir).context("failed to create profile directory")?;

    let mut config_builder = BrowserConfigBuilder::default()
        .request_timeout(Duration::from_secs(30))
        .window_size(1920, 1080)
        .user_data_dir(user_data_dir.clone())
        .chrome_executable(chrome_path);

    if headless {
        config_builder = config_builder.headless_mode(HeadlessMode::default());
    } else {
        config_builder = config_builder.with_head();
    }

    config_builder = config_builder
        .arg(format!("--user-agent={user_agent}"))
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--disable-notifications")
        .arg("--disable-extensions")
        .arg("--disable-popup-blocking")
        .arg("--disable-background-networking")
        .arg("--disable-background-timer-throttling")
        .arg("--disable-breakpad")
        .arg("--disable-hang-monitor")
        .arg("--disable-prompt-on-repost")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--no-sandbox")
        .arg("--metrics-recording-only")
        .arg("--password-store=basic")
        .arg("--use-mock-keychain")
        .arg("--hide-scrollbars")
        .arg("--mute-audio");

    let browser_config = config_builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

    debug!("launching browser");
    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("failed to launch browser")?;

    let handler_task = task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let message = e.to_string();
                // Chrome emits CDP events chromiumoxide cannot deserialize;
                // those are noise, not failures.
                let benign = message.contains("data did not match any variant of untagged enum")
                    || message.contains("Failed to deserialize WS response");
                if benign {
                    trace!("suppressed benign CDP error: {message}");
                } else {
                    warn!("browser handler error: {message}");
                }
            }
        }
        debug!("browser handler task completed");
    });

    Ok((browser, handler_task, user_data_dir))
}

/// Close the browser, stop the handler task and remove the profile
/// directory. Individual failures are logged; cleanup always runs to
/// completion.
pub async fn cleanup_browser(
    mut browser: Browser,
    handler_task: JoinHandle<()>,
    profile_dir: PathBuf,
) {
    if let Err(e) = browser.close().await {
        warn!("failed to close browser: {e}");
    }
    if let Err(e) = browser.wait().await {
        warn!("failed to wait for browser exit: {e}");
    }
    handler_task.abort();
    if let Err(e) = handler_task.await
        && !e.is_cancelled()
    {
        warn!("handler task failed during abort: {e}");
    }
    if let Err(e) = std::fs::remove_dir_all(&profile_dir) {
        warn!(
            "failed to remove profile directory {}: {e}",
            profile_dir.display()
        );
    } else {
        debug!("removed profile directory {}", profile_dir.display());
    }
}
