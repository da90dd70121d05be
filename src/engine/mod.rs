//! Scraping engine
//!
//! Owns the browser session: launch, page setup, request interception, the
//! navigation loop, and guaranteed teardown on every exit path.

pub mod debug_dump;
pub mod interceptor;
pub mod navigator;
pub mod readiness;
pub mod state;

use anyhow::{Context, Result};
use chromiumoxide::cdp;

use crate::browser_setup::{cleanup_browser, launch_browser};
use crate::config::ScrapeConfig;
use crate::output::ScrapeResult;
use crate::schema::TargetSchema;

pub use interceptor::NetworkWatch;
pub use navigator::Navigator;
pub use state::ScrapingState;

/// Run one scraping session end to end.
///
/// Validates the schema first (malformed schemas fail before any browser
/// work), then launches the browser, drives the navigation loop, and cleans
/// up browser and profile directory regardless of how the run ends.
pub async fn run_scrape(config: &ScrapeConfig, schema: &TargetSchema) -> Result<ScrapeResult> {
    schema.validate()?;
    std::fs::create_dir_all(config.output_dir())
        .with_context(|| format!("failed to create {}", config.output_dir().display()))?;

    let (browser, handler_task, profile_dir) = launch_browser(
        config.headless(),
        config.user_agent(),
        config.browser_profile_dir().cloned(),
    )
    .await?;

    let result = run_session(&browser, config, schema).await;

    cleanup_browser(browser, handler_task, profile_dir).await;
    result
}

async fn run_session(
    browser: &chromiumoxide::Browser,
    config: &ScrapeConfig,
    schema: &TargetSchema,
) -> Result<ScrapeResult> {
    let page = browser
        .new_page("about:blank")
        .await
        .context("failed to create page")?;

    // consistent desktop rendering
    page.execute(
        cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams::builder()
            .width(1920)
            .height(1080)
            .device_scale_factor(1.0)
            .mobile(false)
            .build()
            .map_err(anyhow::Error::msg)?,
    )
    .await
    .context("failed to set device metrics")?;

    let watch = match NetworkWatch::install(&page, config.block_media()).await {
        Ok(watch) => Some(watch),
        Err(e) => {
            log::warn!("request interception unavailable, continuing without it: {e}");
            None
        }
    };

    let navigator = Navigator::new(config, schema);
    let result = navigator.run(&page, watch.as_ref()).await;

    if let Some(mut watch) = watch {
        watch.shutdown();
    }
    if let Err(e) = page.close().await {
        log::debug!("failed to close page: {e}");
    }
    result
}
