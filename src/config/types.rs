//! Core configuration types for scraping runs
//!
//! `ScrapeConfig` carries the run-level knobs: output location and format,
//! browser behavior, timeouts, error budget and the heuristic weights handed
//! to every analyzer. What to scrape (URL, bounds, selectors, pagination)
//! lives in the `TargetSchema`, not here.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::output::OutputFormat;
use crate::snapshot::Heuristics;
use crate::utils::{
    CHROME_USER_AGENT, DEFAULT_ERROR_DELAY_MS, DEFAULT_FOLLOW_LINKS_LIMIT,
    DEFAULT_NAVIGATION_TIMEOUT_SECS, DEFAULT_PAGE_LOAD_TIMEOUT_SECS, DEFAULT_READY_TIMEOUT_SECS,
    DEFAULT_RETRY_ATTEMPTS,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Where result documents (and debug artifacts) are written.
    pub(crate) output_dir: PathBuf,
    pub(crate) format: OutputFormat,
    pub(crate) headless: bool,
    /// Block image/media/font loads and known tracker hosts.
    pub(crate) block_media: bool,
    /// When set, per-step debug dumps are written under this directory.
    pub(crate) debug_dir: Option<PathBuf>,
    pub(crate) user_agent: String,
    /// Ceiling on accumulated cycle errors before the run aborts.
    pub(crate) retry_attempts: usize,
    /// Fixed delay between error recovery attempts.
    pub(crate) error_delay_ms: u64,
    pub(crate) page_load_timeout_secs: u64,
    pub(crate) navigation_timeout_secs: u64,
    pub(crate) ready_timeout_secs: u64,
    /// Bound on same-page links followed per cycle.
    pub(crate) follow_links_limit: usize,
    /// Analyzer weights and caps; every heuristic constant in one place.
    #[serde(default)]
    pub(crate) heuristics: Heuristics,
    /// Browser profile directory for this session; ephemeral, cleaned up on
    /// every exit path.
    #[serde(skip)]
    pub(crate) browser_profile_dir: Option<PathBuf>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            format: OutputFormat::Json,
            headless: true,
            block_media: true,
            debug_dir: None,
            user_agent: CHROME_USER_AGENT.to_string(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            error_delay_ms: DEFAULT_ERROR_DELAY_MS,
            page_load_timeout_secs: DEFAULT_PAGE_LOAD_TIMEOUT_SECS,
            navigation_timeout_secs: DEFAULT_NAVIGATION_TIMEOUT_SECS,
            ready_timeout_secs: DEFAULT_READY_TIMEOUT_SECS,
            follow_links_limit: DEFAULT_FOLLOW_LINKS_LIMIT,
            heuristics: Heuristics::default(),
            browser_profile_dir: None,
        }
    }
}

impl ScrapeConfig {
    /// Set the browser profile directory for this session.
    #[must_use]
    pub fn with_browser_profile_dir(mut self, dir: PathBuf) -> Self {
        self.browser_profile_dir = Some(dir);
        self
    }
}
