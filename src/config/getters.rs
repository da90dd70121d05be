//! Getter methods for `ScrapeConfig`

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::output::OutputFormat;
use crate::snapshot::Heuristics;

use super::types::ScrapeConfig;

impl ScrapeConfig {
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn block_media(&self) -> bool {
        self.block_media
    }

    #[must_use]
    pub fn debug_dir(&self) -> Option<&Path> {
        self.debug_dir.as_deref()
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn retry_attempts(&self) -> usize {
        self.retry_attempts
    }

    #[must_use]
    pub fn error_delay(&self) -> Duration {
        Duration::from_millis(self.error_delay_ms)
    }

    #[must_use]
    pub fn page_load_timeout_secs(&self) -> u64 {
        self.page_load_timeout_secs
    }

    #[must_use]
    pub fn navigation_timeout_secs(&self) -> u64 {
        self.navigation_timeout_secs
    }

    #[must_use]
    pub fn ready_timeout_secs(&self) -> u64 {
        self.ready_timeout_secs
    }

    #[must_use]
    pub fn follow_links_limit(&self) -> usize {
        self.follow_links_limit
    }

    #[must_use]
    pub fn heuristics(&self) -> &Heuristics {
        &self.heuristics
    }

    #[must_use]
    pub fn browser_profile_dir(&self) -> Option<&PathBuf> {
        self.browser_profile_dir.as_ref()
    }
}
