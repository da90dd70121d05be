//! Type-safe builder for `ScrapeConfig` using the typestate pattern
//!
//! The output directory is the one required field; `build()` only exists
//! once it has been provided, so an incomplete configuration fails to
//! compile rather than at runtime.

use std::marker::PhantomData;
use std::path::PathBuf;

use crate::output::OutputFormat;
use crate::snapshot::Heuristics;

use super::types::ScrapeConfig;

/// Builder state once the output directory is set.
pub struct Complete;

pub struct ScrapeConfigBuilder<State = ()> {
    config: ScrapeConfig,
    _phantom: PhantomData<State>,
}

impl ScrapeConfig {
    #[must_use]
    pub fn builder() -> ScrapeConfigBuilder<()> {
        ScrapeConfigBuilder {
            config: ScrapeConfig::default(),
            _phantom: PhantomData,
        }
    }
}

impl Default for ScrapeConfigBuilder<()> {
    fn default() -> Self {
        ScrapeConfig::builder()
    }
}

impl ScrapeConfigBuilder<()> {
    #[must_use]
    pub fn output_dir(self, dir: impl Into<PathBuf>) -> ScrapeConfigBuilder<Complete> {
        let mut config = self.config;
        config.output_dir = dir.into();
        ScrapeConfigBuilder {
            config,
            _phantom: PhantomData,
        }
    }
}

impl<State> ScrapeConfigBuilder<State> {
    #[must_use]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    #[must_use]
    pub fn block_media(mut self, block: bool) -> Self {
        self.config.block_media = block;
        self
    }

    #[must_use]
    pub fn debug_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config.debug_dir = dir;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    #[must_use]
    pub fn retry_attempts(mut self, attempts: usize) -> Self {
        self.config.retry_attempts = attempts;
        self
    }

    #[must_use]
    pub fn error_delay_ms(mut self, delay: u64) -> Self {
        self.config.error_delay_ms = delay;
        self
    }

    #[must_use]
    pub fn page_load_timeout_secs(mut self, secs: u64) -> Self {
        self.config.page_load_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn navigation_timeout_secs(mut self, secs: u64) -> Self {
        self.config.navigation_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn ready_timeout_secs(mut self, secs: u64) -> Self {
        self.config.ready_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn follow_links_limit(mut self, limit: usize) -> Self {
        self.config.follow_links_limit = limit;
        self
    }

    #[must_use]
    pub fn heuristics(mut self, heuristics: Heuristics) -> Self {
        self.config.heuristics = heuristics;
        self
    }
}

impl ScrapeConfigBuilder<Complete> {
    #[must_use]
    pub fn build(self) -> ScrapeConfig {
        self.config
    }
}
