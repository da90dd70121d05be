//! Per-step debug artifacts
//!
//! When a debug directory is configured, each step writes a JSON file with
//! run metadata, the compact snapshot and step-specific extras, optionally
//! paired with `.html` and `.png` siblings. Dump failures are logged and
//! never abort the run.

use std::path::PathBuf;

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chrono::Utc;
use serde_json::{Value, json};

use crate::snapshot::CompactSnapshot;

pub struct DebugDumper {
    dir: PathBuf,
    user_agent: String,
    capture_page: bool,
}

impl DebugDumper {
    #[must_use]
    pub fn new(dir: PathBuf, user_agent: String, capture_page: bool) -> Self {
        Self {
            dir,
            user_agent,
            capture_page,
        }
    }

    /// Base artifact name; extensions are appended textually because URL
    /// slugs contain dots that `Path::with_extension` would truncate at.
    fn artifact_base(&self, seq: u64, url: &str, tag: &str) -> String {
        let timestamp = Utc::now().format("%Y%m%dT%H%M%S");
        let trimmed = url
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let slug = sanitize_filename::sanitize(trimmed.replace('/', "_"));
        let slug = crate::utils::safe_truncate_chars(&slug, 80);
        format!("{seq:03}_{timestamp}_{slug}_{tag}")
    }

    /// Write the step's artifacts. Failures are logged, never propagated.
    pub async fn dump_step(
        &self,
        page: &Page,
        seq: u64,
        url: &str,
        page_number: usize,
        tag: &str,
        snapshot: &CompactSnapshot,
        extra: Value,
    ) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            log::warn!("cannot create debug dir {}: {e}", self.dir.display());
            return;
        }
        let base = self.artifact_base(seq, url, tag);

        let doc = json!({
            "meta": {
                "url": url,
                "page": page_number,
                "tag": tag,
                "timestamp": Utc::now(),
                "user_agent": self.user_agent,
            },
            "snapshot": snapshot,
            "extra": extra,
        });
        let json_path = self.dir.join(format!("{base}.json"));
        match serde_json::to_vec_pretty(&doc) {
            Ok(bytes) => {
                if let Err(e) = std::fs::write(&json_path, bytes) {
                    log::warn!("failed to write {}: {e}", json_path.display());
                }
            }
            Err(e) => log::warn!("failed to serialize debug dump: {e}"),
        }

        if !self.capture_page {
            return;
        }

        match page.content().await {
            Ok(html) => {
                let html_path = self.dir.join(format!("{base}.html"));
                if let Err(e) = std::fs::write(&html_path, html) {
                    log::warn!("failed to write {}: {e}", html_path.display());
                }
            }
            Err(e) => log::warn!("failed to capture page HTML: {e}"),
        }

        let params = CaptureScreenshotParams {
            format: Some(CaptureScreenshotFormat::Png),
            capture_beyond_viewport: Some(true),
            ..Default::default()
        };
        match page.screenshot(params).await {
            Ok(bytes) => {
                let png_path = self.dir.join(format!("{base}.png"));
                if let Err(e) = std::fs::write(&png_path, bytes) {
                    log::warn!("failed to write {}: {e}", png_path.display());
                }
            }
            Err(e) => log::warn!("failed to capture screenshot: {e}"),
        }
    }
}
