//! Navigation loop
//!
//! Drives the run as a state machine: Navigating → Snapshotting →
//! Extracting → (LinkFollowing)* → Paginating → Continue | Stop. Each cycle
//! takes a fresh snapshot, extracts against remaining capacity, optionally
//! visits discovered same-site links, then advances through a pagination
//! candidate or the schema's declared strategy. Cycle errors accumulate in
//! the run state; the loop aborts once they reach the configured ceiling,
//! otherwise it waits a fixed delay and retries.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use chromiumoxide::Page;
use serde_json::json;

use crate::config::ScrapeConfig;
use crate::errors::ScrapeError;
use crate::extract::canonical::same_site;
use crate::extract::pipeline::extract_items;
use crate::output::ScrapeResult;
use crate::schema::{TargetSchema, next_page_url};
use crate::snapshot::{CompactSnapshot, build_snapshot};

use super::debug_dump::DebugDumper;
use super::interceptor::NetworkWatch;
use super::readiness::wait_for_page_ready;
use super::state::ScrapingState;

/// Wrap a page operation with an explicit timeout.
async fn with_page_timeout<F, T>(operation: F, timeout_secs: u64, name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(Duration::from_secs(timeout_secs), operation).await {
        Ok(result) => result,
        Err(_) => Err(ScrapeError::Timeout(format!("{name} after {timeout_secs}s")).into()),
    }
}

/// Outcome of one cycle.
enum Advance {
    Continue,
    Stop(&'static str),
}

pub struct Navigator<'a> {
    config: &'a ScrapeConfig,
    schema: &'a TargetSchema,
    state: ScrapingState,
    dumper: Option<DebugDumper>,
}

/// Same-site, not-yet-visited links worth following from this page:
/// prominent controls first (already area-ranked), then list-item hrefs,
/// bounded by `limit`.
#[must_use]
pub fn follow_candidates(
    snapshot: &CompactSnapshot,
    item_hrefs: &[String],
    base_url: &str,
    state: &ScrapingState,
    limit: usize,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let candidates = snapshot
        .controls
        .iter()
        .filter_map(|c| c.href.clone())
        .chain(item_hrefs.iter().cloned());
    for href in candidates {
        if out.len() >= limit {
            break;
        }
        if !same_site(&href, base_url) || state.is_visited(&href) {
            continue;
        }
        if out.iter().any(|known| known == &href) {
            continue;
        }
        out.push(href);
    }
    out
}

impl<'a> Navigator<'a> {
    #[must_use]
    pub fn new(config: &'a ScrapeConfig, schema: &'a TargetSchema) -> Self {
        let dumper = config.debug_dir().map(|dir| {
            DebugDumper::new(dir.to_path_buf(), config.user_agent().to_string(), true)
        });
        Self {
            config,
            schema,
            state: ScrapingState::new(&schema.url),
            dumper,
        }
    }

    /// Run the loop to completion and produce the result document.
    pub async fn run(mut self, page: &Page, watch: Option<&NetworkWatch>) -> Result<ScrapeResult> {
        // the entry navigation is fatal when it fails: there is no cycle to
        // retry yet and nothing to extract
        self.goto(page, watch, &self.schema.url.clone()).await?;
        self.state.mark_visited(&self.schema.url);

        loop {
            match self.cycle(page, watch).await {
                Ok(Advance::Continue) => {}
                Ok(Advance::Stop(reason)) => {
                    log::info!(
                        "stopping after page {}: {reason} ({} records)",
                        self.state.current_page,
                        self.state.extracted.len()
                    );
                    break;
                }
                Err(e) => {
                    self.state.record_error(&e);
                    if self.state.errors.len() >= self.config.retry_attempts() {
                        log::warn!(
                            "aborting run after {} accumulated errors",
                            self.state.errors.len()
                        );
                        break;
                    }
                    tokio::time::sleep(self.config.error_delay()).await;
                    // re-establish the current page before retrying the cycle
                    let current = self.state.current_url.clone();
                    if let Err(nav) = self.goto(page, watch, &current).await {
                        self.state.record_error(&nav);
                        if self.state.errors.len() >= self.config.retry_attempts() {
                            break;
                        }
                    }
                }
            }
        }

        Ok(self.state.into_result(&self.schema.url))
    }

    /// One full cycle: snapshot, extract, follow links, paginate.
    async fn cycle(&mut self, page: &Page, watch: Option<&NetworkWatch>) -> Result<Advance> {
        let heur = self.config.heuristics();

        // Snapshotting
        wait_for_page_ready(page, watch, self.config.ready_timeout_secs()).await;
        let (snapshot, _refs) = build_snapshot(page, heur).await?;
        self.dump(page, "cycle", &snapshot).await;

        // Extracting
        let capacity = self.state.remaining_capacity(self.schema.max_items);
        let items = extract_items(page, self.schema, &snapshot, heur, capacity).await?;
        let item_hrefs: Vec<String> = items.iter().filter_map(|i| i.href.clone()).collect();
        let added = self
            .state
            .accumulate(items, &snapshot.url, self.schema.max_items);
        log::info!(
            "page {} ({}): {added} new records, {} total",
            self.state.current_page,
            snapshot.url,
            self.state.extracted.len()
        );
        if self.state.remaining_capacity(self.schema.max_items) == 0 {
            return Ok(Advance::Stop("max items reached"));
        }

        // LinkFollowing
        if self.schema.follow_links {
            self.follow_links(page, watch, &snapshot, &item_hrefs).await?;
            if self.state.remaining_capacity(self.schema.max_items) == 0 {
                return Ok(Advance::Stop("max items reached"));
            }
        }

        // Paginating
        if self.state.current_page >= self.schema.max_pages {
            return Ok(Advance::Stop("max pages reached"));
        }
        match self.next_page_target(page, &snapshot).await {
            Some(next) => {
                self.goto(page, watch, &next).await?;
                self.state.mark_visited(&next);
                self.state.current_page += 1;
                Ok(Advance::Continue)
            }
            None => Ok(Advance::Stop("no further pages")),
        }
    }

    /// Visit discovered same-site links, extract on each, return to the
    /// origin page. A link that fails to load is recorded and skipped.
    async fn follow_links(
        &mut self,
        page: &Page,
        watch: Option<&NetworkWatch>,
        snapshot: &CompactSnapshot,
        item_hrefs: &[String],
    ) -> Result<()> {
        let origin = self.state.current_url.clone();
        let links = follow_candidates(
            snapshot,
            item_hrefs,
            &self.schema.url,
            &self.state,
            self.config.follow_links_limit(),
        );
        if links.is_empty() {
            return Ok(());
        }
        log::debug!("following {} links from {origin}", links.len());

        for link in links {
            if self.state.remaining_capacity(self.schema.max_items) == 0 {
                break;
            }
            self.state.mark_visited(&link);
            if let Err(e) = self.goto(page, watch, &link).await {
                self.state.record_error(&e);
                continue;
            }
            wait_for_page_ready(page, watch, self.config.ready_timeout_secs()).await;
            match build_snapshot(page, self.config.heuristics()).await {
                Ok((link_snapshot, _)) => {
                    self.dump(page, "link", &link_snapshot).await;
                    let capacity = self.state.remaining_capacity(self.schema.max_items);
                    match extract_items(
                        page,
                        self.schema,
                        &link_snapshot,
                        self.config.heuristics(),
                        capacity,
                    )
                    .await
                    {
                        Ok(items) => {
                            let added = self.state.accumulate(
                                items,
                                &link_snapshot.url,
                                self.schema.max_items,
                            );
                            log::debug!("followed {link}: {added} new records");
                        }
                        Err(e) => self.state.record_error(&e),
                    }
                }
                Err(e) => self.state.record_error(&e),
            }
        }

        // back to the page we were paginating
        self.goto(page, watch, &origin).await?;
        wait_for_page_ready(page, watch, self.config.ready_timeout_secs()).await;
        Ok(())
    }

    /// Pick the next page: an unvisited snapshot pagination candidate first,
    /// else the schema's declared strategy.
    async fn next_page_target(&self, page: &Page, snapshot: &CompactSnapshot) -> Option<String> {
        for candidate in &snapshot.pagination {
            if !self.state.is_visited(&candidate.href) {
                log::debug!(
                    "pagination candidate (score {:.1}): {}",
                    candidate.score,
                    candidate.href
                );
                return Some(candidate.href.clone());
            }
        }

        let pagination = self.schema.pagination.as_ref()?;
        if let Some(selector) = pagination
            .next_selector
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            let script = crate::extract::js_scripts::href_of_selector_script(selector);
            match page.evaluate(script.as_str()).await {
                Ok(result) => {
                    if let Ok(Some(href)) = result.into_value::<Option<String>>()
                        && !self.state.is_visited(&href)
                    {
                        return Some(href);
                    }
                }
                Err(e) => log::warn!("declared pagination selector failed: {e}"),
            }
        }
        if let Some(param) = pagination
            .query_param
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            && let Some(next) = next_page_url(&self.state.current_url, param)
            && !self.state.is_visited(&next)
        {
            return Some(next);
        }
        None
    }

    /// Navigate and wait for the load, with explicit timeouts. Failures are
    /// navigation errors re-raised to the loop.
    async fn goto(&mut self, page: &Page, watch: Option<&NetworkWatch>, url: &str) -> Result<()> {
        log::debug!("navigating to {url}");
        if let Some(watch) = watch {
            watch.reset();
        }
        with_page_timeout(
            async {
                page.goto(url)
                    .await
                    .map_err(|e| ScrapeError::Navigation(format!("{url}: {e}")).into())
            },
            self.config.page_load_timeout_secs(),
            "page navigation",
        )
        .await?;
        with_page_timeout(
            async {
                page.wait_for_navigation()
                    .await
                    .map_err(|e| ScrapeError::Navigation(format!("{url}: {e}")).into())
            },
            self.config.navigation_timeout_secs(),
            "page load",
        )
        .await?;
        self.state.current_url = url.to_string();
        Ok(())
    }

    async fn dump(&mut self, page: &Page, tag: &str, snapshot: &CompactSnapshot) {
        let Some(dumper) = &self.dumper else { return };
        let seq = self.state.next_dump_seq();
        let extra = json!({
            "records_so_far": self.state.extracted.len(),
            "errors_so_far": self.state.errors.len(),
        });
        dumper
            .dump_step(
                page,
                seq,
                &self.state.current_url,
                self.state.current_page,
                tag,
                snapshot,
                extra,
            )
            .await;
    }
}
