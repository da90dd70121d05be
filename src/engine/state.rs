//! Run state
//!
//! `ScrapingState` is owned and mutated exclusively by the navigation loop;
//! nothing else holds a reference to it, so no synchronization is involved.
//! It persists for the whole run, unlike snapshots which die at each
//! navigation. The debug dump counter lives here too, as session state
//! rather than a process-wide ambient.

use std::collections::HashSet;
use std::time::Instant;

use chrono::Utc;

use crate::extract::canonical::{DedupKey, canonicalize_url};
use crate::extract::types::{ExtractedRecord, RawItem};
use crate::output::{ResultMetadata, ScrapeResult};

#[derive(Debug)]
pub struct ScrapingState {
    pub current_url: String,
    pub visited: HashSet<String>,
    pub extracted: Vec<ExtractedRecord>,
    pub current_page: usize,
    pub errors: Vec<String>,
    pub started: Instant,
    /// Monotonic debug artifact counter for this session.
    pub dump_seq: u64,
    /// Dedup keys of every record accumulated so far this run.
    seen: HashSet<DedupKey>,
}

impl ScrapingState {
    #[must_use]
    pub fn new(start_url: &str) -> Self {
        Self {
            current_url: start_url.to_string(),
            visited: HashSet::new(),
            extracted: Vec::new(),
            current_page: 1,
            errors: Vec::new(),
            started: Instant::now(),
            dump_seq: 0,
            seen: HashSet::new(),
        }
    }

    /// Records still allowed before `max_items` is reached.
    #[must_use]
    pub fn remaining_capacity(&self, max_items: usize) -> usize {
        max_items.saturating_sub(self.extracted.len())
    }

    /// Mark a URL visited; returns false when it was already known.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        let key = canonicalize_url(url).unwrap_or_else(|| url.to_string());
        self.visited.insert(key)
    }

    #[must_use]
    pub fn is_visited(&self, url: &str) -> bool {
        let key = canonicalize_url(url).unwrap_or_else(|| url.to_string());
        self.visited.contains(&key)
    }

    /// Fold a batch into the run: drop records duplicating anything already
    /// extracted (this batch included), respect remaining capacity, convert
    /// survivors into stored records. Returns how many were added.
    pub fn accumulate(&mut self, items: Vec<RawItem>, page_url: &str, max_items: usize) -> usize {
        let mut added = 0;
        for item in items {
            if self.remaining_capacity(max_items) == 0 {
                break;
            }
            if let Some(key) = item.key() {
                if !self.seen.insert(key) {
                    continue;
                }
            }
            self.extracted.push(item.into_record(page_url));
            added += 1;
        }
        added
    }

    pub fn record_error(&mut self, error: impl std::fmt::Display) {
        let message = error.to_string();
        log::warn!("cycle error on {}: {message}", self.current_url);
        self.errors.push(message);
    }

    pub fn next_dump_seq(&mut self) -> u64 {
        self.dump_seq += 1;
        self.dump_seq
    }

    /// Finish the run and build the result document.
    #[must_use]
    pub fn into_result(self, entry_url: &str) -> ScrapeResult {
        let metadata = ResultMetadata {
            page_count: self.current_page,
            item_count: self.extracted.len(),
            duration_ms: self.started.elapsed().as_millis() as u64,
            errors: self.errors,
        };
        ScrapeResult {
            url: entry_url.to_string(),
            timestamp: Utc::now(),
            data: self.extracted.into_iter().map(|r| r.data).collect(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::types::{ContentSignals, ExtractionTier, Provenance};
    use serde_json::Map;

    fn item(href: &str, tier: ExtractionTier) -> RawItem {
        RawItem {
            title: Some("Title".to_string()),
            href: Some(href.to_string()),
            image: None,
            snippet: "snippet".to_string(),
            tags: Vec::new(),
            actions: Vec::new(),
            fields: Map::new(),
            provenance: Provenance {
                tier,
                selector: ".x".to_string(),
                index: 0,
            },
            attrs: Vec::new(),
            bbox: None,
            signals: ContentSignals::default(),
        }
    }

    #[test]
    fn capacity_bounds_accumulation() {
        let mut state = ScrapingState::new("https://e.com/list");
        let batch: Vec<RawItem> = (0..10)
            .map(|i| item(&format!("https://e.com/item/{i}"), ExtractionTier::Summary))
            .collect();
        let added = state.accumulate(batch, "https://e.com/list", 5);
        assert_eq!(added, 5);
        assert_eq!(state.extracted.len(), 5);
        assert_eq!(state.remaining_capacity(5), 0);
    }

    #[test]
    fn same_href_across_cycles_and_tiers_is_stored_once() {
        let mut state = ScrapingState::new("https://e.com/list");
        let first = vec![item("https://e.com/item/1", ExtractionTier::Schema)];
        assert_eq!(state.accumulate(first, "https://e.com/list", 100), 1);
        // second cycle, different tier, tracking-noised href
        let second = vec![item(
            "https://E.com/item/1?utm_source=feed#top",
            ExtractionTier::AnchorFallback,
        )];
        assert_eq!(state.accumulate(second, "https://e.com/list?page=2", 100), 0);
        assert_eq!(state.extracted.len(), 1);
    }

    #[test]
    fn visited_urls_compare_canonically() {
        let mut state = ScrapingState::new("https://e.com");
        assert!(state.mark_visited("https://e.com/a?utm_source=x"));
        assert!(state.is_visited("https://E.com/a"));
        assert!(!state.mark_visited("https://e.com/a#frag"));
    }

    #[test]
    fn result_document_carries_run_metadata() {
        let mut state = ScrapingState::new("https://e.com/list");
        state.current_page = 3;
        state.record_error("navigation failed: boom");
        let batch = vec![item("https://e.com/item/1", ExtractionTier::Summary)];
        state.accumulate(batch, "https://e.com/list", 100);
        let result = state.into_result("https://e.com/list");
        assert_eq!(result.metadata.page_count, 3);
        assert_eq!(result.metadata.item_count, 1);
        assert_eq!(result.metadata.errors.len(), 1);
        assert_eq!(result.data.len(), 1);
        assert_eq!(result.data[0]["href"], "https://e.com/item/1");
    }

    #[test]
    fn dump_counter_is_session_scoped() {
        let mut a = ScrapingState::new("https://e.com");
        let mut b = ScrapingState::new("https://e.com");
        assert_eq!(a.next_dump_seq(), 1);
        assert_eq!(a.next_dump_seq(), 2);
        assert_eq!(b.next_dump_seq(), 1);
    }
}
