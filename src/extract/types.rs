//! Extraction pipeline data model
//!
//! `*Facts` structs mirror the serializable payloads returned by the
//! collection scripts; `RawItem` is the enriched intermediate a tier
//! produces; `ExtractedRecord` is what accumulates in the run state.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::dom::BBox;
use crate::extract::canonical::{DedupKey, dedup_key};

/// Payload of a tier-1/tier-2 collection script.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemsPayload {
    #[serde(default)]
    pub items: Vec<ItemFacts>,
    /// Open Graph / Twitter meta image, the page-level image fallback.
    #[serde(default)]
    pub meta_image: Option<String>,
}

/// Raw facts gathered for one item container.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFacts {
    #[serde(default)]
    pub fields: HashMap<String, Option<String>>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attrs: Vec<(String, String)>,
    #[serde(default)]
    pub bbox: Option<BBox>,
    #[serde(default)]
    pub anchors: Vec<AnchorFacts>,
    #[serde(default)]
    pub images: Vec<ImageFacts>,
    #[serde(default)]
    pub tag_texts: Vec<String>,
    #[serde(default)]
    pub char_count: u64,
    #[serde(default)]
    pub link_count: u64,
    #[serde(default)]
    pub link_char_count: u64,
}

/// One anchor inside an item container (or, for tier 3, on the page).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnchorFacts {
    pub href: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub area: f64,
}

/// Raw facts about one plausible image source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageFacts {
    /// Direct URL (src, lazy attribute, background url, meta image).
    #[serde(default)]
    pub url: Option<String>,
    /// Raw srcset string; the widest candidate is selected Rust-side.
    #[serde(default)]
    pub srcset: Option<String>,
    /// Where the candidate came from (`img-src`, `img-lazy`, `srcset`,
    /// `picture`, `noscript`, `bg-inline`, `bg-computed`, `data-bg`, `meta`).
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub rendered_w: f64,
    #[serde(default)]
    pub rendered_h: f64,
    #[serde(default)]
    pub natural_w: f64,
    #[serde(default)]
    pub natural_h: f64,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub alt: String,
    /// Href of the nearest enclosing anchor, if any.
    #[serde(default)]
    pub anchor_href: Option<String>,
}

/// Which tier produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionTier {
    Schema,
    Summary,
    AnchorFallback,
}

/// Selector provenance carried on every record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub tier: ExtractionTier,
    pub selector: String,
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemAction {
    pub label: String,
    pub href: String,
}

/// Content-shape signals for one record.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ContentSignals {
    pub char_count: u64,
    pub link_count: u64,
    pub link_density: f64,
}

/// An enriched candidate record, before dedup and capacity trimming.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub title: Option<String>,
    pub href: Option<String>,
    pub image: Option<String>,
    pub snippet: String,
    pub tags: Vec<String>,
    pub actions: Vec<ItemAction>,
    pub fields: Map<String, Value>,
    pub provenance: Provenance,
    pub attrs: Vec<(String, String)>,
    pub bbox: Option<BBox>,
    pub signals: ContentSignals,
}

impl RawItem {
    #[must_use]
    pub fn key(&self) -> Option<DedupKey> {
        dedup_key(
            self.href.as_deref(),
            self.title.as_deref().unwrap_or(""),
            &self.snippet,
        )
    }

    /// Flatten into the record stored in run state and written to output.
    #[must_use]
    pub fn into_record(self, page_url: &str) -> ExtractedRecord {
        let mut data = self.fields;
        if let Some(title) = &self.title {
            data.entry("title".to_string())
                .or_insert_with(|| json!(title));
        }
        data.insert("href".to_string(), json!(self.href));
        data.insert("image".to_string(), json!(self.image));
        if !self.snippet.is_empty() {
            data.entry("snippet".to_string())
                .or_insert_with(|| json!(self.snippet));
        }
        if !self.tags.is_empty() {
            data.insert("tags".to_string(), json!(self.tags));
        }
        if !self.actions.is_empty() {
            data.insert("actions".to_string(), json!(self.actions));
        }
        data.insert("_extractor".to_string(), json!(self.provenance));
        let attrs: Map<String, Value> = self
            .attrs
            .into_iter()
            .map(|(k, v)| (k, json!(v)))
            .collect();
        data.insert(
            "_container".to_string(),
            json!({ "attrs": attrs, "bbox": self.bbox }),
        );
        data.insert("_signals".to_string(), json!(self.signals));
        ExtractedRecord {
            data: Value::Object(data),
            url: page_url.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// One accumulated record: extracted data plus where and when it was found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub data: Value,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}
