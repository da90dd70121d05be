//! Record extraction
//!
//! Consumes a `CompactSnapshot` to pull structured records out of the live
//! page: the three-tier pipeline, image selection, URL canonicalization and
//! deduplication.

pub mod canonical;
pub mod image;
pub mod js_scripts;
pub mod pipeline;
pub mod types;

pub use canonical::{DedupKey, canonicalize_url, dedup_key, filter_new, same_site};
pub use image::{ImageCandidate, pick_best_image, score_candidate};
pub use pipeline::extract_items;
pub use types::{ExtractedRecord, ExtractionTier, ItemFacts, ItemsPayload, RawItem};
