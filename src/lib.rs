//! pagesift — page distillation and record extraction
//!
//! Turns a live, rendered web page into a compact, structure-agnostic
//! summary (headings, repeated-item lists, clickable controls, pagination
//! candidates, forms, density hints), then drives a bounded multi-page
//! extraction loop over that summary, yielding deduplicated structured
//! records.
//!
//! The distillation analyzers are pure functions over a captured DOM
//! (`dom::FrameDom`), so the heuristics run and test without a browser; the
//! browser work is confined to capture scripts, the extraction collection
//! scripts and the navigation loop.

pub mod browser_setup;
pub mod config;
pub mod dom;
pub mod engine;
pub mod errors;
pub mod extract;
pub mod output;
pub mod schema;
pub mod snapshot;
pub mod utils;

pub use config::ScrapeConfig;
pub use engine::{Navigator, ScrapingState, run_scrape};
pub use errors::ScrapeError;
pub use extract::{ExtractedRecord, canonicalize_url};
pub use output::{OutputFormat, ScrapeResult, write_result};
pub use schema::TargetSchema;
pub use snapshot::{CompactSnapshot, Heuristics, NodeRef, RefMap, build_snapshot};
