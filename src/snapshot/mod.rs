//! Page distillation
//!
//! Converts a rendered document into a bounded, stable-selector summary:
//! headings, repeated-item lists, clickable controls, pagination candidates,
//! forms and density hints, plus the reference map that turns any summarized
//! element back into an actionable locator.

pub mod analyzers;
pub mod assembler;
pub mod frames;
pub mod heuristics;
pub mod selector;
pub mod types;

pub use assembler::{assemble, build_snapshot};
pub use heuristics::Heuristics;
pub use selector::{css_selector, query_all, query_first, widen_selector};
pub use types::{
    CompactSnapshot, FormBlock, FormField, ListBlock, NodeRef, PageHints, PaginationCandidate,
    RefEntry, RefMap,
};
