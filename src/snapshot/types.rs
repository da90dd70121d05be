//! Snapshot data model
//!
//! `CompactSnapshot` is the size-bounded, serialization-safe projection of
//! one rendered page. Every element it mentions is carried as a `NodeRef`,
//! whose `ref_id` can be translated back into a concrete locator through the
//! snapshot's `RefMap`. A snapshot/ref-map pair lives for exactly one
//! extraction step; neither survives a navigation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::dom::BBox;

/// Abstract, frame-scoped, re-locatable reference to one element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRef {
    pub ref_id: String,
    pub selector: String,
    pub frame_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
}

/// A detected container of structurally repeated children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBlock {
    pub root: NodeRef,
    pub item_count: usize,
    /// Tag shared by the repeated children; lets a consumer re-derive the
    /// item set from the root selector after the snapshot is stale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_link_selector: Option<String>,
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub input: NodeRef,
}

/// A mapped form. `submit` is omitted entirely when no submit control was
/// detected, preserving an unambiguous "none found" state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormBlock {
    pub form: NodeRef,
    pub fields: Vec<FormField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit: Option<NodeRef>,
}

/// A scored pagination candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationCandidate {
    pub node: NodeRef,
    pub href: String,
    pub score: f64,
}

/// Cheap whole-page ratios used as content-readiness proxies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageHints {
    pub text_density: f64,
    pub link_density: f64,
}

/// The bounded page summary handed to decision-making consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactSnapshot {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub headings: Vec<String>,
    pub lists: Vec<ListBlock>,
    pub controls: Vec<NodeRef>,
    pub pagination: Vec<PaginationCandidate>,
    pub forms: Vec<FormBlock>,
    pub hints: PageHints,
    /// Serialized size, recorded for observability.
    pub byte_size: usize,
    /// Build duration in milliseconds.
    pub build_ms: u64,
}

/// Concrete locator stored behind a `ref_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefEntry {
    pub selector: String,
    pub frame_id: String,
}

/// Translates `ref_id`s back into actionable locators. Lifetime: one snapshot.
///
/// The reference key is the full 64-bit content hash of
/// `(frame, selector, href, name)` rendered as hex. Distinct elements that
/// still collide (same frame and selector can legitimately repeat across
/// re-registrations) are disambiguated with a numeric suffix instead of
/// silently overwriting the earlier entry.
#[derive(Debug, Default, Clone)]
pub struct RefMap {
    entries: HashMap<String, RefEntry>,
}

impl RefMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node and assign its `ref_id`, disambiguating collisions.
    pub fn register(&mut self, node: &mut NodeRef) {
        let base = ref_hash(
            &node.frame_id,
            &node.selector,
            node.href.as_deref(),
            node.name.as_deref(),
        );
        let entry = RefEntry {
            selector: node.selector.clone(),
            frame_id: node.frame_id.clone(),
        };
        let mut key = base.clone();
        let mut bump = 1usize;
        while let Some(existing) = self.entries.get(&key) {
            if *existing == entry {
                node.ref_id = key;
                return;
            }
            bump += 1;
            key = format!("{base}-{bump}");
        }
        self.entries.insert(key.clone(), entry);
        node.ref_id = key;
    }

    #[must_use]
    pub fn resolve(&self, ref_id: &str) -> Option<&RefEntry> {
        self.entries.get(ref_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn ref_hash(frame: &str, selector: &str, href: Option<&str>, name: Option<&str>) -> String {
    let material = format!(
        "{frame}\u{1}{selector}\u{1}{}\u{1}{}",
        href.unwrap_or(""),
        name.unwrap_or("")
    );
    format!("{:016x}", xxh3_64(material.as_bytes()))
}

impl NodeRef {
    /// Unregistered reference; `ref_id` is assigned by `RefMap::register`.
    #[must_use]
    pub fn unregistered(selector: String, frame_id: &str) -> Self {
        Self {
            ref_id: String::new(),
            selector,
            frame_id: frame_id.to_string(),
            role: None,
            name: None,
            href: None,
            visible: None,
            bbox: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(frame: &str, selector: &str, href: Option<&str>) -> NodeRef {
        let mut n = NodeRef::unregistered(selector.to_string(), frame);
        n.href = href.map(str::to_string);
        n
    }

    #[test]
    fn ref_ids_are_stable_for_identical_content() {
        let mut map = RefMap::new();
        let mut a = node("main", "#x", Some("https://e.com/a"));
        let mut b = node("main", "#x", Some("https://e.com/a"));
        map.register(&mut a);
        map.register(&mut b);
        assert_eq!(a.ref_id, b.ref_id);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn colliding_registrations_are_disambiguated_not_overwritten() {
        let mut map = RefMap::new();
        let mut a = node("main", "#x", None);
        map.register(&mut a);
        // Same hash material but a different locator must not clobber `a`.
        let forged = RefEntry {
            selector: "#y".to_string(),
            frame_id: "main".to_string(),
        };
        let mut b = node("main", "#x", None);
        map.entries.insert(a.ref_id.clone(), forged.clone());
        map.register(&mut b);
        assert_ne!(b.ref_id, a.ref_id);
        assert_eq!(map.resolve(&a.ref_id), Some(&forged));
        assert_eq!(
            map.resolve(&b.ref_id).map(|e| e.selector.as_str()),
            Some("#x")
        );
    }

    #[test]
    fn different_frames_get_different_ids() {
        let mut map = RefMap::new();
        let mut a = node("main", "#x", None);
        let mut b = node("f1", "#x", None);
        map.register(&mut a);
        map.register(&mut b);
        assert_ne!(a.ref_id, b.ref_id);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn absent_submit_is_omitted_from_serialization() {
        let form = FormBlock {
            form: node("main", "form", None),
            fields: Vec::new(),
            submit: None,
        };
        let json = serde_json::to_string(&form).unwrap();
        assert!(!json.contains("submit"));
    }
}
