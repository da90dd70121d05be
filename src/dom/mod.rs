//! Captured frame documents
//!
//! A `FrameDom` is a read-only, serialized projection of one frame's element
//! tree, produced by a single script evaluation per frame. All analyzers and
//! the selector generator are pure functions over this structure, which keeps
//! them testable against synthetic fixtures without a live browser.

pub mod js_scripts;

use serde::{Deserialize, Serialize};

/// Element bounding box in frame viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BBox {
    #[must_use]
    pub fn area(&self) -> f64 {
        self.w * self.h
    }
}

/// One serialized element.
///
/// `parent` is an index into the owning capture's node table, `-1` for the
/// document element. `attrs` preserves document attribute order, which the
/// selector generator relies on when picking the first `data-*` attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub parent: i64,
    pub tag: String,
    #[serde(default)]
    pub attrs: Vec<(String, String)>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub bbox: BBox,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub font_size: f64,
    #[serde(default)]
    pub font_weight: u32,
    #[serde(default)]
    pub pointer_cursor: bool,
    #[serde(default)]
    pub click_handler: bool,
    #[serde(default)]
    pub focusable: bool,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub bg_image: Option<String>,
}

impl Default for DomNode {
    fn default() -> Self {
        Self {
            parent: -1,
            tag: "div".to_string(),
            attrs: Vec::new(),
            text: String::new(),
            bbox: BBox::default(),
            visible: true,
            font_size: 16.0,
            font_weight: 400,
            pointer_cursor: false,
            click_handler: false,
            focusable: false,
            href: None,
            bg_image: None,
        }
    }
}

/// Whole-document counters computed in the capture script.
///
/// These cover the full document even when the node table was truncated at
/// the capture cap, so density hints stay accurate on huge pages.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FrameStats {
    pub node_count: u64,
    pub anchor_count: u64,
    pub text_len: u64,
}

/// Raw capture payload as returned by the capture script.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameCapture {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub viewport_w: f64,
    #[serde(default)]
    pub viewport_h: f64,
    pub nodes: Vec<DomNode>,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub stats: FrameStats,
}

/// A captured frame document with derived child adjacency.
#[derive(Debug, Clone)]
pub struct FrameDom {
    pub frame_id: String,
    pub url: String,
    pub title: Option<String>,
    pub viewport_w: f64,
    pub viewport_h: f64,
    pub nodes: Vec<DomNode>,
    pub stats: FrameStats,
    pub truncated: bool,
    children: Vec<Vec<usize>>,
}

impl FrameDom {
    #[must_use]
    pub fn from_capture(frame_id: impl Into<String>, capture: FrameCapture) -> Self {
        let mut dom = Self {
            frame_id: frame_id.into(),
            url: capture.url,
            title: capture.title,
            viewport_w: capture.viewport_w,
            viewport_h: capture.viewport_h,
            nodes: capture.nodes,
            stats: capture.stats,
            truncated: capture.truncated,
            children: Vec::new(),
        };
        dom.rebuild_children();
        dom
    }

    /// Build a frame directly from nodes. Used by fixtures and tests.
    #[must_use]
    pub fn from_nodes(frame_id: impl Into<String>, nodes: Vec<DomNode>) -> Self {
        let stats = FrameStats {
            node_count: nodes.len() as u64,
            anchor_count: nodes.iter().filter(|n| n.tag == "a").count() as u64,
            text_len: nodes.iter().map(|n| n.text.len() as u64).sum(),
        };
        let mut dom = Self {
            frame_id: frame_id.into(),
            url: String::new(),
            title: None,
            viewport_w: 1280.0,
            viewport_h: 800.0,
            nodes,
            stats,
            truncated: false,
            children: Vec::new(),
        };
        dom.rebuild_children();
        dom
    }

    fn rebuild_children(&mut self) {
        self.children = vec![Vec::new(); self.nodes.len()];
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.parent >= 0 {
                if let Some(bucket) = self.children.get_mut(node.parent as usize) {
                    bucket.push(idx);
                }
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn parent(&self, idx: usize) -> Option<usize> {
        let p = self.nodes.get(idx)?.parent;
        (p >= 0).then_some(p as usize)
    }

    #[must_use]
    pub fn children(&self, idx: usize) -> &[usize] {
        self.children.get(idx).map_or(&[], Vec::as_slice)
    }

    /// Attribute value by name, exact match.
    #[must_use]
    pub fn attr(&self, idx: usize, name: &str) -> Option<&str> {
        self.nodes.get(idx)?.attrs.iter().find_map(|(k, v)| {
            (k == name).then_some(v.as_str())
        })
    }

    #[must_use]
    pub fn id(&self, idx: usize) -> Option<&str> {
        self.attr(idx, "id").filter(|v| !v.trim().is_empty())
    }

    #[must_use]
    pub fn classes(&self, idx: usize) -> Vec<&str> {
        self.attr(idx, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Number of elements in the document carrying exactly this id.
    #[must_use]
    pub fn count_id(&self, id: &str) -> usize {
        (0..self.nodes.len())
            .filter(|&i| self.id(i) == Some(id))
            .count()
    }

    /// 1-based position among same-tag element siblings, and the total count
    /// of same-tag siblings (including the node itself).
    #[must_use]
    pub fn nth_of_type(&self, idx: usize) -> (usize, usize) {
        let tag = &self.nodes[idx].tag;
        let siblings: Vec<usize> = match self.parent(idx) {
            Some(p) => self
                .children(p)
                .iter()
                .copied()
                .filter(|&c| &self.nodes[c].tag == tag)
                .collect(),
            None => vec![idx],
        };
        let pos = siblings.iter().position(|&c| c == idx).unwrap_or(0) + 1;
        (pos, siblings.len())
    }

    /// Preorder descendant indices, excluding the node itself.
    #[must_use]
    pub fn descendants(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.children(idx).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Own plus descendant text in document order, capped at `budget` chars.
    #[must_use]
    pub fn deep_text(&self, idx: usize, budget: usize) -> String {
        let mut out = String::new();
        let mut stack = vec![idx];
        // preorder with explicit stack, children pushed in reverse
        while let Some(n) = stack.pop() {
            let t = self.nodes[n].text.trim();
            if !t.is_empty() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(t);
                if out.chars().count() >= budget {
                    return crate::utils::clip_chars(&out, budget);
                }
            }
            stack.extend(self.children(n).iter().rev().copied());
        }
        crate::utils::clip_chars(&out, budget)
    }

    /// Indices of all nodes with the given tag, in document order.
    #[must_use]
    pub fn by_tag(&self, tag: &str) -> Vec<usize> {
        (0..self.nodes.len())
            .filter(|&i| self.nodes[i].tag == tag)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(parent: i64, tag: &str) -> DomNode {
        DomNode {
            parent,
            tag: tag.to_string(),
            ..DomNode::default()
        }
    }

    fn fixture() -> FrameDom {
        // html > body > (div#a, div, span)
        let mut root = node(-1, "html");
        root.attrs.push(("lang".into(), "en".into()));
        let body = node(0, "body");
        let mut a = node(1, "div");
        a.attrs.push(("id".into(), "a".into()));
        a.text = "first".into();
        let mut b = node(1, "div");
        b.text = "second".into();
        let span = node(1, "span");
        FrameDom::from_nodes("main", vec![root, body, a, b, span])
    }

    #[test]
    fn adjacency_follows_parent_pointers() {
        let dom = fixture();
        assert_eq!(dom.children(0), &[1]);
        assert_eq!(dom.children(1), &[2, 3, 4]);
        assert_eq!(dom.parent(4), Some(1));
        assert_eq!(dom.parent(0), None);
    }

    #[test]
    fn nth_of_type_counts_same_tag_siblings_only() {
        let dom = fixture();
        assert_eq!(dom.nth_of_type(2), (1, 2));
        assert_eq!(dom.nth_of_type(3), (2, 2));
        assert_eq!(dom.nth_of_type(4), (1, 1));
    }

    #[test]
    fn deep_text_concatenates_in_document_order() {
        let dom = fixture();
        assert_eq!(dom.deep_text(1, 80), "first second");
        assert_eq!(dom.deep_text(1, 5), "first");
    }

    #[test]
    fn attr_lookup_and_id_count() {
        let dom = fixture();
        assert_eq!(dom.attr(0, "lang"), Some("en"));
        assert_eq!(dom.id(2), Some("a"));
        assert_eq!(dom.count_id("a"), 1);
    }

    #[test]
    fn capture_payload_deserializes() {
        let payload = r#"{
            "url": "https://example.com/",
            "title": "Example",
            "viewport_w": 1280, "viewport_h": 720,
            "truncated": false,
            "stats": { "node_count": 2, "anchor_count": 0, "text_len": 5 },
            "nodes": [
                { "parent": -1, "tag": "html", "attrs": [], "text": "",
                  "bbox": { "x": 0, "y": 0, "w": 1280, "h": 720 },
                  "visible": true, "font_size": 16, "font_weight": 400,
                  "pointer_cursor": false, "click_handler": false,
                  "focusable": false, "href": null, "bg_image": null },
                { "parent": 0, "tag": "body", "attrs": [["class", "dark"]],
                  "text": "hello",
                  "bbox": { "x": 0, "y": 0, "w": 1280, "h": 720 },
                  "visible": true, "font_size": 16, "font_weight": 400,
                  "pointer_cursor": false, "click_handler": false,
                  "focusable": false, "href": null, "bg_image": null }
            ]
        }"#;
        let capture: FrameCapture = serde_json::from_str(payload).unwrap();
        let dom = FrameDom::from_capture("main", capture);
        assert_eq!(dom.len(), 2);
        assert_eq!(dom.classes(1), vec!["dark"]);
        assert_eq!(dom.title.as_deref(), Some("Example"));
    }
}
