//! Per-frame distillation analyzers
//!
//! Each analyzer is a pure function over one captured `FrameDom` plus the
//! shared `Heuristics`, producing frame-local output that the assembler
//! merges and caps. Nothing here touches the live page, so every analyzer is
//! exercised directly against fixture documents in tests.

use std::collections::HashSet;

use url::Url;

use crate::dom::FrameDom;
use crate::snapshot::heuristics::Heuristics;
use crate::snapshot::selector::css_selector;
use crate::snapshot::types::{
    FormBlock, FormField, ListBlock, NodeRef, PaginationCandidate,
};
use crate::utils::clip_chars;

/// Next-like anchor texts recognized by the pagination ranker.
const NEXT_TOKENS: &[&str] = &["next", "older", "more"];
const NEXT_GLYPHS: &[char] = &['›', '»', '→', '❯', '▸'];

/// Query parameters that mark an href as pagination-shaped.
const PAGE_PARAMS: &[&str] = &["page", "p", "pg", "paged", "offset", "start"];

/// Build an unregistered `NodeRef` for a captured node.
pub(crate) fn node_ref(dom: &FrameDom, idx: usize) -> NodeRef {
    let mut r = NodeRef::unregistered(css_selector(dom, idx), &dom.frame_id);
    r.role = dom.attr(idx, "role").map(str::to_string);
    let name = dom.deep_text(idx, 60);
    r.name = (!name.is_empty()).then_some(name);
    r.href = dom.nodes[idx].href.clone();
    r.visible = Some(dom.nodes[idx].visible);
    r.bbox = Some(dom.nodes[idx].bbox);
    r
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// Short heading strings in document order, clipped to the character budget.
///
/// Union of explicit headings (h1-h6, heading role, `aria-level`) and
/// surrogate headings that merely look like headings (large or heavy font,
/// enough rendered area, enough text). Collection stops at the internal cap;
/// cross-frame dedup and the final budget are applied by the assembler.
#[must_use]
pub fn extract_headings(dom: &FrameDom, heur: &Heuristics) -> Vec<String> {
    let mut out = Vec::new();
    for idx in 0..dom.len() {
        if out.len() >= heur.heading_collect_cap {
            break;
        }
        let node = &dom.nodes[idx];
        let explicit = matches!(
            node.tag.as_str(),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
        ) || dom.attr(idx, "role") == Some("heading")
            || dom.attr(idx, "aria-level").is_some();

        if explicit {
            let text = dom.deep_text(idx, heur.heading_char_budget);
            if !text.is_empty() {
                out.push(text);
            }
            continue;
        }

        let looks_like_heading = node.visible
            && (node.font_size >= heur.heading_font_size_min
                || node.font_weight >= heur.heading_font_weight_min)
            && node.bbox.area() >= heur.heading_min_area
            && node.text.chars().count() >= heur.heading_min_text_len;
        if looks_like_heading {
            out.push(clip_chars(&node.text, heur.heading_char_budget));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Clickables
// ---------------------------------------------------------------------------

/// Visible actionable elements, collected in document order.
///
/// The scan stops once the over-collection buffer (overscan × limit) is
/// full, bounding work on huge pages. Final area-descending ordering and
/// truncation to `max_controls` happen after the cross-frame merge.
#[must_use]
pub fn extract_controls(dom: &FrameDom, heur: &Heuristics) -> Vec<NodeRef> {
    let buffer = heur.max_controls * heur.overscan_factor;
    let mut out = Vec::new();
    for idx in 0..dom.len() {
        if out.len() >= buffer {
            break;
        }
        let node = &dom.nodes[idx];
        if !node.visible || node.bbox.area() <= heur.control_min_area {
            continue;
        }
        let role = dom.attr(idx, "role");
        let actionable = node.href.is_some()
            || matches!(role, Some("button" | "link"))
            || node.focusable
            || node.pointer_cursor
            || node.click_handler;
        if actionable {
            out.push(node_ref(dom, idx));
        }
    }
    out
}

/// Final control ordering: larger area first, document order on ties.
pub fn order_controls(controls: &mut Vec<NodeRef>, heur: &Heuristics) {
    controls.sort_by(|a, b| {
        let area = |n: &NodeRef| n.bbox.map_or(0.0, |b| b.area());
        area(b)
            .partial_cmp(&area(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    controls.truncate(heur.max_controls);
}

// ---------------------------------------------------------------------------
// List blocks
// ---------------------------------------------------------------------------

/// Detect repeated-item containers by sibling-signature grouping.
///
/// For each candidate container (`main`, a "content" class, or `body`) the
/// direct children are grouped by `(child count, tag sequence of the first
/// `signature_depth` grandchildren)`. Groups with at least
/// `repeat_threshold` members whose first member clears the size floor
/// become `ListBlock`s. Layout-agnostic: a feed is a feed because its rows
/// repeat, not because it uses semantic tags.
#[must_use]
pub fn detect_list_blocks(dom: &FrameDom, heur: &Heuristics) -> Vec<ListBlock> {
    let mut containers = Vec::new();
    for idx in 0..dom.len() {
        let tag = dom.nodes[idx].tag.as_str();
        let content_class = dom
            .classes(idx)
            .iter()
            .any(|c| c.to_ascii_lowercase().contains("content"));
        if tag == "main" || content_class || tag == "body" {
            containers.push(idx);
        }
    }

    let mut blocks = Vec::new();
    for container in containers {
        // group direct children by structural signature, first-seen order
        let mut groups: Vec<((String, usize, Vec<String>), Vec<usize>)> = Vec::new();
        for &child in dom.children(container) {
            let grandkids = dom.children(child);
            let sig = (
                dom.nodes[child].tag.clone(),
                grandkids.len(),
                grandkids
                    .iter()
                    .take(heur.signature_depth)
                    .map(|&g| dom.nodes[g].tag.clone())
                    .collect::<Vec<_>>(),
            );
            match groups.iter_mut().find(|(s, _)| *s == sig) {
                Some((_, members)) => members.push(child),
                None => groups.push((sig, vec![child])),
            }
        }

        for (_, members) in groups {
            if members.len() < heur.repeat_threshold {
                continue;
            }
            if dom.nodes[members[0]].bbox.area() < heur.list_min_item_area {
                continue;
            }
            let has_links = members.iter().any(|&m| {
                dom.descendants(m).into_iter().any(|d| {
                    dom.nodes[d].href.is_some() || dom.attr(d, "role") == Some("link")
                })
            });
            let samples = members
                .iter()
                .map(|&m| dom.deep_text(m, heur.sample_char_budget))
                .filter(|t| !t.is_empty())
                .take(heur.list_samples)
                .collect();
            blocks.push(ListBlock {
                root: node_ref(dom, container),
                item_count: members.len(),
                item_tag: Some(dom.nodes[members[0]].tag.clone()),
                item_link_selector: has_links.then(|| "a, [role=link]".to_string()),
                samples,
            });
        }
    }

    blocks.sort_by(|a, b| b.item_count.cmp(&a.item_count));
    blocks
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

fn has_page_param(href: &str) -> bool {
    Url::parse(href).is_ok_and(|u| {
        u.query_pairs()
            .any(|(k, _)| PAGE_PARAMS.contains(&k.to_ascii_lowercase().as_str()))
    })
}

fn next_like_text(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower
        .split_whitespace()
        .any(|w| NEXT_TOKENS.contains(&w.trim_matches(|c: char| !c.is_alphanumeric())))
        || lower.chars().any(|c| NEXT_GLYPHS.contains(&c))
}

/// Score and collect pagination-shaped anchors within one frame.
///
/// Candidates qualify through `rel=next`, next-like visible text, or a
/// pagination query parameter; the score is the weighted sum of those
/// signals plus a lower-viewport position bonus. Deduplicated by
/// `(href, selector)` within the frame; cross-frame merge, the final sort
/// and the top-2 cut happen in the assembler.
#[must_use]
pub fn rank_pagination(dom: &FrameDom, heur: &Heuristics) -> Vec<PaginationCandidate> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out = Vec::new();
    for idx in 0..dom.len() {
        if dom.nodes[idx].tag != "a" && dom.attr(idx, "role") != Some("link") {
            continue;
        }
        let Some(href) = dom.nodes[idx].href.clone() else {
            continue;
        };

        let rel_next = dom
            .attr(idx, "rel")
            .is_some_and(|r| r.split_whitespace().any(|t| t.eq_ignore_ascii_case("next")));
        let text_match = next_like_text(&dom.deep_text(idx, 40));
        let param_match = has_page_param(&href);
        if !(rel_next || text_match || param_match) {
            continue;
        }

        let mut score = 0.0;
        if rel_next {
            score += heur.pagination_rel_next_weight;
        }
        if text_match {
            score += heur.pagination_text_weight;
        }
        if param_match {
            score += heur.pagination_param_weight;
        }
        let node = &dom.nodes[idx];
        if dom.viewport_h > 0.0 && node.bbox.y >= heur.pagination_lower_frac * dom.viewport_h {
            score += heur.pagination_position_weight;
        }

        let reference = node_ref(dom, idx);
        if !seen.insert((href.clone(), reference.selector.clone())) {
            continue;
        }
        out.push(PaginationCandidate {
            node: reference,
            href,
            score,
        });
    }
    out
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

fn resolve_label(dom: &FrameDom, input: usize) -> Option<String> {
    // 1. label[for=<id>] anywhere in the document
    if let Some(id) = dom.id(input) {
        for label in dom.by_tag("label") {
            if dom.attr(label, "for") == Some(id) {
                let text = dom.deep_text(label, 60);
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    // 2. immediately preceding sibling <label>
    if let Some(parent) = dom.parent(input) {
        let siblings = dom.children(parent);
        if let Some(pos) = siblings.iter().position(|&s| s == input)
            && pos > 0
        {
            let prev = siblings[pos - 1];
            if dom.nodes[prev].tag == "label" {
                let text = dom.deep_text(prev, 60);
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    // 3. aria-label, 4. placeholder
    dom.attr(input, "aria-label")
        .or_else(|| dom.attr(input, "placeholder"))
        .map(str::to_string)
}

fn is_submit_control(dom: &FrameDom, idx: usize) -> bool {
    let ty = dom.attr(idx, "type");
    match dom.nodes[idx].tag.as_str() {
        "button" | "input" => ty == Some("submit"),
        _ => false,
    }
}

/// Map forms to labeled fields and an optional submit control.
///
/// Field order mirrors document order. When no submit control exists the
/// block carries no `submit` entry at all.
#[must_use]
pub fn map_forms(dom: &FrameDom, heur: &Heuristics) -> Vec<FormBlock> {
    let mut out = Vec::new();
    for form in dom.by_tag("form").into_iter().take(heur.max_forms) {
        let descendants = dom.descendants(form);
        let fields = descendants
            .iter()
            .filter(|&&d| matches!(dom.nodes[d].tag.as_str(), "input" | "textarea" | "select"))
            .take(heur.max_form_fields)
            .map(|&d| FormField {
                label: resolve_label(dom, d),
                input: node_ref(dom, d),
            })
            .collect();
        let submit = descendants
            .iter()
            .find(|&&d| is_submit_control(dom, d))
            .map(|&d| node_ref(dom, d));
        out.push(FormBlock {
            form: node_ref(dom, form),
            fields,
            submit,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{BBox, DomNode};

    fn node(parent: i64, tag: &str) -> DomNode {
        DomNode {
            parent,
            tag: tag.to_string(),
            bbox: BBox {
                x: 0.0,
                y: 0.0,
                w: 300.0,
                h: 40.0,
            },
            ..DomNode::default()
        }
    }

    fn with_attr(mut n: DomNode, k: &str, v: &str) -> DomNode {
        n.attrs.push((k.to_string(), v.to_string()));
        n
    }

    fn with_text(mut n: DomNode, t: &str) -> DomNode {
        n.text = t.to_string();
        n
    }

    fn shell() -> Vec<DomNode> {
        vec![node(-1, "html"), node(0, "body")]
    }

    #[test]
    fn headings_include_explicit_and_surrogate_sources() {
        let mut nodes = shell();
        nodes.push(with_text(node(1, "h1"), "Page Title"));
        // surrogate: heavy font, enough area and text
        let mut surrogate = with_text(node(1, "div"), "A prominent section banner");
        surrogate.font_weight = 700;
        surrogate.bbox = BBox {
            x: 0.0,
            y: 0.0,
            w: 400.0,
            h: 30.0,
        };
        nodes.push(surrogate);
        // too-short surrogate is ignored
        let mut short = with_text(node(1, "div"), "Hi");
        short.font_size = 28.0;
        nodes.push(short);
        let dom = FrameDom::from_nodes("main", nodes);
        let headings = extract_headings(&dom, &Heuristics::default());
        assert_eq!(headings, vec!["Page Title", "A prominent section banner"]);
    }

    #[test]
    fn heading_collection_stops_at_internal_cap() {
        let mut nodes = shell();
        for i in 0..40 {
            nodes.push(with_text(node(1, "h2"), &format!("Heading {i}")));
        }
        let dom = FrameDom::from_nodes("main", nodes);
        let heur = Heuristics::default();
        let headings = extract_headings(&dom, &heur);
        assert_eq!(headings.len(), heur.heading_collect_cap);
    }

    #[test]
    fn controls_require_visibility_and_an_actionable_signal() {
        let mut nodes = shell();
        let mut link = with_text(node(1, "a"), "Docs");
        link.href = Some("https://example.com/docs".to_string());
        nodes.push(link);
        let mut hidden = with_text(node(1, "a"), "Hidden");
        hidden.href = Some("https://example.com/x".to_string());
        hidden.visible = false;
        nodes.push(hidden);
        nodes.push(with_text(node(1, "span"), "plain text"));
        let mut pointer = with_text(node(1, "div"), "Open menu");
        pointer.pointer_cursor = true;
        nodes.push(pointer);
        let dom = FrameDom::from_nodes("main", nodes);
        let controls = extract_controls(&dom, &Heuristics::default());
        let names: Vec<_> = controls.iter().filter_map(|c| c.name.as_deref()).collect();
        assert_eq!(names, vec!["Docs", "Open menu"]);
    }

    #[test]
    fn control_ordering_prefers_larger_area_then_document_order() {
        let mut nodes = shell();
        let mut small = with_text(node(1, "a"), "small");
        small.href = Some("https://e.com/1".into());
        small.bbox.w = 50.0;
        nodes.push(small);
        let mut big = with_text(node(1, "a"), "big");
        big.href = Some("https://e.com/2".into());
        big.bbox.w = 500.0;
        nodes.push(big);
        let dom = FrameDom::from_nodes("main", nodes);
        let heur = Heuristics::default();
        let mut controls = extract_controls(&dom, &heur);
        order_controls(&mut controls, &heur);
        assert_eq!(controls[0].name.as_deref(), Some("big"));
        assert_eq!(controls[1].name.as_deref(), Some("small"));
    }

    #[test]
    fn overscan_buffer_bounds_collection() {
        let mut nodes = shell();
        for i in 0..100 {
            let mut a = with_text(node(1, "a"), &format!("link {i}"));
            a.href = Some(format!("https://e.com/{i}"));
            nodes.push(a);
        }
        let dom = FrameDom::from_nodes("main", nodes);
        let heur = Heuristics::default();
        let controls = extract_controls(&dom, &heur);
        assert_eq!(controls.len(), heur.max_controls * heur.overscan_factor);
    }

    fn feed(members: usize) -> FrameDom {
        let mut nodes = shell();
        let feed_idx = nodes.len() as i64;
        nodes.push(with_attr(
            with_attr(node(1, "div"), "id", "feed"),
            "class",
            "content-list",
        ));
        for i in 0..members {
            let item_idx = nodes.len() as i64;
            let mut item = node(feed_idx, "article");
            item.bbox = BBox {
                x: 0.0,
                y: 100.0 * i as f64,
                w: 600.0,
                h: 120.0,
            };
            nodes.push(item);
            let mut a = with_text(node(item_idx, "a"), &format!("Item {i}"));
            a.href = Some(format!("https://e.com/item/{i}"));
            nodes.push(a);
            nodes.push(with_text(node(item_idx, "p"), "snippet text"));
        }
        FrameDom::from_nodes("main", nodes)
    }

    #[test]
    fn ten_identical_siblings_yield_one_list_block() {
        let dom = feed(10);
        let blocks = detect_list_blocks(&dom, &Heuristics::default());
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].item_count, 10);
        assert_eq!(blocks[0].item_tag.as_deref(), Some("article"));
        assert_eq!(blocks[0].item_link_selector.as_deref(), Some("a, [role=link]"));
        assert_eq!(blocks[0].samples.len(), 3);
    }

    #[test]
    fn five_identical_siblings_yield_no_list_block() {
        let dom = feed(5);
        assert!(detect_list_blocks(&dom, &Heuristics::default()).is_empty());
    }

    #[test]
    fn undersized_repeats_are_excluded() {
        let mut dom = feed(10);
        for n in &mut dom.nodes {
            if n.tag == "article" {
                n.bbox = BBox {
                    x: 0.0,
                    y: 0.0,
                    w: 20.0,
                    h: 20.0,
                };
            }
        }
        assert!(detect_list_blocks(&dom, &Heuristics::default()).is_empty());
    }

    #[test]
    fn rel_next_outranks_text_only_candidates() {
        let mut nodes = shell();
        let mut by_text = with_text(node(1, "a"), "Next");
        by_text.href = Some("https://e.com/two".into());
        nodes.push(by_text);
        let mut by_rel = with_text(node(1, "a"), "continue");
        by_rel.href = Some("https://e.com/page-two".into());
        by_rel = with_attr(by_rel, "rel", "next");
        nodes.push(by_rel);
        let dom = FrameDom::from_nodes("main", nodes);
        let mut candidates = rank_pagination(&dom, &Heuristics::default());
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].href, "https://e.com/page-two");
        assert!(candidates[0].score > candidates[1].score);
    }

    #[test]
    fn page_param_and_position_contribute_to_score() {
        let mut nodes = shell();
        let mut low = with_text(node(1, "a"), "2");
        low.href = Some("https://e.com/list?page=2".into());
        low.bbox.y = 700.0; // lower 40% of an 800px viewport
        nodes.push(low);
        let dom = FrameDom::from_nodes("main", nodes);
        let heur = Heuristics::default();
        let candidates = rank_pagination(&dom, &heur);
        assert_eq!(candidates.len(), 1);
        let expected = heur.pagination_param_weight + heur.pagination_position_weight;
        assert!((candidates[0].score - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn form_labels_resolve_in_priority_order() {
        let mut nodes = shell();
        let form_idx = nodes.len() as i64;
        nodes.push(node(1, "form"));
        // label[for] match
        nodes.push(with_attr(
            with_text(node(form_idx, "label"), "Email"),
            "for",
            "email",
        ));
        nodes.push(with_attr(node(form_idx, "input"), "id", "email"));
        // preceding sibling label
        nodes.push(with_text(node(form_idx, "label"), "Name"));
        nodes.push(node(form_idx, "input"));
        // placeholder fallback
        nodes.push(with_attr(node(form_idx, "input"), "placeholder", "Search…"));
        let dom = FrameDom::from_nodes("main", nodes);
        let forms = map_forms(&dom, &Heuristics::default());
        assert_eq!(forms.len(), 1);
        let labels: Vec<_> = forms[0]
            .fields
            .iter()
            .map(|f| f.label.as_deref())
            .collect();
        assert_eq!(labels, vec![Some("Email"), Some("Name"), Some("Search…")]);
        assert!(forms[0].submit.is_none());
    }

    #[test]
    fn submit_control_detected_by_type() {
        let mut nodes = shell();
        let form_idx = nodes.len() as i64;
        nodes.push(node(1, "form"));
        nodes.push(node(form_idx, "input"));
        nodes.push(with_attr(
            with_text(node(form_idx, "button"), "Go"),
            "type",
            "submit",
        ));
        let dom = FrameDom::from_nodes("main", nodes);
        let forms = map_forms(&dom, &Heuristics::default());
        assert_eq!(
            forms[0].submit.as_ref().and_then(|s| s.name.as_deref()),
            Some("Go")
        );
    }
}
