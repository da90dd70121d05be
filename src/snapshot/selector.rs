//! Stable locator generation
//!
//! Builds a CSS locator for a captured element by walking upward until an
//! anchor with sufficient uniqueness is found. Priority per level: a
//! document-unique `id`, the element's first `data-*` attribute, else tag
//! plus up to two non-utility classes. A `:nth-of-type(..)` qualifier is
//! appended whenever same-tag siblings exist, so the finished chain resolves
//! to the original element as its first match. No validity is guaranteed
//! once the element's ancestry is restructured.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::dom::FrameDom;

static CSS_IDENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[A-Za-z_][A-Za-z0-9_-]*$").expect("static regex"));

/// Hash-like tokens that framework build pipelines append to class names.
static HASHED_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[0-9a-f]{6,}|[0-9]{5,}").expect("static regex"));

/// Scoped/generated class prefixes that change between builds.
const UTILITY_PREFIXES: &[&str] = &[
    "css-", "jss", "sc-", "svelte-", "chakra-", "mui", "makestyles", "emotion-", "styled__",
];

/// True for class names too unstable to anchor a selector on.
#[must_use]
pub fn is_utility_class(class: &str) -> bool {
    if class.len() > 24 || !CSS_IDENT.is_match(class) {
        return true;
    }
    let lower = class.to_ascii_lowercase();
    if UTILITY_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }
    HASHED_CLASS.is_match(class)
}

/// Generate a locator for `idx`, rooted at the nearest unique anchor.
#[must_use]
pub fn css_selector(dom: &FrameDom, idx: usize) -> String {
    let mut segments: Vec<String> = Vec::new();
    let mut cur = Some(idx);

    while let Some(i) = cur {
        // (1) document-unique id anchors the chain
        if let Some(id) = dom.id(i)
            && CSS_IDENT.is_match(id)
            && dom.count_id(id) == 1
        {
            segments.push(format!("#{id}"));
            break;
        }

        let node = &dom.nodes[i];
        let mut segment = if let Some((name, value)) =
            node.attrs.iter().find(|(k, _)| k.starts_with("data-"))
        {
            // (2) first data-* attribute, qualified by tag so the segment
            // cannot match a differently-tagged sibling first
            if value.is_empty() {
                format!("{}[{}]", node.tag, name)
            } else {
                format!("{}[{}=\"{}\"]", node.tag, name, value.replace('"', "\\\""))
            }
        } else {
            // (3) tag plus up to two stable classes
            let mut s = node.tag.clone();
            for class in dom
                .classes(i)
                .into_iter()
                .filter(|c| !is_utility_class(c))
                .take(2)
            {
                s.push('.');
                s.push_str(class);
            }
            s
        };

        let (pos, total) = dom.nth_of_type(i);
        if total > 1 {
            segment.push_str(&format!(":nth-of-type({pos})"));
        }

        // a document-unique (tag, data-attribute) pair also anchors
        let anchored = node
            .attrs
            .iter()
            .find(|(k, _)| k.starts_with("data-"))
            .is_some_and(|(name, value)| {
                (0..dom.len())
                    .filter(|&j| {
                        dom.nodes[j].tag == node.tag
                            && dom
                                .attr(j, name)
                                .is_some_and(|v| value.is_empty() || v == value)
                    })
                    .count()
                    == 1
            });

        segments.push(segment);
        if anchored {
            break;
        }
        cur = dom.parent(i);
    }

    segments.reverse();
    segments.join(" > ")
}

/// Strip positional qualifiers, generalizing a stale selector.
///
/// Used by the extraction pipeline when a stored list root no longer matches
/// enough nodes after DOM drift. Heuristic fallback only: the widened form
/// can over-match unrelated siblings.
#[must_use]
pub fn widen_selector(selector: &str) -> String {
    static NTH: Lazy<Regex> =
        Lazy::new(|| Regex::new(r":nth-of-type\(\d+\)").expect("static regex"));
    NTH.replace_all(selector, "").to_string()
}

// ---------------------------------------------------------------------------
// Restricted-grammar matching, used to validate generated locators against
// captured documents (and by tests to check the first-match contract).
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Segment {
    id: Option<String>,
    tag: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
    nth: Option<usize>,
}

fn parse_segment(raw: &str) -> Option<Segment> {
    let mut seg = Segment::default();
    let mut rest = raw.trim();
    if rest.is_empty() {
        return None;
    }
    if let Some(id) = rest.strip_prefix('#') {
        seg.id = Some(id.to_string());
        return Some(seg);
    }
    // leading tag
    let tag_end = rest
        .find(|c: char| c == '.' || c == '[' || c == ':')
        .unwrap_or(rest.len());
    if tag_end > 0 {
        seg.tag = Some(rest[..tag_end].to_string());
    }
    rest = &rest[tag_end..];
    while !rest.is_empty() {
        if let Some(r) = rest.strip_prefix('.') {
            let end = r
                .find(|c: char| c == '.' || c == '[' || c == ':')
                .unwrap_or(r.len());
            seg.classes.push(r[..end].to_string());
            rest = &r[end..];
        } else if let Some(r) = rest.strip_prefix('[') {
            let end = r.find(']')?;
            let body = &r[..end];
            match body.split_once('=') {
                Some((k, v)) => seg.attrs.push((
                    k.to_string(),
                    Some(v.trim_matches('"').replace("\\\"", "\"")),
                )),
                None => seg.attrs.push((body.to_string(), None)),
            }
            rest = &r[end + 1..];
        } else if let Some(r) = rest.strip_prefix(":nth-of-type(") {
            let end = r.find(')')?;
            seg.nth = r[..end].parse().ok();
            rest = &r[end + 1..];
        } else {
            return None;
        }
    }
    Some(seg)
}

fn segment_matches(dom: &FrameDom, idx: usize, seg: &Segment) -> bool {
    if let Some(id) = &seg.id {
        return dom.id(idx) == Some(id.as_str());
    }
    if let Some(tag) = &seg.tag
        && &dom.nodes[idx].tag != tag
    {
        return false;
    }
    let classes = dom.classes(idx);
    if !seg.classes.iter().all(|c| classes.contains(&c.as_str())) {
        return false;
    }
    for (name, expected) in &seg.attrs {
        match (dom.attr(idx, name), expected) {
            (Some(actual), Some(v)) if actual == v => {}
            (Some(_), None) => {}
            _ => return false,
        }
    }
    if let Some(nth) = seg.nth
        && dom.nth_of_type(idx).0 != nth
    {
        return false;
    }
    true
}

/// Resolve a child-combinator selector chain against a captured frame,
/// returning the first matching node in document order.
#[must_use]
pub fn query_first(dom: &FrameDom, selector: &str) -> Option<usize> {
    query_all(dom, selector).into_iter().next()
}

/// All matches of a child-combinator selector chain, in document order.
#[must_use]
pub fn query_all(dom: &FrameDom, selector: &str) -> Vec<usize> {
    let segments: Option<Vec<Segment>> = selector
        .split(" > ")
        .map(parse_segment)
        .collect();
    let Some(segments) = segments else {
        return Vec::new();
    };
    if segments.is_empty() {
        return Vec::new();
    }
    (0..dom.len())
        .filter(|&idx| {
            let mut cur = idx;
            for (pos, seg) in segments.iter().rev().enumerate() {
                if pos > 0 {
                    match dom.parent(cur) {
                        Some(p) => cur = p,
                        None => return false,
                    }
                }
                if !segment_matches(dom, cur, seg) {
                    return false;
                }
            }
            true
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DomNode;

    fn node(parent: i64, tag: &str) -> DomNode {
        DomNode {
            parent,
            tag: tag.to_string(),
            ..DomNode::default()
        }
    }

    fn with_attr(mut n: DomNode, k: &str, v: &str) -> DomNode {
        n.attrs.push((k.to_string(), v.to_string()));
        n
    }

    /// html > body > (div#feed > (article.card × 3), aside)
    fn fixture() -> FrameDom {
        let nodes = vec![
            node(-1, "html"),
            node(0, "body"),
            with_attr(node(1, "div"), "id", "feed"),
            with_attr(node(2, "article"), "class", "card css-1x2y3z4"),
            with_attr(node(2, "article"), "class", "card"),
            with_attr(node(2, "article"), "class", "card"),
            node(1, "aside"),
        ];
        FrameDom::from_nodes("main", nodes)
    }

    #[test]
    fn unique_id_anchors_the_chain() {
        let dom = fixture();
        assert_eq!(css_selector(&dom, 2), "#feed");
    }

    #[test]
    fn positional_qualifier_added_for_repeated_tags() {
        let dom = fixture();
        assert_eq!(
            css_selector(&dom, 4),
            "#feed > article.card:nth-of-type(2)"
        );
    }

    #[test]
    fn utility_classes_are_excluded() {
        let dom = fixture();
        let sel = css_selector(&dom, 3);
        assert_eq!(sel, "#feed > article.card:nth-of-type(1)");
        assert!(!sel.contains("css-"));
    }

    #[test]
    fn data_attribute_is_second_priority() {
        let nodes = vec![
            node(-1, "html"),
            node(0, "body"),
            with_attr(node(1, "div"), "data-testid", "results"),
        ];
        let dom = FrameDom::from_nodes("main", nodes);
        let sel = css_selector(&dom, 2);
        assert_eq!(sel, "div[data-testid=\"results\"]");
    }

    #[test]
    fn generated_selectors_resolve_to_the_original_element_first() {
        let dom = fixture();
        for idx in 0..dom.len() {
            let sel = css_selector(&dom, idx);
            assert_eq!(
                query_first(&dom, &sel),
                Some(idx),
                "selector {sel:?} did not resolve to node {idx}"
            );
        }
    }

    #[test]
    fn widen_strips_positional_qualifiers() {
        assert_eq!(
            widen_selector("#feed > article.card:nth-of-type(2) > a:nth-of-type(1)"),
            "#feed > article.card > a"
        );
    }

    #[test]
    fn widened_root_matches_every_repeated_item() {
        let dom = fixture();
        let widened = widen_selector(&css_selector(&dom, 4));
        assert_eq!(query_all(&dom, &widened), vec![3, 4, 5]);
    }

    #[test]
    fn utility_class_patterns() {
        assert!(is_utility_class("css-1a2b3c"));
        assert!(is_utility_class("sc-bdVaJa"));
        assert!(is_utility_class("x1234567"));
        assert!(is_utility_class("hover:underline"));
        assert!(!is_utility_class("card"));
        assert!(!is_utility_class("product-title"));
    }
}
