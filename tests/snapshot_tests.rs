//! Snapshot assembly against synthetic captured documents
//!
//! Exercises the pure side of distillation: analyzers, merge, size caps and
//! reference registration, with no browser involved.

use pagesift::dom::{BBox, DomNode, FrameDom};
use pagesift::snapshot::{Heuristics, assemble, query_first};

fn node(parent: i64, tag: &str) -> DomNode {
    DomNode {
        parent,
        tag: tag.to_string(),
        bbox: BBox {
            x: 0.0,
            y: 0.0,
            w: 400.0,
            h: 60.0,
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

/// A page far over every budget: 200 headings, 500 controls, 10 repeated
/// groups large enough to qualify as lists.
fn oversized_page() -> FrameDom {
    let mut nodes = vec![node(-1, "html"), node(0, "body")];
    let header = nodes.len() as i64;
    nodes.push(node(1, "header"));
    for i in 0..200 {
        nodes.push(with_text(node(header, "h2"), &format!("Heading number {i}")));
    }
    let nav = nodes.len() as i64;
    nodes.push(node(1, "nav"));
    for i in 0..500 {
        let mut a = with_text(node(nav, "a"), &format!("control {i}"));
        a.href = Some(format!("https://e.com/c/{i}"));
        nodes.push(a);
    }
    for group in 0..10 {
        let container_idx = nodes.len() as i64;
        nodes.push(with_attr(
            node(1, "div"),
            "class",
            &format!("content-block-{group}"),
        ));
        for i in 0..(8 + group) {
            let item_idx = nodes.len() as i64;
            let mut item = node(container_idx, "article");
            item.bbox = BBox {
                x: 0.0,
                y: 0.0,
                w: 600.0,
                h: 150.0,
            };
            nodes.push(item);
            let mut link = with_text(node(item_idx, "a"), &format!("item {group}-{i}"));
            link.href = Some(format!("https://e.com/{group}/{i}"));
            nodes.push(link);
        }
    }
    let mut dom = FrameDom::from_nodes("main", nodes);
    dom.url = "https://e.com/huge".to_string();
    dom.title = Some("Huge page".to_string());
    dom
}

#[test]
fn snapshot_respects_all_size_caps() {
    let heur = Heuristics::default();
    let (snapshot, _refs) = assemble(&[oversized_page()], &heur);

    assert!(snapshot.headings.len() <= heur.max_headings);
    assert!(snapshot.controls.len() <= heur.max_controls);
    assert!(snapshot.lists.len() <= heur.max_lists);
    assert!(snapshot.pagination.len() <= heur.max_pagination);
    assert!(snapshot.forms.len() <= heur.max_forms);
    assert!(snapshot.byte_size > 0);
}

#[test]
fn lists_are_ranked_by_item_count() {
    let (snapshot, _refs) = assemble(&[oversized_page()], &Heuristics::default());
    assert_eq!(snapshot.lists.len(), 2);
    // the last two groups are the biggest (17 and 16 members)
    assert_eq!(snapshot.lists[0].item_count, 17);
    assert_eq!(snapshot.lists[1].item_count, 16);
    assert!(snapshot.lists[0].item_count >= snapshot.lists[1].item_count);
}

#[test]
fn every_snapshot_ref_resolves_through_the_map() {
    let dom = oversized_page();
    let (snapshot, refs) = assemble(&[dom.clone()], &Heuristics::default());
    for control in &snapshot.controls {
        let entry = refs.resolve(&control.ref_id).expect("control registered");
        assert_eq!(entry.frame_id, "main");
        // the stored locator must resolve to a node in the captured frame
        assert!(query_first(&dom, &entry.selector).is_some());
    }
    for list in &snapshot.lists {
        assert!(refs.resolve(&list.root.ref_id).is_some());
    }
}

#[test]
fn frames_merge_with_frame_scoped_refs() {
    let main = oversized_page();
    let mut sub_nodes = vec![node(-1, "html"), node(0, "body")];
    sub_nodes.push(with_text(node(1, "h1"), "Embedded widget"));
    let mut sub_link = with_text(node(1, "a"), "Next");
    sub_link.href = Some("https://e.com/huge?page=2".to_string());
    sub_nodes.push(sub_link);
    let sub = FrameDom::from_nodes("f1", sub_nodes);

    let (snapshot, _refs) = assemble(&[main, sub], &Heuristics::default());
    assert!(snapshot.headings.iter().any(|h| h == "Embedded widget"));
    assert_eq!(snapshot.pagination.len(), 1);
    assert_eq!(snapshot.pagination[0].node.frame_id, "f1");
    // main-frame url wins
    assert_eq!(snapshot.url, "https://e.com/huge");
}

#[test]
fn headings_dedupe_across_frames_in_order() {
    let mut a_nodes = vec![node(-1, "html"), node(0, "body")];
    a_nodes.push(with_text(node(1, "h1"), "Shared Title"));
    a_nodes.push(with_text(node(1, "h2"), "Only In Main"));
    let a = FrameDom::from_nodes("main", a_nodes);

    let mut b_nodes = vec![node(-1, "html"), node(0, "body")];
    b_nodes.push(with_text(node(1, "h1"), "Shared Title"));
    let b = FrameDom::from_nodes("f1", b_nodes);

    let (snapshot, _) = assemble(&[a, b], &Heuristics::default());
    assert_eq!(snapshot.headings, vec!["Shared Title", "Only In Main"]);
}

#[test]
fn density_hints_cover_all_frames() {
    let dom = oversized_page();
    let (snapshot, _) = assemble(&[dom], &Heuristics::default());
    assert!(snapshot.hints.link_density > 0.0);
    assert!(snapshot.hints.text_density > 0.0);
}
