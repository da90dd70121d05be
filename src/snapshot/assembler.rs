//! Snapshot assembly
//!
//! Merges per-frame analyzer output into one bounded `CompactSnapshot` plus
//! its `RefMap`. The merge itself is pure (`assemble`); `build_snapshot`
//! wraps it with the concurrent frame captures and records byte size and
//! build duration for observability.

use std::collections::HashSet;
use std::time::Instant;

use anyhow::Result;
use chromiumoxide::Page;

use crate::dom::FrameDom;
use crate::snapshot::analyzers::{
    detect_list_blocks, extract_controls, extract_headings, map_forms, order_controls,
    rank_pagination,
};
use crate::snapshot::heuristics::Heuristics;
use crate::snapshot::types::{CompactSnapshot, PageHints, RefMap};

/// Merge captured frames into a capped snapshot and its reference map.
#[must_use]
pub fn assemble(frames: &[FrameDom], heur: &Heuristics) -> (CompactSnapshot, RefMap) {
    let mut headings = Vec::new();
    let mut controls = Vec::new();
    let mut lists = Vec::new();
    let mut pagination = Vec::new();
    let mut forms = Vec::new();

    for frame in frames {
        headings.extend(extract_headings(frame, heur));
        controls.extend(extract_controls(frame, heur));
        lists.extend(detect_list_blocks(frame, heur));
        pagination.extend(rank_pagination(frame, heur));
        forms.extend(map_forms(frame, heur));
    }

    // order-preserving dedup, then the final budget
    let mut seen = HashSet::new();
    headings.retain(|h| seen.insert(h.clone()));
    headings.truncate(heur.max_headings);

    order_controls(&mut controls, heur);

    lists.sort_by(|a, b| b.item_count.cmp(&a.item_count));
    lists.truncate(heur.max_lists);

    pagination.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    pagination.truncate(heur.max_pagination);

    forms.truncate(heur.max_forms);

    let (node_count, anchor_count, text_len) = frames.iter().fold((0u64, 0u64, 0u64), |acc, f| {
        (
            acc.0 + f.stats.node_count,
            acc.1 + f.stats.anchor_count,
            acc.2 + f.stats.text_len,
        )
    });
    let hints = PageHints {
        text_density: if node_count > 0 {
            text_len as f64 / node_count as f64
        } else {
            0.0
        },
        link_density: if node_count > 0 {
            anchor_count as f64 / node_count as f64
        } else {
            0.0
        },
    };

    let mut snapshot = CompactSnapshot {
        url: frames.first().map(|f| f.url.clone()).unwrap_or_default(),
        title: frames.first().and_then(|f| f.title.clone()),
        headings,
        lists,
        controls,
        pagination,
        forms,
        hints,
        byte_size: 0,
        build_ms: 0,
    };

    let mut refs = RefMap::new();
    for list in &mut snapshot.lists {
        refs.register(&mut list.root);
    }
    for control in &mut snapshot.controls {
        refs.register(control);
    }
    for candidate in &mut snapshot.pagination {
        refs.register(&mut candidate.node);
    }
    for form in &mut snapshot.forms {
        refs.register(&mut form.form);
        for field in &mut form.fields {
            refs.register(&mut field.input);
        }
        if let Some(submit) = &mut form.submit {
            refs.register(submit);
        }
    }

    snapshot.byte_size = serde_json::to_vec(&snapshot).map_or(0, |b| b.len());
    (snapshot, refs)
}

/// Capture every reachable frame and assemble the compact snapshot.
///
/// The snapshot/ref-map pair is valid until the next navigation; selectors
/// and ref ids are not stable across document reloads.
pub async fn build_snapshot(page: &Page, heur: &Heuristics) -> Result<(CompactSnapshot, RefMap)> {
    let started = Instant::now();
    let frames = super::frames::capture_all(page, heur.max_capture_nodes).await?;
    let (mut snapshot, refs) = assemble(&frames, heur);
    snapshot.build_ms = started.elapsed().as_millis() as u64;
    log::debug!(
        "snapshot for {}: {} headings, {} lists, {} controls, {} pagination, {} forms, {} refs, {} bytes in {}ms",
        snapshot.url,
        snapshot.headings.len(),
        snapshot.lists.len(),
        snapshot.controls.len(),
        snapshot.pagination.len(),
        snapshot.forms.len(),
        refs.len(),
        snapshot.byte_size,
        snapshot.build_ms
    );
    Ok((snapshot, refs))
}
