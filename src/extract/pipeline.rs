//! Three-tier item extraction
//!
//! Tiers are tried in order and the first non-empty result wins:
//! schema-driven selectors, the snapshot's first list block, then the
//! generic anchor heuristic. A tier that errors is logged and falls through
//! rather than failing the cycle. Every tier funnels through the same
//! enrichment, image selection and local dedup, and respects the remaining
//! capacity of the run.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use chromiumoxide::Page;
use serde_json::{Map, Value, json};

use crate::errors::ScrapeError;
use crate::extract::canonical::{canonicalize_url, filter_new};
use crate::extract::image::pick_best_image;
use crate::extract::js_scripts::{ANCHORS_SCRIPT, schema_items_script, summary_items_script};
use crate::extract::types::{
    AnchorFacts, ContentSignals, ExtractionTier, ItemAction, ItemFacts, ItemsPayload, Provenance,
    RawItem,
};
use crate::schema::TargetSchema;
use crate::snapshot::{CompactSnapshot, Heuristics, widen_selector};
use crate::utils::clip_chars;

/// Index of the anchor an item's href is derived from: anchors with text
/// beat textless ones, larger rendered area beats smaller, document order
/// breaks ties.
#[must_use]
pub fn best_anchor(anchors: &[AnchorFacts]) -> Option<usize> {
    anchors
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| {
            let rank = |x: &AnchorFacts| (usize::from(!x.text.is_empty()), x.area);
            let (ta, aa) = rank(a);
            let (tb, ab) = rank(b);
            ta.cmp(&tb)
                .then(aa.partial_cmp(&ab).unwrap_or(std::cmp::Ordering::Equal))
                // prefer the earlier anchor on full ties
                .then(ib.cmp(ia))
        })
        .map(|(i, _)| i)
}

fn derive_title(facts: &ItemFacts, best: Option<&AnchorFacts>) -> Option<String> {
    if let Some(Some(title)) = facts.fields.get("title") {
        let title = clip_chars(title, 120);
        if !title.is_empty() {
            return Some(title);
        }
    }
    if let Some(anchor) = best
        && !anchor.text.is_empty()
    {
        return Some(clip_chars(&anchor.text, 120));
    }
    let head = clip_chars(&facts.text, 120);
    (!head.is_empty()).then_some(head)
}

/// Enrich raw container facts into a candidate record.
#[must_use]
pub fn enrich(
    facts: ItemFacts,
    tier: ExtractionTier,
    base_selector: &str,
    index: usize,
    page_url: &str,
    meta_image: Option<&str>,
    heur: &Heuristics,
) -> RawItem {
    let best_idx = best_anchor(&facts.anchors);
    let best = best_idx.map(|i| &facts.anchors[i]);
    let href = best.and_then(|a| a.href.clone());
    let title = derive_title(&facts, best);

    // up to 3 actions: the best anchor first, then the next distinct hrefs
    let mut actions: Vec<ItemAction> = Vec::new();
    let mut seen_hrefs = HashSet::new();
    let ordered = best_idx
        .into_iter()
        .chain((0..facts.anchors.len()).filter(|i| Some(*i) != best_idx));
    for i in ordered {
        let anchor = &facts.anchors[i];
        let Some(href) = &anchor.href else { continue };
        if !seen_hrefs.insert(href.clone()) {
            continue;
        }
        actions.push(ItemAction {
            label: clip_chars(&anchor.text, 80),
            href: href.clone(),
        });
        if actions.len() == 3 {
            break;
        }
    }

    let image = pick_best_image(&facts.images, href.as_deref(), page_url, meta_image, heur)
        .map(|c| c.url);

    let mut tags: Vec<String> = Vec::new();
    for tag in &facts.tag_texts {
        let tag = clip_chars(tag, 24);
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    let fields: Map<String, Value> = facts
        .fields
        .iter()
        .map(|(k, v)| (k.clone(), v.as_ref().map_or(Value::Null, |s| json!(s))))
        .collect();

    let link_density = if facts.char_count > 0 {
        facts.link_char_count as f64 / facts.char_count as f64
    } else {
        0.0
    };

    RawItem {
        title,
        href,
        image,
        snippet: clip_chars(&facts.text, 200),
        tags,
        actions,
        fields,
        provenance: Provenance {
            tier,
            selector: base_selector.to_string(),
            index,
        },
        attrs: facts.attrs,
        bbox: facts.bbox,
        signals: ContentSignals {
            char_count: facts.char_count,
            link_count: facts.link_count,
            link_density,
        },
    }
}

/// Null out image URLs recurring at or above the repeat threshold within one
/// batch. Shared chrome (a site logo repeated on every card) is noise, not a
/// representative image.
pub fn null_repeated_images(items: &mut [RawItem], threshold: usize) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for item in items.iter() {
        if let Some(image) = &item.image {
            *counts.entry(image.clone()).or_default() += 1;
        }
    }
    for item in items.iter_mut() {
        if let Some(image) = &item.image
            && counts.get(image).copied().unwrap_or(0) >= threshold
        {
            item.image = None;
        }
    }
}

/// Score one page anchor for the fallback tier.
#[must_use]
pub fn score_fallback_anchor(anchor: &AnchorFacts, heur: &Heuristics) -> f64 {
    let mut score = heur.anchor_href_weight;
    let words = anchor.text.split_whitespace().count();
    if (1..=12).contains(&words) {
        score += heur.anchor_short_text_weight;
    }
    score + (anchor.area / 50_000.0).min(heur.anchor_area_bonus_cap)
}

/// Tier 3: turn scored page anchors into minimal records.
#[must_use]
pub fn anchors_to_items(
    anchors: Vec<AnchorFacts>,
    heur: &Heuristics,
) -> Vec<RawItem> {
    let mut scored: Vec<(f64, usize, AnchorFacts)> = anchors
        .into_iter()
        .filter(|a| a.href.as_deref().and_then(canonicalize_url).is_some())
        .enumerate()
        .map(|(i, a)| (score_fallback_anchor(&a, heur), i, a))
        .collect();
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });
    scored
        .into_iter()
        .take(heur.anchor_fallback_limit)
        .enumerate()
        .map(|(index, (_, _, anchor))| {
            let title = (!anchor.text.is_empty()).then(|| clip_chars(&anchor.text, 120));
            RawItem {
                title,
                href: anchor.href.clone(),
                image: None,
                snippet: String::new(),
                tags: Vec::new(),
                actions: Vec::new(),
                fields: Map::new(),
                provenance: Provenance {
                    tier: ExtractionTier::AnchorFallback,
                    selector: "a[href]".to_string(),
                    index,
                },
                attrs: Vec::new(),
                bbox: None,
                signals: ContentSignals {
                    char_count: anchor.text.len() as u64,
                    link_count: 1,
                    link_density: 1.0,
                },
            }
        })
        .collect()
}

fn finish_batch(
    payload: ItemsPayload,
    tier: ExtractionTier,
    base_selector: &str,
    page_url: &str,
    capacity: usize,
    heur: &Heuristics,
) -> Vec<RawItem> {
    let meta_image = payload.meta_image.clone();
    let mut items: Vec<RawItem> = payload
        .items
        .into_iter()
        .enumerate()
        .map(|(index, facts)| {
            enrich(
                facts,
                tier,
                base_selector,
                index,
                page_url,
                meta_image.as_deref(),
                heur,
            )
        })
        .collect();
    null_repeated_images(&mut items, heur.image_repeat_threshold);
    // local per-page dedup by canonical href, else (title, snippet)
    let mut seen = HashSet::new();
    let mut items = filter_new(items, &mut seen, RawItem::key);
    items.truncate(capacity);
    items
}

async fn run_items_script(page: &Page, script: String) -> Result<ItemsPayload> {
    let result = page
        .evaluate(script.as_str())
        .await
        .context("item collection script failed")?;
    result
        .into_value()
        .map_err(|e| anyhow::anyhow!("failed to parse item collection payload: {e}"))
}

/// Run the extraction tiers against the current page.
///
/// `capacity` is `max_items` minus the records already extracted this run;
/// zero skips extraction entirely for this step.
pub async fn extract_items(
    page: &Page,
    schema: &TargetSchema,
    snapshot: &CompactSnapshot,
    heur: &Heuristics,
    capacity: usize,
) -> Result<Vec<RawItem>> {
    if capacity == 0 {
        log::debug!("extraction skipped: no remaining capacity");
        return Ok(Vec::new());
    }
    let page_url = snapshot.url.as_str();
    let collect_limit = capacity.saturating_mul(heur.overscan_factor);

    // tier 1: explicit schema selectors
    if let Some(selectors) = &schema.selectors {
        let script = schema_items_script(&selectors.item, &selectors.fields, collect_limit);
        match run_items_script(page, script).await {
            Ok(payload) if !payload.items.is_empty() => {
                log::debug!(
                    "schema tier extracted {} candidates from {page_url}",
                    payload.items.len()
                );
                return Ok(finish_batch(
                    payload,
                    ExtractionTier::Schema,
                    &selectors.item,
                    page_url,
                    capacity,
                    heur,
                ));
            }
            Ok(_) => log::debug!("schema tier matched nothing on {page_url}"),
            Err(e) => log::warn!("schema tier failed on {page_url}, falling through: {e}"),
        }
    }

    // tier 2: first list block from the snapshot
    if let Some(block) = snapshot.lists.first() {
        let root = block.root.selector.as_str();
        let script = summary_items_script(
            root,
            &widen_selector(root),
            block.item_tag.as_deref(),
            collect_limit,
        );
        match run_items_script(page, script).await {
            Ok(payload) if !payload.items.is_empty() => {
                log::debug!(
                    "summary tier extracted {} candidates from {page_url}",
                    payload.items.len()
                );
                return Ok(finish_batch(
                    payload,
                    ExtractionTier::Summary,
                    root,
                    page_url,
                    capacity,
                    heur,
                ));
            }
            Ok(_) => log::debug!("summary tier matched nothing on {page_url}"),
            Err(e) => log::warn!("summary tier failed on {page_url}, falling through: {e}"),
        }
    }

    // tier 3: generic anchor heuristic
    let result = page
        .evaluate(ANCHORS_SCRIPT)
        .await
        .map_err(|e| ScrapeError::Extraction(format!("anchor fallback script failed: {e}")))?;
    let anchors: Vec<AnchorFacts> = result
        .into_value()
        .map_err(|e| ScrapeError::Extraction(format!("bad anchor payload: {e}")))?;
    log::debug!(
        "anchor fallback collected {} anchors from {page_url}",
        anchors.len()
    );
    let mut items = anchors_to_items(anchors, heur);
    items.truncate(capacity);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::types::ImageFacts;

    fn anchor(href: &str, text: &str, area: f64) -> AnchorFacts {
        AnchorFacts {
            href: Some(href.to_string()),
            text: text.to_string(),
            area,
        }
    }

    #[test]
    fn best_anchor_prefers_text_then_area_then_order() {
        let anchors = vec![
            anchor("https://e.com/a", "", 10_000.0),
            anchor("https://e.com/b", "Read", 500.0),
            anchor("https://e.com/c", "More", 500.0),
        ];
        assert_eq!(best_anchor(&anchors), Some(1));
    }

    #[test]
    fn enrich_derives_title_href_actions_and_signals() {
        let facts = ItemFacts {
            text: "Widget Deluxe A very nice widget for all purposes".to_string(),
            char_count: 49,
            link_count: 2,
            link_char_count: 10,
            anchors: vec![
                anchor("https://e.com/item/1", "Widget Deluxe", 4_000.0),
                anchor("https://e.com/item/1#reviews", "Reviews", 300.0),
            ],
            images: vec![ImageFacts {
                url: Some("https://cdn.e.com/widget.jpg".to_string()),
                source: "img-src".to_string(),
                rendered_w: 300.0,
                rendered_h: 200.0,
                ..ImageFacts::default()
            }],
            tag_texts: vec!["Sale".to_string(), "Sale".to_string()],
            ..ItemFacts::default()
        };
        let item = enrich(
            facts,
            ExtractionTier::Summary,
            "#feed",
            0,
            "https://e.com/list",
            None,
            &Heuristics::default(),
        );
        assert_eq!(item.title.as_deref(), Some("Widget Deluxe"));
        assert_eq!(item.href.as_deref(), Some("https://e.com/item/1"));
        assert_eq!(item.image.as_deref(), Some("https://cdn.e.com/widget.jpg"));
        assert_eq!(item.tags, vec!["Sale"]);
        assert_eq!(item.actions.len(), 2);
        assert!((item.signals.link_density - 10.0 / 49.0).abs() < 1e-9);
    }

    #[test]
    fn schema_title_field_wins_over_anchor_text() {
        let mut facts = ItemFacts {
            anchors: vec![anchor("https://e.com/x", "click here", 100.0)],
            ..ItemFacts::default()
        };
        facts
            .fields
            .insert("title".to_string(), Some("Proper Title".to_string()));
        let item = enrich(
            facts,
            ExtractionTier::Schema,
            ".card",
            0,
            "https://e.com/",
            None,
            &Heuristics::default(),
        );
        assert_eq!(item.title.as_deref(), Some("Proper Title"));
    }

    #[test]
    fn repeated_batch_images_are_nulled() {
        let heur = Heuristics::default();
        let base = ItemFacts::default();
        let mut items: Vec<RawItem> = (0..6)
            .map(|i| {
                let mut item = enrich(
                    base.clone(),
                    ExtractionTier::Summary,
                    "#feed",
                    i,
                    "https://e.com/",
                    None,
                    &heur,
                );
                item.image = Some(if i < 5 {
                    "https://e.com/logo.png".to_string()
                } else {
                    "https://e.com/unique.jpg".to_string()
                });
                item
            })
            .collect();
        null_repeated_images(&mut items, heur.image_repeat_threshold);
        assert!(items[..5].iter().all(|i| i.image.is_none()));
        assert_eq!(items[5].image.as_deref(), Some("https://e.com/unique.jpg"));
    }

    #[test]
    fn fallback_scoring_rewards_short_text_and_area() {
        let heur = Heuristics::default();
        let short = anchor("https://e.com/a", "Nice article title", 10_000.0);
        let empty = anchor("https://e.com/b", "", 10_000.0);
        let long = anchor(
            "https://e.com/c",
            "a very long anchor made of far too many words to look like a navigation item at all honestly",
            10_000.0,
        );
        assert!(score_fallback_anchor(&short, &heur) > score_fallback_anchor(&empty, &heur));
        assert!(score_fallback_anchor(&short, &heur) > score_fallback_anchor(&long, &heur));
    }

    #[test]
    fn fallback_keeps_top_scored_and_drops_non_http() {
        let mut heur = Heuristics::default();
        heur.anchor_fallback_limit = 2;
        let anchors = vec![
            anchor("mailto:x@e.com", "Mail", 100.0),
            anchor("https://e.com/big", "Big link", 90_000.0),
            anchor("https://e.com/small", "Small link", 100.0),
            anchor("https://e.com/tiny", "", 10.0),
        ];
        let items = anchors_to_items(anchors, &heur);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].href.as_deref(), Some("https://e.com/big"));
        assert_eq!(items[1].href.as_deref(), Some("https://e.com/small"));
        assert_eq!(items[0].provenance.tier, ExtractionTier::AnchorFallback);
    }
}
