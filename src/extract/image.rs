//! Representative image selection
//!
//! Scores every plausible image source gathered for an item container and
//! picks the best survivor. Candidates arrive as raw facts from the
//! collection script; all scoring and ranking happens here so the heuristics
//! are testable against fixture data.

use std::collections::HashMap;

use url::Url;

use crate::extract::canonical::canonicalize_url;
use crate::extract::types::ImageFacts;
use crate::snapshot::Heuristics;

/// A scored image source, keyed by absolute URL.
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    pub url: String,
    pub selector: String,
    pub score: f64,
    pub why: Vec<String>,
}

/// Keywords marking a source as decorative chrome rather than content.
/// Short tokens ("ad") match whole path/class tokens only; longer ones match
/// as substrings.
const DECORATIVE_EXACT: &[&str] = &["ad", "ads", "pixel", "1x1"];
const DECORATIVE_SUBSTRING: &[&str] = &[
    "logo",
    "icon",
    "avatar",
    "sprite",
    "banner",
    "advert",
    "placeholder",
    "spinner",
    "tracking",
    "badge",
    "emoji",
];

fn decorative_match(haystacks: &[&str]) -> bool {
    for hay in haystacks {
        let lower = hay.to_ascii_lowercase();
        if DECORATIVE_SUBSTRING.iter().any(|kw| lower.contains(kw)) {
            return true;
        }
        if lower
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| DECORATIVE_EXACT.contains(&token))
        {
            return true;
        }
    }
    false
}

/// SVGs and data URLs are excluded outright.
fn excluded_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("data:")
        || lower.ends_with(".svg")
        || lower.contains(".svg?")
        || lower.contains("image/svg")
}

/// Pick the widest candidate from a raw `srcset` string.
///
/// Width descriptors (`640w`) win over density descriptors (`2x`); absent
/// both, the last entry is used.
#[must_use]
pub fn widest_srcset_candidate(srcset: &str) -> Option<String> {
    let mut best: Option<(f64, String)> = None;
    let mut fallback = None;
    for entry in srcset.split(',') {
        let mut parts = entry.split_whitespace();
        let Some(url) = parts.next() else { continue };
        if url.is_empty() {
            continue;
        }
        let width = parts.next().and_then(|d| {
            d.strip_suffix('w')
                .or_else(|| d.strip_suffix('x'))
                .and_then(|n| n.parse::<f64>().ok())
        });
        fallback = Some(url.to_string());
        if let Some(w) = width
            && best.as_ref().is_none_or(|(bw, _)| w > *bw)
        {
            best = Some((w, url.to_string()));
        }
    }
    best.map(|(_, u)| u).or(fallback)
}

/// Resolve the candidate's URL: srcset-widest when present, else direct.
fn candidate_url(facts: &ImageFacts, page_url: &str) -> Option<String> {
    let raw = match &facts.srcset {
        Some(srcset) => widest_srcset_candidate(srcset)?,
        None => facts.url.clone()?,
    };
    let absolute = match Url::parse(&raw) {
        Ok(u) => u.to_string(),
        Err(_) => Url::parse(page_url).ok()?.join(&raw).ok()?.to_string(),
    };
    (!excluded_url(&absolute)).then_some(absolute)
}

/// Score one candidate against the item's associated href.
#[must_use]
pub fn score_candidate(
    facts: &ImageFacts,
    url: &str,
    associated_href: Option<&str>,
    heur: &Heuristics,
) -> (f64, Vec<String>) {
    let mut score = heur.image_base_score;
    let mut why = vec![format!("source:{}", facts.source)];

    // anchor-href agreement, compared canonically (fragment ignored)
    if let (Some(anchor), Some(item)) = (facts.anchor_href.as_deref(), associated_href)
        && let (Some(a), Some(b)) = (canonicalize_url(anchor), canonicalize_url(item))
        && a == b
    {
        score += heur.image_href_match_bonus;
        why.push("anchor-matches-item".to_string());
    }

    if decorative_match(&[&facts.class, &facts.id, &facts.role, &facts.alt, url]) {
        score -= heur.image_decorative_penalty;
        why.push("decorative-keyword".to_string());
    }

    let rendered_area = facts.rendered_w * facts.rendered_h;
    let natural_area = facts.natural_w * facts.natural_h;
    if facts.hidden {
        score -= heur.image_hidden_penalty;
        why.push("hidden".to_string());
    } else if rendered_area > 0.0 && rendered_area < heur.image_min_area {
        score -= heur.image_small_penalty;
        why.push("small".to_string());
    }

    let (w, h) = if rendered_area > 0.0 {
        (facts.rendered_w, facts.rendered_h)
    } else {
        (facts.natural_w, facts.natural_h)
    };
    if w > 0.0 && h > 0.0 {
        let aspect = w / h;
        if aspect > heur.image_aspect_max || aspect < heur.image_aspect_min {
            score -= heur.image_aspect_penalty;
            why.push("extreme-aspect".to_string());
        }
    }

    let area = rendered_area.max(natural_area);
    if area > 0.0 {
        let bonus = (area / 250_000.0).min(heur.image_area_bonus_cap);
        score += bonus;
        if bonus > 0.5 {
            why.push("large-area".to_string());
        }
    }

    (score, why)
}

/// Choose the best image for an item container.
///
/// Candidates are deduplicated by absolute URL keeping the maximum score
/// seen; the highest-scoring survivor wins, earlier sources breaking ties.
/// When nothing survives and a page-level meta image is available, it is
/// used at a low fixed score.
#[must_use]
pub fn pick_best_image(
    images: &[ImageFacts],
    associated_href: Option<&str>,
    page_url: &str,
    meta_image: Option<&str>,
    heur: &Heuristics,
) -> Option<ImageCandidate> {
    let mut by_url: HashMap<String, ImageCandidate> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for facts in images {
        let Some(url) = candidate_url(facts, page_url) else {
            continue;
        };
        let (score, why) = score_candidate(facts, &url, associated_href, heur);
        match by_url.get_mut(&url) {
            Some(existing) => {
                if score > existing.score {
                    existing.score = score;
                    existing.why = why;
                    existing.selector = facts.selector.clone();
                }
            }
            None => {
                order.push(url.clone());
                by_url.insert(
                    url.clone(),
                    ImageCandidate {
                        url,
                        selector: facts.selector.clone(),
                        score,
                        why,
                    },
                );
            }
        }
    }

    let mut best: Option<&ImageCandidate> = None;
    for url in &order {
        if let Some(candidate) = by_url.get(url)
            && best.is_none_or(|b| candidate.score > b.score)
        {
            best = Some(candidate);
        }
    }
    if let Some(best) = best {
        return Some(best.clone());
    }

    let meta = meta_image?;
    let absolute = match Url::parse(meta) {
        Ok(u) => u.to_string(),
        Err(_) => Url::parse(page_url).ok()?.join(meta).ok()?.to_string(),
    };
    (!excluded_url(&absolute)).then(|| ImageCandidate {
        url: absolute,
        selector: "meta[property=\"og:image\"]".to_string(),
        score: heur.image_meta_fallback_score,
        why: vec!["page-meta-fallback".to_string()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heur() -> Heuristics {
        Heuristics::default()
    }

    fn facts(url: &str) -> ImageFacts {
        ImageFacts {
            url: Some(url.to_string()),
            source: "img-src".to_string(),
            selector: "img".to_string(),
            rendered_w: 300.0,
            rendered_h: 200.0,
            natural_w: 600.0,
            natural_h: 400.0,
            ..ImageFacts::default()
        }
    }

    #[test]
    fn anchor_href_match_scores_strictly_higher() {
        let page = "https://e.com/list";
        let item_href = "https://e.com/item/1";
        let mut matching = facts("https://cdn.e.com/a.jpg");
        matching.anchor_href = Some("https://E.com/item/1#photo".to_string());
        let mut other = facts("https://cdn.e.com/b.jpg");
        other.anchor_href = Some("https://e.com/item/2".to_string());

        let (s1, why1) = score_candidate(
            &matching,
            "https://cdn.e.com/a.jpg",
            Some(item_href),
            &heur(),
        );
        let (s2, _) = score_candidate(&other, "https://cdn.e.com/b.jpg", Some(item_href), &heur());
        assert!(s1 > s2);
        assert!(why1.iter().any(|w| w == "anchor-matches-item"));

        let best = pick_best_image(&[other, matching], Some(item_href), page, None, &heur());
        assert_eq!(best.unwrap().url, "https://cdn.e.com/a.jpg");
    }

    #[test]
    fn decorative_sources_are_penalized() {
        let mut logo = facts("https://e.com/assets/site-logo.png");
        logo.class = "header-logo".to_string();
        let photo = facts("https://e.com/assets/product.jpg");
        let (logo_score, _) =
            score_candidate(&logo, "https://e.com/assets/site-logo.png", None, &heur());
        let (photo_score, _) =
            score_candidate(&photo, "https://e.com/assets/product.jpg", None, &heur());
        assert!(photo_score > logo_score);
    }

    #[test]
    fn ad_token_matches_whole_tokens_only() {
        assert!(decorative_match(&["sidebar-ad"]));
        assert!(!decorative_match(&["gradient-header"]));
        assert!(!decorative_match(&["downloaded"]));
    }

    #[test]
    fn svg_and_data_urls_are_excluded() {
        let svg = facts("https://e.com/pic.svg");
        let data = facts("data:image/png;base64,AAAA");
        assert!(pick_best_image(&[svg, data], None, "https://e.com/", None, &heur()).is_none());
    }

    #[test]
    fn hidden_and_tiny_images_lose_to_normal_ones() {
        let mut hidden = facts("https://e.com/h.jpg");
        hidden.hidden = true;
        let mut tiny = facts("https://e.com/t.jpg");
        tiny.rendered_w = 16.0;
        tiny.rendered_h = 16.0;
        tiny.natural_w = 16.0;
        tiny.natural_h = 16.0;
        let normal = facts("https://e.com/n.jpg");
        let best = pick_best_image(
            &[hidden, tiny, normal],
            None,
            "https://e.com/",
            None,
            &heur(),
        )
        .unwrap();
        assert_eq!(best.url, "https://e.com/n.jpg");
    }

    #[test]
    fn extreme_aspect_ratio_is_penalized() {
        let mut wide = facts("https://e.com/stripe.jpg");
        wide.rendered_w = 1200.0;
        wide.rendered_h = 60.0;
        wide.natural_w = 0.0;
        wide.natural_h = 0.0;
        let (score, why) = score_candidate(&wide, "https://e.com/stripe.jpg", None, &heur());
        let (normal_score, _) = score_candidate(
            &facts("https://e.com/n.jpg"),
            "https://e.com/n.jpg",
            None,
            &heur(),
        );
        assert!(score < normal_score);
        assert!(why.iter().any(|w| w == "extreme-aspect"));
    }

    #[test]
    fn srcset_picks_widest_width_descriptor() {
        assert_eq!(
            widest_srcset_candidate("a.jpg 320w, b.jpg 1280w, c.jpg 640w").as_deref(),
            Some("b.jpg")
        );
        assert_eq!(
            widest_srcset_candidate("a.jpg 1x, b.jpg 2x").as_deref(),
            Some("b.jpg")
        );
        assert_eq!(widest_srcset_candidate("only.jpg").as_deref(), Some("only.jpg"));
        assert_eq!(widest_srcset_candidate(""), None);
    }

    #[test]
    fn duplicate_urls_keep_the_maximum_score() {
        let mut lazy = facts("https://e.com/same.jpg");
        lazy.hidden = true; // low-scoring occurrence
        lazy.source = "img-lazy".to_string();
        let direct = facts("https://e.com/same.jpg");
        let best = pick_best_image(
            &[lazy, direct],
            None,
            "https://e.com/",
            None,
            &heur(),
        )
        .unwrap();
        assert!(!best.why.contains(&"hidden".to_string()));
    }

    #[test]
    fn meta_image_is_the_last_resort() {
        let best = pick_best_image(
            &[],
            None,
            "https://e.com/page",
            Some("/og/cover.jpg"),
            &heur(),
        )
        .unwrap();
        assert_eq!(best.url, "https://e.com/og/cover.jpg");
        assert!((best.score - heur().image_meta_fallback_score).abs() < f64::EPSILON);
        let with_real = pick_best_image(
            &[facts("https://e.com/real.jpg")],
            None,
            "https://e.com/page",
            Some("/og/cover.jpg"),
            &heur(),
        )
        .unwrap();
        assert_eq!(with_real.url, "https://e.com/real.jpg");
    }

    #[test]
    fn relative_urls_are_absolutized_against_the_page() {
        let rel = ImageFacts {
            url: Some("images/photo.jpg".to_string()),
            source: "img-src".to_string(),
            rendered_w: 300.0,
            rendered_h: 200.0,
            ..ImageFacts::default()
        };
        let best = pick_best_image(&[rel], None, "https://e.com/section/page", None, &heur());
        assert_eq!(best.unwrap().url, "https://e.com/section/images/photo.jpg");
    }
}
