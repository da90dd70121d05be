//! Analyzer weights and size caps
//!
//! Every heuristic constant used by the distillation analyzers and the
//! extraction pipeline lives here as a named, overridable field. Analyzers
//! receive a `&Heuristics` instead of inlining literals, so a caller can
//! tighten or loosen the whole pipeline from one place.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heuristics {
    // -- snapshot size caps --
    /// Final heading budget in a `CompactSnapshot`.
    pub max_headings: usize,
    /// Internal per-frame heading collection cap before cross-frame dedup.
    pub heading_collect_cap: usize,
    /// Maximum retained list blocks.
    pub max_lists: usize,
    /// Maximum retained clickable controls.
    pub max_controls: usize,
    /// Maximum retained pagination candidates.
    pub max_pagination: usize,
    /// Maximum mapped forms.
    pub max_forms: usize,
    /// Maximum mapped fields per form.
    pub max_form_fields: usize,

    // -- capture bounds --
    /// Element cap for the per-frame DOM capture.
    pub max_capture_nodes: usize,
    /// Over-collection multiplier: analyzers stop scanning once they hold
    /// this many times their final limit, bounding work on huge pages.
    pub overscan_factor: usize,

    // -- headings --
    /// Character budget applied to each heading before dedup.
    pub heading_char_budget: usize,
    /// Surrogate headings need computed font size at or above this.
    pub heading_font_size_min: f64,
    /// ... or computed font weight at or above this.
    pub heading_font_weight_min: u32,
    /// Minimum text length for a surrogate heading.
    pub heading_min_text_len: usize,
    /// Minimum rendered area for a surrogate heading, px².
    pub heading_min_area: f64,

    // -- clickables --
    /// Visibility floor for control candidates, px².
    pub control_min_area: f64,

    // -- list blocks --
    /// Minimum members in a sibling-signature group to call it a list.
    pub repeat_threshold: usize,
    /// Minimum first-member area, px²; excludes decorative repeats.
    pub list_min_item_area: f64,
    /// Illustrative sample texts captured per block.
    pub list_samples: usize,
    /// Character budget per sample text.
    pub sample_char_budget: usize,
    /// Grandchild tags considered in the structural signature.
    pub signature_depth: usize,

    // -- pagination scoring --
    pub pagination_rel_next_weight: f64,
    pub pagination_text_weight: f64,
    pub pagination_param_weight: f64,
    pub pagination_position_weight: f64,
    /// Fraction of the viewport height below which the position bonus applies.
    pub pagination_lower_frac: f64,

    // -- image scoring --
    pub image_base_score: f64,
    /// Bonus when the candidate's nearest anchor matches the item href.
    pub image_href_match_bonus: f64,
    pub image_decorative_penalty: f64,
    pub image_hidden_penalty: f64,
    /// Rendered area under this is penalized as likely chrome, px².
    pub image_min_area: f64,
    pub image_small_penalty: f64,
    /// Aspect ratios above this (or below its reciprocal bound) are penalized.
    pub image_aspect_max: f64,
    pub image_aspect_min: f64,
    pub image_aspect_penalty: f64,
    /// Cap on the large-area bonus contribution.
    pub image_area_bonus_cap: f64,
    /// Fixed score for the page-level Open Graph / Twitter meta fallback.
    pub image_meta_fallback_score: f64,
    /// An image URL recurring this often within one batch is treated as
    /// shared chrome and nulled for all occurrences.
    pub image_repeat_threshold: usize,

    // -- anchor fallback tier --
    pub anchor_href_weight: f64,
    pub anchor_short_text_weight: f64,
    /// Cap on the rendered-area contribution per anchor.
    pub anchor_area_bonus_cap: f64,
    /// Maximum records produced by the anchor fallback tier.
    pub anchor_fallback_limit: usize,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self {
            max_headings: 6,
            heading_collect_cap: 10,
            max_lists: 2,
            max_controls: 12,
            max_pagination: 2,
            max_forms: 3,
            max_form_fields: 12,

            max_capture_nodes: 4_000,
            overscan_factor: 2,

            heading_char_budget: 80,
            heading_font_size_min: 20.0,
            heading_font_weight_min: 600,
            heading_min_text_len: 12,
            heading_min_area: 500.0,

            control_min_area: 20.0,

            repeat_threshold: 8,
            list_min_item_area: 2_500.0,
            list_samples: 3,
            sample_char_budget: 80,
            signature_depth: 6,

            pagination_rel_next_weight: 3.0,
            pagination_text_weight: 2.0,
            pagination_param_weight: 2.0,
            pagination_position_weight: 1.0,
            pagination_lower_frac: 0.6,

            image_base_score: 1.0,
            image_href_match_bonus: 1.6,
            image_decorative_penalty: 2.0,
            image_hidden_penalty: 2.5,
            image_min_area: 1_500.0,
            image_small_penalty: 1.2,
            image_aspect_max: 3.5,
            image_aspect_min: 0.3,
            image_aspect_penalty: 0.8,
            image_area_bonus_cap: 1.5,
            image_meta_fallback_score: 0.3,
            image_repeat_threshold: 5,

            anchor_href_weight: 2.0,
            anchor_short_text_weight: 2.5,
            anchor_area_bonus_cap: 1.0,
            anchor_fallback_limit: 100,
        }
    }
}
