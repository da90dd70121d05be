//! Target schema configuration
//!
//! Describes what to scrape: the entry URL, run bounds, optional explicit
//! item/field selectors for the schema-driven tier, the link-following flag
//! and a declared pagination strategy. Loaded from JSON and validated before
//! any browser work starts; a malformed schema is fatal.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::errors::ScrapeError;
use crate::utils::{DEFAULT_MAX_ITEMS, DEFAULT_MAX_PAGES};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub url: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default)]
    pub follow_links: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selectors: Option<SelectorSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationSpec>,
}

/// Explicit selectors for the schema-driven extraction tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorSpec {
    /// Selector matching one element per record.
    pub item: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// One named field: selector plus how to read the matched element.
///
/// `attribute` is `None`/`"text"` for visible text, `"html"`, `"href"`,
/// `"src"`, or any other attribute name read verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

/// How a field is read from its element. Each variant maps to one accessor
/// in the collection script through a uniform `(kind, attr)` contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Html,
    Href,
    Src,
    Attr(String),
}

impl FieldSpec {
    #[must_use]
    pub fn kind(&self) -> FieldKind {
        match self.attribute.as_deref() {
            None | Some("text") => FieldKind::Text,
            Some("html") => FieldKind::Html,
            Some("href") => FieldKind::Href,
            Some("src") => FieldKind::Src,
            Some(other) => FieldKind::Attr(other.to_string()),
        }
    }

    /// Script-facing dispatch pair for this field.
    #[must_use]
    pub fn kind_and_attr(&self) -> (&'static str, Option<&str>) {
        match self.attribute.as_deref() {
            None | Some("text") => ("text", None),
            Some("html") => ("html", None),
            Some("href") => ("href", None),
            Some("src") => ("src", None),
            Some(other) => ("attr", Some(other)),
        }
    }
}

/// Declared pagination fallback, tried when the snapshot offers no
/// unvisited pagination candidate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaginationSpec {
    /// Selector of the next-page control; its href is followed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_selector: Option<String>,
    /// Query parameter advanced by one per page (e.g. `page`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_param: Option<String>,
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

impl TargetSchema {
    /// Minimal schema for a bare URL: summary/fallback tiers only.
    #[must_use]
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            name: None,
            url: url.into(),
            max_pages: DEFAULT_MAX_PAGES,
            max_items: DEFAULT_MAX_ITEMS,
            follow_links: false,
            selectors: None,
            pagination: None,
        }
    }

    /// Load and validate a schema file.
    pub fn from_file(path: &Path) -> Result<Self, ScrapeError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScrapeError::Validation(format!("cannot read {}: {e}", path.display())))?;
        let schema: Self = serde_json::from_str(&raw)
            .map_err(|e| ScrapeError::Validation(format!("cannot parse {}: {e}", path.display())))?;
        schema.validate()?;
        Ok(schema)
    }

    /// Check the schema before any run; violations are fatal.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        let url = Url::parse(&self.url)
            .map_err(|e| ScrapeError::Validation(format!("bad url {:?}: {e}", self.url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ScrapeError::Validation(format!(
                "unsupported scheme {:?}",
                url.scheme()
            )));
        }
        if self.max_pages == 0 {
            return Err(ScrapeError::Validation("max_pages must be at least 1".into()));
        }
        if self.max_items == 0 {
            return Err(ScrapeError::Validation("max_items must be at least 1".into()));
        }
        if let Some(selectors) = &self.selectors {
            if selectors.item.trim().is_empty() {
                return Err(ScrapeError::Validation("empty item selector".into()));
            }
            let mut names = std::collections::HashSet::new();
            for field in &selectors.fields {
                if field.name.trim().is_empty() {
                    return Err(ScrapeError::Validation("field with empty name".into()));
                }
                if field.selector.trim().is_empty() {
                    return Err(ScrapeError::Validation(format!(
                        "field {:?} has an empty selector",
                        field.name
                    )));
                }
                if !names.insert(field.name.as_str()) {
                    return Err(ScrapeError::Validation(format!(
                        "duplicate field name {:?}",
                        field.name
                    )));
                }
            }
        }
        if let Some(pagination) = &self.pagination {
            let has_selector = pagination
                .next_selector
                .as_deref()
                .is_some_and(|s| !s.trim().is_empty());
            let has_param = pagination
                .query_param
                .as_deref()
                .is_some_and(|p| !p.trim().is_empty());
            if !has_selector && !has_param {
                return Err(ScrapeError::Validation(
                    "pagination declared without next_selector or query_param".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Advance a pagination query parameter by one.
///
/// A missing or non-numeric value is treated as page 1, so the first advance
/// lands on page 2.
#[must_use]
pub fn next_page_url(current: &str, param: &str) -> Option<String> {
    let mut url = Url::parse(current).ok()?;
    let current_value = url
        .query_pairs()
        .find(|(k, _)| k == param)
        .and_then(|(_, v)| v.parse::<i64>().ok())
        .unwrap_or(1);
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(param, &(current_value + 1).to_string());
    }
    Some(url.to_string())
}
