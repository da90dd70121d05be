//! URL canonicalization and record deduplication
//!
//! The canonical form of a URL is the dedup key for the whole run: fragment
//! stripped, tracking parameters removed, empty query dropped, scheme and
//! host lowercased. Records without an href fall back to exact
//! `(title, snippet)` equality.

use std::collections::HashSet;

use url::Url;

/// Tracking query parameters removed during canonicalization.
/// Any `utm_*` parameter is removed regardless of this list.
const TRACKING_PARAMS: &[&str] = &[
    "gclid", "fbclid", "mc_eid", "igshid", "yclid", "msclkid", "ref_src", "spm", "s_kwcid",
];

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}

/// Canonicalize a URL, returning `None` for unparseable or non-http input.
///
/// Idempotent: `canonicalize(canonicalize(u)) == canonicalize(u)`.
#[must_use]
pub fn canonicalize_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        drop(pairs);
    }
    Some(url.to_string())
}

/// Whether two URLs live on the same site (exact host match after parsing).
#[must_use]
pub fn same_site(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a.host_str().is_some() && a.host_str() == b.host_str(),
        _ => false,
    }
}

/// Identity of a record for dedup purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Href(String),
    TitleSnippet(String, String),
}

/// Compute the dedup key: canonical href when present, else exact
/// `(title, snippet)`. Records with neither are not deduplicatable.
#[must_use]
pub fn dedup_key(href: Option<&str>, title: &str, snippet: &str) -> Option<DedupKey> {
    if let Some(href) = href
        && let Some(canonical) = canonicalize_url(href)
    {
        return Some(DedupKey::Href(canonical));
    }
    if title.is_empty() && snippet.is_empty() {
        None
    } else {
        Some(DedupKey::TitleSnippet(title.to_string(), snippet.to_string()))
    }
}

/// Drop items whose key is already in `seen`, updating `seen` with the
/// survivors. Covers both intra-batch duplicates and (when `seen` is the
/// run-wide set) records from earlier pages. Keyless items pass through.
#[must_use]
pub fn filter_new<T, F>(items: Vec<T>, seen: &mut HashSet<DedupKey>, key_of: F) -> Vec<T>
where
    F: Fn(&T) -> Option<DedupKey>,
{
    items
        .into_iter()
        .filter(|item| match key_of(item) {
            Some(key) => seen.insert(key),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_strips_fragment_tracking_and_case() {
        assert_eq!(
            canonicalize_url("https://x.com/a?utm_source=y#frag"),
            canonicalize_url("https://X.com/a")
        );
        assert_eq!(
            canonicalize_url("https://x.com/a?utm_source=y#frag").as_deref(),
            Some("https://x.com/a")
        );
    }

    #[test]
    fn canonicalization_is_idempotent() {
        for raw in [
            "https://Example.com/path?b=2&utm_campaign=x&a=1#top",
            "http://a.b.c/?gclid=123",
            "https://e.com/p?keep=yes",
            "https://e.com/p%20q?x=%2F",
        ] {
            let once = canonicalize_url(raw).unwrap();
            let twice = canonicalize_url(&once).unwrap();
            assert_eq!(once, twice, "not idempotent for {raw}");
        }
    }

    #[test]
    fn non_tracking_params_survive() {
        assert_eq!(
            canonicalize_url("https://e.com/p?page=2&fbclid=abc").as_deref(),
            Some("https://e.com/p?page=2")
        );
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        assert_eq!(canonicalize_url("javascript:void(0)"), None);
        assert_eq!(canonicalize_url("mailto:x@y.com"), None);
        assert_eq!(canonicalize_url("not a url"), None);
    }

    #[test]
    fn href_key_wins_over_title_snippet() {
        let key = dedup_key(Some("https://E.com/a#x"), "Title", "Snippet");
        assert_eq!(key, Some(DedupKey::Href("https://e.com/a".to_string())));
        let key = dedup_key(None, "Title", "Snippet");
        assert_eq!(
            key,
            Some(DedupKey::TitleSnippet("Title".into(), "Snippet".into()))
        );
        assert_eq!(dedup_key(None, "", ""), None);
    }

    #[test]
    fn filter_new_drops_cross_batch_duplicates() {
        let mut seen = HashSet::new();
        let batch1 = vec!["https://e.com/a", "https://e.com/b"];
        let kept = filter_new(batch1, &mut seen, |h| dedup_key(Some(h), "", ""));
        assert_eq!(kept.len(), 2);
        // same href again, different surface form
        let batch2 = vec!["https://E.com/a?utm_source=x", "https://e.com/c"];
        let kept = filter_new(batch2, &mut seen, |h| dedup_key(Some(h), "", ""));
        assert_eq!(kept, vec!["https://e.com/c"]);
    }

    #[test]
    fn same_site_compares_hosts() {
        assert!(same_site("https://e.com/a", "https://e.com/b?x=1"));
        assert!(!same_site("https://e.com/a", "https://other.com/a"));
        assert!(!same_site("nonsense", "https://e.com"));
    }
}
