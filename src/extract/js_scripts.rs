//! JavaScript collection scripts for the extraction tiers
//!
//! The scripts gather raw facts only (field values, anchors, image sources,
//! geometry, text counts); deriving titles, scoring images, canonicalizing
//! and deduplicating all happen Rust-side. Selector strings from schema or
//! snapshot are embedded as JSON literals, so arbitrary CSS is passed
//! through `querySelectorAll` untouched.

use crate::schema::FieldSpec;

/// Shared collection routines embedded in the tier-1 and tier-2 scripts.
const COLLECT_PRELUDE: &str = r#"
        const abs = (raw) => {
            try { return new URL(raw, document.baseURI).href; } catch (e) { return null; }
        };

        const readField = (el, kind, attr) => {
            switch (kind) {
                case 'html': return el.innerHTML;
                case 'href': return el.href || abs(el.getAttribute('href'));
                case 'src': return el.currentSrc || el.src || abs(el.getAttribute('src'));
                case 'attr': return el.getAttribute(attr);
                default: return (el.innerText || el.textContent || '').replace(/\s+/g, ' ').trim();
            }
        };

        const nearestAnchorHref = (el) => {
            const a = el.closest('a[href]');
            return a ? abs(a.getAttribute('href')) : null;
        };

        const imageMeta = (el) => {
            const style = getComputedStyle(el);
            const rect = el.getBoundingClientRect();
            return {
                rendered_w: rect.width, rendered_h: rect.height,
                hidden: style.display === 'none' || style.visibility === 'hidden'
                    || rect.width === 0 || rect.height === 0,
                class: (typeof el.className === 'string' ? el.className : '').slice(0, 120),
                id: el.id || '',
                role: el.getAttribute('role') || '',
                alt: el.getAttribute('alt') || '',
                anchor_href: nearestAnchorHref(el),
            };
        };

        const collectImages = (root) => {
            const out = [];
            let seen = 0;
            for (const img of root.querySelectorAll('img')) {
                if (++seen > 20) break;
                const m = imageMeta(img);
                m.natural_w = img.naturalWidth || 0;
                m.natural_h = img.naturalHeight || 0;
                const lazy = img.getAttribute('data-src')
                    || img.getAttribute('data-lazy-src')
                    || img.getAttribute('data-original')
                    || img.getAttribute('data-lazy')
                    || img.getAttribute('data-echo');
                if (img.currentSrc || img.src) {
                    out.push(Object.assign({ url: img.currentSrc || img.src, source: 'img-src', selector: 'img' }, m));
                }
                if (lazy) {
                    out.push(Object.assign({ url: lazy, source: 'img-lazy', selector: 'img' }, m));
                }
                if (img.getAttribute('srcset')) {
                    out.push(Object.assign({ srcset: img.getAttribute('srcset'), source: 'srcset', selector: 'img' }, m));
                }
            }
            for (const source of root.querySelectorAll('picture source')) {
                if (source.getAttribute('srcset')) {
                    out.push(Object.assign(
                        { srcset: source.getAttribute('srcset'), source: 'picture', selector: 'picture source' },
                        imageMeta(source.parentElement || source)
                    ));
                }
            }
            for (const ns of root.querySelectorAll('noscript')) {
                const match = /<img[^>]+src=["']([^"']+)["']/i.exec(ns.textContent || '');
                if (match) {
                    out.push(Object.assign({ url: match[1], source: 'noscript', selector: 'noscript' }, imageMeta(ns)));
                }
            }
            let scanned = 0;
            for (const el of root.querySelectorAll('*')) {
                if (++scanned > 120) break;
                const inline = el.style ? el.style.backgroundImage : '';
                const computed = getComputedStyle(el).backgroundImage;
                const bg = inline && inline !== 'none' ? inline
                    : (computed && computed !== 'none' ? computed : null);
                if (bg) {
                    const match = /url\(["']?([^"')]+)["']?\)/.exec(bg);
                    if (match) {
                        out.push(Object.assign(
                            { url: match[1], source: inline && inline !== 'none' ? 'bg-inline' : 'bg-computed',
                              selector: el.tagName.toLowerCase() },
                            imageMeta(el)
                        ));
                    }
                }
                for (const attr of el.attributes) {
                    if (attr.name.indexOf('data-bg') === 0 && attr.value) {
                        out.push(Object.assign(
                            { url: attr.value, source: 'data-bg', selector: el.tagName.toLowerCase() },
                            imageMeta(el)
                        ));
                    }
                }
            }
            return out;
        };

        const collect = (el, fieldSpecs) => {
            const rect = el.getBoundingClientRect();
            const text = (el.innerText || '').replace(/\s+/g, ' ').trim();
            const anchors = [];
            for (const a of el.querySelectorAll('a[href]')) {
                if (anchors.length >= 12) break;
                const href = abs(a.getAttribute('href'));
                if (!href) continue;
                const r = a.getBoundingClientRect();
                anchors.push({
                    href,
                    text: (a.innerText || '').replace(/\s+/g, ' ').trim().slice(0, 120),
                    area: r.width * r.height,
                });
            }
            const tagTexts = [];
            for (const t of el.querySelectorAll('[class*="tag"], [class*="badge"], [class*="chip"], [class*="category"]')) {
                if (tagTexts.length >= 8) break;
                const label = (t.innerText || '').replace(/\s+/g, ' ').trim();
                if (label && label.length <= 24) tagTexts.push(label);
            }
            const fields = {};
            for (const spec of fieldSpecs) {
                try {
                    const m = el.querySelector(spec.selector);
                    fields[spec.name] = m ? readField(m, spec.kind, spec.attr) : null;
                } catch (e) {
                    fields[spec.name] = null;
                }
            }
            return {
                fields,
                text: text.slice(0, 600),
                attrs: Array.from(el.attributes).slice(0, 16).map(a => [a.name, a.value.slice(0, 200)]),
                bbox: { x: rect.left, y: rect.top, w: rect.width, h: rect.height },
                anchors,
                images: collectImages(el),
                tag_texts: tagTexts,
                char_count: text.length,
                link_count: anchors.length,
                link_char_count: anchors.reduce((n, a) => n + a.text.length, 0),
            };
        };

        const metaImage = () => {
            const m = document.querySelector(
                'meta[property="og:image"], meta[name="og:image"], meta[name="twitter:image"], meta[property="twitter:image"]'
            );
            return m ? m.getAttribute('content') : null;
        };
"#;

const SCHEMA_TEMPLATE: &str = r#"
    (() => {
__PRELUDE__
        let roots = [];
        try { roots = Array.from(document.querySelectorAll(__ROOT_SELECTOR__)); } catch (e) {}
        const specs = __FIELD_SPECS__;
        return {
            items: roots.slice(0, __LIMIT__).map(el => collect(el, specs)),
            meta_image: metaImage(),
        };
    })()
"#;

const SUMMARY_TEMPLATE: &str = r#"
    (() => {
__PRELUDE__
        const itemTag = __ITEM_TAG__;
        const childrenOf = (selector) => {
            let root = null;
            try { root = document.querySelector(selector); } catch (e) {}
            if (!root) return [];
            let nodes = Array.from(root.children);
            if (itemTag) nodes = nodes.filter(el => el.tagName.toLowerCase() === itemTag);
            return nodes;
        };
        let nodes = childrenOf(__ROOT_SELECTOR__);
        if (nodes.length <= 1) {
            nodes = childrenOf(__WIDENED_SELECTOR__);
        }
        return {
            items: nodes.slice(0, __LIMIT__).map(el => collect(el, [])),
            meta_image: metaImage(),
        };
    })()
"#;

/// All page anchors with geometry, for the tier-3 fallback.
pub const ANCHORS_SCRIPT: &str = r#"
    (() => {
        const anchors = [];
        let seen = 0;
        for (const a of document.querySelectorAll('a[href]')) {
            if (++seen > 600) break;
            let href = null;
            try { href = new URL(a.getAttribute('href'), document.baseURI).href; } catch (e) {}
            if (!href) continue;
            const rect = a.getBoundingClientRect();
            anchors.push({
                href,
                text: (a.innerText || '').replace(/\s+/g, ' ').trim().slice(0, 160),
                area: rect.width * rect.height,
            });
        }
        return anchors;
    })()
"#;

/// Resolve the href of the first element matching a selector, if any.
pub fn href_of_selector_script(selector: &str) -> String {
    format!(
        r#"
    (() => {{
        let el = null;
        try {{ el = document.querySelector({selector}); }} catch (e) {{}}
        if (!el) return null;
        if (typeof el.href === 'string' && el.href) return el.href;
        const raw = el.getAttribute('href');
        if (!raw) return null;
        try {{ return new URL(raw, document.baseURI).href; }} catch (e) {{ return null; }}
    }})()
"#,
        selector = js_string(selector)
    )
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Build the tier-1 (schema-driven) collection script.
#[must_use]
pub fn schema_items_script(item_selector: &str, fields: &[FieldSpec], limit: usize) -> String {
    let specs: Vec<serde_json::Value> = fields
        .iter()
        .map(|f| {
            let (kind, attr) = f.kind_and_attr();
            serde_json::json!({
                "name": f.name,
                "selector": f.selector,
                "kind": kind,
                "attr": attr,
            })
        })
        .collect();
    SCHEMA_TEMPLATE
        .replace("__PRELUDE__", COLLECT_PRELUDE)
        .replace("__ROOT_SELECTOR__", &js_string(item_selector))
        .replace(
            "__FIELD_SPECS__",
            &serde_json::to_string(&specs).unwrap_or_else(|_| "[]".to_string()),
        )
        .replace("__LIMIT__", &limit.to_string())
}

/// Build the tier-2 (summary-derived) collection script.
#[must_use]
pub fn summary_items_script(
    root_selector: &str,
    widened_selector: &str,
    item_tag: Option<&str>,
    limit: usize,
) -> String {
    let tag_literal = match item_tag {
        Some(tag) => js_string(tag),
        None => "null".to_string(),
    };
    SUMMARY_TEMPLATE
        .replace("__PRELUDE__", COLLECT_PRELUDE)
        .replace("__ROOT_SELECTOR__", &js_string(root_selector))
        .replace("__WIDENED_SELECTOR__", &js_string(widened_selector))
        .replace("__ITEM_TAG__", &tag_literal)
        .replace("__LIMIT__", &limit.to_string())
}
