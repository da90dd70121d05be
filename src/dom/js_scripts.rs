//! JavaScript evaluation scripts for frame discovery and DOM capture
//!
//! These scripts are the only code that touches the live document. Each
//! returns a serializable structure parsed with serde on the Rust side;
//! everything downstream (analyzers, selector generation, scoring) operates
//! on the captured data.

/// Enumerates the main document and reachable same-origin sub-documents.
///
/// For every child frame the script attempts a no-op read of the frame
/// document; a throw indicates a cross-origin frame, which is skipped
/// silently. Frames are returned in discovery order as index paths from the
/// top window (`[]` = main document, `[0]` = first child frame, ...).
pub const FRAME_PROBE_SCRIPT: &str = r#"
    (() => {
        const frames = [{ path: [] }];
        const walk = (win, path) => {
            let count = 0;
            try { count = win.frames.length; } catch (e) { return; }
            for (let i = 0; i < count; i++) {
                try {
                    void win.frames[i].document.readyState;
                    frames.push({ path: path.concat(i) });
                    walk(win.frames[i], path.concat(i));
                } catch (e) {
                    // cross-origin frame, skip
                }
            }
        };
        walk(window, []);
        return frames;
    })()
"#;

/// Template for the per-frame DOM capture script.
///
/// Serializes one frame's element tree into a flat node table (parent index,
/// tag, attributes in document order, own text, bounding box, visibility,
/// font metrics, cursor, handler flags, resolved href, computed background
/// image). Traversal stops once `__MAX_NODES__` elements have been recorded;
/// the `truncated` flag reports the cutoff.
///
/// Placeholders: `__FRAME_PATH__` (JSON index path), `__MAX_NODES__`.
const CAPTURE_TEMPLATE: &str = r#"
    (() => {
        const path = __FRAME_PATH__;
        let win = window;
        for (const i of path) { win = win.frames[i]; }
        const doc = win.document;
        const MAX = __MAX_NODES__;
        const nodes = [];
        let truncated = false;

        const push = (el, parent) => {
            if (nodes.length >= MAX) { truncated = true; return -1; }
            const style = win.getComputedStyle(el);
            const rect = el.getBoundingClientRect();
            let own = '';
            for (const child of el.childNodes) {
                if (child.nodeType === 3) own += child.textContent;
            }
            own = own.replace(/\s+/g, ' ').trim().slice(0, 200);
            const attrs = Array.from(el.attributes).map(a => [a.name, a.value.slice(0, 300)]);
            const weightRaw = parseInt(style.fontWeight, 10);
            const visible = style.display !== 'none'
                && style.visibility !== 'hidden'
                && parseFloat(style.opacity) > 0.05
                && rect.width > 0 && rect.height > 0;
            let href = null;
            if (typeof el.href === 'string' && el.href) {
                href = el.href;
            } else if (el.getAttribute('href')) {
                try { href = new URL(el.getAttribute('href'), doc.baseURI).href; } catch (e) {}
            }
            let bg = null;
            if (style.backgroundImage && style.backgroundImage !== 'none') {
                bg = style.backgroundImage.slice(0, 500);
            }
            nodes.push({
                parent,
                tag: el.tagName.toLowerCase(),
                attrs,
                text: own,
                bbox: { x: rect.left, y: rect.top, w: rect.width, h: rect.height },
                visible,
                font_size: parseFloat(style.fontSize) || 0,
                font_weight: isNaN(weightRaw) ? 400 : weightRaw,
                pointer_cursor: style.cursor === 'pointer',
                click_handler: !!(el.onclick || el.onmousedown || el.onmouseup
                    || el.hasAttribute('onclick')
                    || el.hasAttribute('onmousedown')
                    || el.hasAttribute('onmouseup')),
                focusable: el.tabIndex >= 0,
                href,
                bg_image: bg,
            });
            return nodes.length - 1;
        };

        const walk = (el, parent) => {
            const idx = push(el, parent);
            if (idx < 0) return;
            for (const child of el.children) walk(child, idx);
        };

        if (doc.documentElement) walk(doc.documentElement, -1);

        return {
            url: doc.location ? doc.location.href : '',
            title: doc.title || null,
            viewport_w: win.innerWidth,
            viewport_h: win.innerHeight,
            nodes,
            truncated,
            stats: {
                node_count: doc.getElementsByTagName('*').length,
                anchor_count: doc.getElementsByTagName('a').length,
                text_len: doc.body ? doc.body.innerText.length : 0,
            },
        };
    })()
"#;

/// Build the capture script for one frame path.
#[must_use]
pub fn capture_script(path: &[usize], max_nodes: usize) -> String {
    let path_json = serde_json::to_string(path).unwrap_or_else(|_| "[]".to_string());
    CAPTURE_TEMPLATE
        .replace("__FRAME_PATH__", &path_json)
        .replace("__MAX_NODES__", &max_nodes.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_script_embeds_path_and_cap() {
        let script = capture_script(&[0, 2], 4000);
        assert!(script.contains("const path = [0,2];"));
        assert!(script.contains("const MAX = 4000;"));
        assert!(!script.contains("__FRAME_PATH__"));
        assert!(!script.contains("__MAX_NODES__"));
    }
}
