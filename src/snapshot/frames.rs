//! Frame collection and DOM capture
//!
//! Discovers the main document plus reachable same-origin sub-documents,
//! then captures each one's element tree concurrently. Cross-origin frames
//! are skipped inside the probe script itself (the reachability test throws
//! there); a frame that detaches between probe and capture is skipped here
//! with a debug log, never an error.

use anyhow::{Context, Result};
use chromiumoxide::Page;
use serde::Deserialize;

use crate::dom::js_scripts::{FRAME_PROBE_SCRIPT, capture_script};
use crate::dom::{FrameCapture, FrameDom};

/// Index path of one reachable frame, from the top window.
#[derive(Debug, Clone, Deserialize)]
pub struct FramePath {
    pub path: Vec<usize>,
}

/// Frame labels in discovery order: `main`, `f1`, `f2`, ...
#[must_use]
pub fn frame_label(discovery_index: usize) -> String {
    if discovery_index == 0 {
        "main".to_string()
    } else {
        format!("f{discovery_index}")
    }
}

/// Enumerate reachable frames in discovery order.
pub async fn collect_frames(page: &Page) -> Result<Vec<FramePath>> {
    let result = page
        .evaluate(FRAME_PROBE_SCRIPT)
        .await
        .context("frame probe evaluation failed")?;
    let paths: Vec<FramePath> = result
        .into_value()
        .map_err(|e| anyhow::anyhow!("failed to parse frame probe result: {e}"))?;
    Ok(paths)
}

/// Capture one frame's DOM through a main-context evaluation.
pub async fn capture_frame(
    page: &Page,
    label: &str,
    path: &[usize],
    max_nodes: usize,
) -> Result<FrameDom> {
    let script = capture_script(path, max_nodes);
    let result = page
        .evaluate(script.as_str())
        .await
        .with_context(|| format!("DOM capture failed for frame {label}"))?;
    let capture: FrameCapture = result
        .into_value()
        .map_err(|e| anyhow::anyhow!("failed to parse DOM capture for frame {label}: {e}"))?;
    if capture.truncated {
        log::debug!(
            "frame {label} capture truncated at {max_nodes} nodes ({} total)",
            capture.stats.node_count
        );
    }
    Ok(FrameDom::from_capture(label, capture))
}

/// Probe and capture every reachable frame, captures launched concurrently.
///
/// The captures are independent remote round trips; awaiting them jointly
/// hides their latency. The main document capture must succeed; sub-frame
/// failures are logged and skipped.
pub async fn capture_all(page: &Page, max_nodes: usize) -> Result<Vec<FrameDom>> {
    let paths = collect_frames(page).await?;
    let captures = paths.iter().enumerate().map(|(i, fp)| {
        let label = frame_label(i);
        async move {
            let frame = capture_frame(page, &label, &fp.path, max_nodes).await;
            (label, frame)
        }
    });
    let results = futures::future::join_all(captures).await;

    let mut frames = Vec::new();
    for (i, (label, result)) in results.into_iter().enumerate() {
        match result {
            Ok(frame) => frames.push(frame),
            Err(e) if i == 0 => return Err(e),
            Err(e) => log::debug!("skipping frame {label}: {e}"),
        }
    }
    Ok(frames)
}
