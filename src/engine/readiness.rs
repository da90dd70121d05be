//! Page readiness heuristic
//!
//! Polls the document until it looks settled: `readyState` complete, a body
//! present with some text, and (when network tracking is available) a soft
//! idle — the in-flight non-document request count staying at or below a
//! small threshold across consecutive polls. The poll has its own timeout
//! ceiling and gives up with a warning when unmet; readiness never fails a
//! run.

use std::time::{Duration, Instant};

use chromiumoxide::Page;

use super::interceptor::NetworkWatch;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// In-flight requests at or below this count as idle.
const SOFT_IDLE_THRESHOLD: usize = 2;
/// Consecutive idle polls required for a sustained idle.
const SOFT_IDLE_POLLS: u32 = 3;

const READY_STATE_SCRIPT: &str = r"
    (() => ({
        ready_state: document.readyState,
        body_exists: document.body !== null,
        text_len: document.body ? document.body.innerText.length : 0,
        node_count: document.getElementsByTagName('*').length,
    }))()
";

#[derive(Debug, Default, serde::Deserialize)]
struct ReadyProbe {
    #[serde(default)]
    ready_state: String,
    #[serde(default)]
    body_exists: bool,
    #[serde(default)]
    text_len: u64,
    #[serde(default)]
    node_count: u64,
}

/// Wait until the page looks content-bearing, up to `max_wait_secs`.
pub async fn wait_for_page_ready(page: &Page, watch: Option<&NetworkWatch>, max_wait_secs: u64) {
    let start = Instant::now();
    let max_wait = Duration::from_secs(max_wait_secs);
    let mut idle_streak = 0u32;

    loop {
        if start.elapsed() >= max_wait {
            log::warn!("timeout waiting for page readiness after {max_wait_secs}s, proceeding anyway");
            break;
        }

        let probe = match page.evaluate(READY_STATE_SCRIPT).await {
            Ok(result) => result.into_value::<ReadyProbe>().unwrap_or_default(),
            Err(e) => {
                log::debug!("readiness probe failed, retrying: {e}");
                tokio::time::sleep(POLL_INTERVAL).await;
                continue;
            }
        };

        let idle = match watch {
            Some(watch) if watch.inflight() <= SOFT_IDLE_THRESHOLD => {
                idle_streak += 1;
                idle_streak >= SOFT_IDLE_POLLS
            }
            Some(_) => {
                idle_streak = 0;
                false
            }
            None => true,
        };

        // density-style quick check: a complete document with an empty body
        // usually means client-side rendering is still in progress
        let content_bearing = probe.text_len > 0 || start.elapsed() >= max_wait / 2;

        if probe.ready_state == "complete" && probe.body_exists && idle && content_bearing {
            log::debug!(
                "page ready after {:.2}s ({} nodes, {} text chars)",
                start.elapsed().as_secs_f64(),
                probe.node_count,
                probe.text_len
            );
            break;
        }

        tokio::time::sleep(POLL_INTERVAL).await;
    }

    // settle buffer for late layout and lazy content
    tokio::time::sleep(Duration::from_millis(200)).await;
}
