//! Request interception and in-flight tracking
//!
//! Blocks image/media/font loads and known tracker hosts, and counts
//! in-flight non-document requests so the readiness heuristic can detect a
//! soft idle. Counting is event-driven: listener tasks watch the CDP network
//! events and keep a shared counter.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent, ResourceType,
    SetBlockedUrLsParams,
};
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::utils::BLOCKED_TRACKER_HOSTS;

/// URL patterns for media assets the scraper never needs rendered.
const MEDIA_PATTERNS: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.avif", "*.ico", "*.mp4", "*.webm", "*.mp3",
    "*.woff", "*.woff2", "*.ttf", "*.otf",
];

/// Shared view of the page's network activity.
pub struct NetworkWatch {
    pending: Arc<Mutex<HashSet<String>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl NetworkWatch {
    /// Enable the network domain, install the block list, and start the
    /// in-flight tracking tasks.
    pub async fn install(page: &Page, block_media: bool) -> Result<Self> {
        page.execute(EnableParams::default())
            .await
            .context("failed to enable network domain")?;

        let mut blocked: Vec<String> = BLOCKED_TRACKER_HOSTS
            .iter()
            .map(ToString::to_string)
            .collect();
        if block_media {
            blocked.extend(MEDIA_PATTERNS.iter().map(ToString::to_string));
        }
        page.execute(SetBlockedUrLsParams { urls: blocked })
            .await
            .context("failed to set blocked URL patterns")?;

        let pending: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
        let mut tasks = Vec::new();

        let mut sent = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .context("failed to listen for request events")?;
        let pending_sent = Arc::clone(&pending);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = sent.next().await {
                // document loads are navigation, not background traffic
                if event.r#type == Some(ResourceType::Document) {
                    continue;
                }
                if let Ok(id) = serde_json::to_string(&event.request_id)
                    && let Ok(mut set) = pending_sent.lock()
                {
                    set.insert(id);
                }
            }
        }));

        let mut finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .context("failed to listen for loading-finished events")?;
        let pending_finished = Arc::clone(&pending);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = finished.next().await {
                if let Ok(id) = serde_json::to_string(&event.request_id)
                    && let Ok(mut set) = pending_finished.lock()
                {
                    set.remove(&id);
                }
            }
        }));

        let mut failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .context("failed to listen for loading-failed events")?;
        let pending_failed = Arc::clone(&pending);
        tasks.push(tokio::spawn(async move {
            while let Some(event) = failed.next().await {
                if let Ok(id) = serde_json::to_string(&event.request_id)
                    && let Ok(mut set) = pending_failed.lock()
                {
                    set.remove(&id);
                }
            }
        }));

        Ok(Self { pending, tasks })
    }

    /// Number of non-document requests currently in flight.
    #[must_use]
    pub fn inflight(&self) -> usize {
        self.pending.lock().map(|set| set.len()).unwrap_or(0)
    }

    /// Forget tracked requests; called around navigations so stale entries
    /// from the previous document do not hold the idle check hostage.
    pub fn reset(&self) {
        if let Ok(mut set) = self.pending.lock() {
            set.clear();
        }
    }

    /// Stop the listener tasks.
    pub fn shutdown(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for NetworkWatch {
    fn drop(&mut self) {
        self.shutdown();
    }
}
