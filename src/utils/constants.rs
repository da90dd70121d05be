//! Shared configuration constants for pagesift
//!
//! Default values used throughout the codebase to ensure consistency and
//! avoid magic numbers. Heuristic scoring weights live in
//! `snapshot::Heuristics`, not here.

/// Default maximum number of pages a run will visit.
pub const DEFAULT_MAX_PAGES: usize = 5;

/// Default maximum number of extracted records per run.
pub const DEFAULT_MAX_ITEMS: usize = 100;

/// Default delay between error recovery attempts, in milliseconds.
///
/// Fixed (bounded) backoff, deliberately not exponential: the error ceiling
/// aborts the run before delays could usefully compound.
pub const DEFAULT_ERROR_DELAY_MS: u64 = 1_500;

/// Default ceiling on accumulated cycle errors before the run aborts.
pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;

/// Default timeout for `page.goto()` operations, in seconds.
pub const DEFAULT_PAGE_LOAD_TIMEOUT_SECS: u64 = 30;

/// Default timeout for `page.wait_for_navigation()`, in seconds.
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;

/// Default ceiling for the page-readiness poll, in seconds.
///
/// Readiness gives up (with a warning) when unmet; it never fails the run.
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 10;

/// Default bound on same-page links followed per cycle.
pub const DEFAULT_FOLLOW_LINKS_LIMIT: usize = 5;

/// Chrome user agent string used for consistent rendering
///
/// Chrome releases new stable versions roughly every 4 weeks; update
/// quarterly to stay within a reasonable version window.
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Known tracker hosts blocked via request interception.
///
/// Blocking these cuts network noise that would otherwise keep the soft-idle
/// heuristic waiting on analytics beacons.
pub const BLOCKED_TRACKER_HOSTS: &[&str] = &[
    "*://*.google-analytics.com/*",
    "*://*.googletagmanager.com/*",
    "*://*.doubleclick.net/*",
    "*://*.facebook.net/*",
    "*://*.hotjar.com/*",
    "*://*.segment.io/*",
    "*://*.mixpanel.com/*",
    "*://*.scorecardresearch.com/*",
];
