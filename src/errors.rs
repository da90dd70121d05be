//! Error taxonomy
//!
//! Four failure classes with distinct handling: extraction failures are
//! recovered locally (the tier falls through), navigation failures are
//! re-raised to the scraping loop, validation failures are fatal before a
//! run starts, and timeouts degrade to proceed-with-warning.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("invalid target schema: {0}")]
    Validation(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),
}
