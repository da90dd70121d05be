//! Run configuration

mod builder;
mod getters;
mod types;

pub use builder::{Complete, ScrapeConfigBuilder};
pub use types::ScrapeConfig;
