//! Configuration module
//!
//! TOML-based configuration: crawler run defaults, storage locations, and
//! named crawl targets with per-target overrides and site selectors.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{BrowserMode, Config, CrawlerConfig, SiteSelectors, StorageConfig, TargetConfig};
pub use validation::{validate, validate_crawler_config};
