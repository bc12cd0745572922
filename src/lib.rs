//! Hojokin Harvester: a polite, resumable crawler for Japanese subsidy listings
//!
//! This crate implements a deep-web crawler that discovers, fetches, renders,
//! and extracts structured subsidy ("hojokin") records from heterogeneous
//! public-sector websites, respecting robots.txt and per-domain rate limits.

pub mod cache;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod extract;
pub mod limiter;
pub mod queue;
pub mod record;
pub mod render;
pub mod robots;
pub mod url;

use thiserror::Error;

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Fetch failed for {url} after {attempts} attempts: {message}")]
    FetchExhausted {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("PDF extraction error for {url}: {message}")]
    Pdf { url: String, message: String },

    #[error("Checkpoint not found: {0}")]
    CheckpointNotFound(String),

    #[error("A crawl is already running on this engine")]
    AlreadyRunning,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown target: {0}")]
    UnknownTarget(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use crate::config::{BrowserMode, Config, CrawlerConfig};
pub use crate::engine::{CrawlResult, CrawlerEngine};
pub use crate::record::ScrapedSubsidy;
pub use crate::url::{extract_domain, normalize_url};
