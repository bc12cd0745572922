use serde::{Deserialize, Serialize};

/// Main configuration structure
///
/// The `[crawler]` table holds run defaults; each `[[target]]` names a
/// crawl source and may override parts of them.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetConfig>,
}

/// Browser rendering mode for page fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserMode {
    /// Static fetches only
    Never,
    /// Headless browser for every page
    Always,
    /// Static first; headless only when the SPA heuristic trips
    Auto,
}

/// Crawler behavior configuration, immutable for the duration of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum link depth from an entry URL
    pub max_depth: u32,

    /// Maximum number of pages to visit in one run
    pub max_pages: usize,

    /// Minimum delay between requests to the same domain (milliseconds)
    pub request_delay: u64,

    /// Maximum number of simultaneous in-flight requests
    pub concurrency: usize,

    /// Per-request timeout (milliseconds)
    pub timeout: u64,

    /// Retry attempts for transient fetch failures
    pub max_retries: u32,

    /// Base retry delay; attempt N waits N times this (milliseconds)
    pub retry_delay: u64,

    /// Restrict the crawl to the entry URL's domain
    pub stay_in_domain: bool,

    /// Additional domains allowed when `stay_in_domain` is set
    pub allowed_domains: Vec<String>,

    /// Headless browser policy
    pub headless_browser: BrowserMode,

    /// Honor robots.txt allow/disallow and crawl-delay
    pub respect_robots_txt: bool,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Run extraction but do not hand records to the persistence layer
    pub dry_run: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_pages: 100,
            request_delay: 1000,
            concurrency: 2,
            timeout: 30_000,
            max_retries: 3,
            retry_delay: 5000,
            stay_in_domain: true,
            allowed_domains: Vec::new(),
            headless_browser: BrowserMode::Auto,
            respect_robots_txt: true,
            user_agent: "HojokinHarvester/1.0 (+https://hojokin.example.jp/about)".to_string(),
            dry_run: false,
        }
    }
}

/// Durable-state locations
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StorageConfig {
    /// Directory for checkpoint JSON files
    pub checkpoint_dir: String,

    /// Auto-save interval for checkpoints (milliseconds)
    pub checkpoint_interval: u64,

    /// Path of the persisted page cache file
    pub cache_path: String,

    /// Maximum number of cached pages
    pub cache_entries: usize,

    /// Default page cache TTL (milliseconds)
    pub cache_ttl: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: "./checkpoints".to_string(),
            checkpoint_interval: 60_000,
            cache_path: "./cache/pages.json".to_string(),
            cache_entries: 500,
            cache_ttl: 3_600_000,
        }
    }
}

/// One named crawl source
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetConfig {
    /// Stable identifier, used as the record `source` value
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Seed URLs for this source
    pub entry_urls: Vec<String>,

    /// Extra domains this target may wander into
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// Site-specific CSS selectors, when generic heuristics are not enough
    #[serde(default)]
    pub selectors: Option<SiteSelectors>,

    /// Per-target overrides folded over the `[crawler]` defaults
    #[serde(default)]
    pub max_depth: Option<u32>,

    #[serde(default)]
    pub max_pages: Option<usize>,

    #[serde(default)]
    pub headless_browser: Option<BrowserMode>,
}

/// Site-specific CSS selectors configured per target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteSelectors {
    /// Selectors that locate a subsidy title on a detail page
    #[serde(default)]
    pub title: Vec<String>,

    /// Selectors whose anchors are always detail links at top priority
    #[serde(default)]
    pub detail_links: Vec<String>,
}

impl CrawlerConfig {
    /// Folds a target's overrides over these defaults
    pub fn merged_with(&self, target: &TargetConfig) -> CrawlerConfig {
        let mut merged = self.clone();
        if let Some(depth) = target.max_depth {
            merged.max_depth = depth;
        }
        if let Some(pages) = target.max_pages {
            merged.max_pages = pages;
        }
        if let Some(mode) = target.headless_browser {
            merged.headless_browser = mode;
        }
        if !target.allowed_domains.is_empty() {
            merged.allowed_domains = target.allowed_domains.clone();
        }
        merged
    }
}

impl Config {
    /// Looks up a target by id
    pub fn find_target(&self, id: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.id == id)
    }
}
