//! Crawler engine
//!
//! Drives the queue → robots gate → rate limit → fetch → extract →
//! enqueue loop and owns every component for the lifetime of one
//! `crawl()` or `resume_crawl()` call. Lifecycle events go out through a
//! synchronous listener list; a panicking observer is isolated and can
//! never abort a crawl. Per-URL failures are accumulated and returned
//! with the result: the run-level contract is best effort, always
//! returning what was extracted.

use crate::cache::ResponseCache;
use crate::checkpoint::{
    CheckpointManager, CheckpointResults, CheckpointState, CrawlCheckpoint,
};
use crate::config::{BrowserMode, CrawlerConfig, SiteSelectors, StorageConfig};
use crate::extract::{LinkExtractor, PdfExtractor, SubsidyExtractor, TextExtractor};
use crate::limiter::RateLimiter;
use crate::queue::{PageType, QueueItem, QueueSnapshot, UrlQueue};
use crate::record::ScrapedSubsidy;
use crate::render::{needs_dynamic_rendering, DynamicRenderer, RenderedPage, Renderer, StaticRenderer};
use crate::robots::RobotsParser;
use crate::url::extract_domain;
use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// PDF documents fetched per page, best-scored first
const MAX_PDFS_PER_PAGE: usize = 3;

/// Run counters; monotonically non-decreasing during a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlStats {
    pub total_urls: usize,
    pub visited_urls: usize,
    pub skipped_urls: usize,
    pub subsidies_found: usize,
    pub cache_hits: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}

/// One recorded per-URL failure; appended, never mutated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlError {
    pub url: String,
    pub message: String,
    pub code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Lifecycle events broadcast to registered listeners
#[derive(Debug, Clone)]
pub enum CrawlEvent {
    Started { entry_urls: Vec<String> },
    PageVisited { url: String, depth: u32 },
    PageSkipped { url: String, reason: String },
    SubsidyFound { title: String, url: String },
    PageError { url: String, message: String },
    Finished { stats: CrawlStats },
}

type EventListener = Box<dyn Fn(&CrawlEvent) + Send + Sync>;

/// Outcome of a crawl: everything that was extracted, plus counters and
/// the failures encountered along the way
#[derive(Debug, Clone)]
pub struct CrawlResult {
    pub subsidies: Vec<ScrapedSubsidy>,
    pub stats: CrawlStats,
    pub errors: Vec<CrawlError>,
}

struct RunMeta {
    checkpoint_id: String,
    created_at: DateTime<Utc>,
}

/// The orchestrator
///
/// Construct one engine per crawl source; components are injected at
/// construction and owned exclusively. No two crawls may run on one
/// engine at a time; the `is_running` guard fails fast.
pub struct CrawlerEngine {
    config: CrawlerConfig,
    source: String,
    site_selectors: Option<SiteSelectors>,
    config_hash: Option<String>,

    client: Client,
    queue: UrlQueue,
    limiter: RateLimiter,
    robots: RobotsParser,
    cache: ResponseCache,
    cache_path: PathBuf,
    checkpoints: CheckpointManager,
    static_renderer: StaticRenderer,
    dynamic_renderer: Option<Box<dyn Renderer>>,
    link_extractor: LinkExtractor,
    subsidy_extractor: SubsidyExtractor,
    pdf_extractor: PdfExtractor,

    listeners: Vec<EventListener>,
    is_running: bool,

    // Per-run state
    subsidies: Vec<ScrapedSubsidy>,
    errors: Vec<CrawlError>,
    stats: CrawlStats,
    current_depth: u32,
    allowed_domains: HashSet<String>,
    run_meta: Option<RunMeta>,
}

impl CrawlerEngine {
    /// Builds an engine and its component graph for one crawl source
    pub fn new(config: CrawlerConfig, storage: &StorageConfig, source: &str) -> Result<Self> {
        crate::config::validate_crawler_config(&config).map_err(HarvestError::Config)?;

        let client = build_http_client(&config)?;
        let timeout = Duration::from_millis(config.timeout);

        let cache_path = PathBuf::from(&storage.cache_path);
        let cache_ttl = Duration::from_millis(storage.cache_ttl);
        let cache = if cache_path.exists() {
            match ResponseCache::load(&cache_path, storage.cache_entries, cache_ttl) {
                Ok(cache) => {
                    tracing::info!("Loaded {} cached pages", cache.len());
                    cache
                }
                Err(e) => {
                    tracing::warn!("Failed to load page cache, starting empty: {}", e);
                    ResponseCache::new(storage.cache_entries, cache_ttl)
                }
            }
        } else {
            ResponseCache::new(storage.cache_entries, cache_ttl)
        };

        let limiter = RateLimiter::new(
            config.concurrency,
            Duration::from_millis(config.request_delay),
        );
        let robots = RobotsParser::new(client.clone(), &config.user_agent);
        let checkpoints = CheckpointManager::new(
            PathBuf::from(&storage.checkpoint_dir).as_path(),
            Duration::from_millis(storage.checkpoint_interval),
        );

        let static_renderer = StaticRenderer::new(
            client.clone(),
            timeout,
            config.max_retries,
            Duration::from_millis(config.retry_delay),
        );
        let dynamic_renderer: Option<Box<dyn Renderer>> = match config.headless_browser {
            BrowserMode::Never => None,
            BrowserMode::Always | BrowserMode::Auto => {
                Some(Box::new(DynamicRenderer::new(timeout)))
            }
        };

        let text_engine = Arc::new(TextExtractor::new());
        let subsidy_extractor = SubsidyExtractor::new(Arc::clone(&text_engine));
        let pdf_extractor = PdfExtractor::new(text_engine);

        Ok(Self {
            config,
            source: source.to_string(),
            site_selectors: None,
            config_hash: None,
            client,
            queue: UrlQueue::new(),
            limiter,
            robots,
            cache,
            cache_path,
            checkpoints,
            static_renderer,
            dynamic_renderer,
            link_extractor: LinkExtractor::default(),
            subsidy_extractor,
            pdf_extractor,
            listeners: Vec::new(),
            is_running: false,
            subsidies: Vec::new(),
            errors: Vec::new(),
            stats: CrawlStats::default(),
            current_depth: 0,
            allowed_domains: HashSet::new(),
            run_meta: None,
        })
    }

    /// Installs site-specific selectors for this source
    pub fn with_site_selectors(mut self, selectors: Option<SiteSelectors>) -> Self {
        self.site_selectors = selectors;
        self
    }

    /// Stamps checkpoints with the active config file hash
    pub fn with_config_hash(mut self, hash: Option<String>) -> Self {
        self.config_hash = hash;
        self
    }

    /// Swaps the dynamic renderer (test seam; stubs replace the browser)
    pub fn with_dynamic_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.dynamic_renderer = Some(renderer);
        self
    }

    /// Registers a lifecycle event listener
    pub fn add_listener(&mut self, listener: impl Fn(&CrawlEvent) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Replaces the crawl configuration
    ///
    /// Rejected while a crawl is running; the configuration is immutable
    /// per run.
    pub fn update_config(&mut self, config: CrawlerConfig) -> Result<()> {
        if self.is_running {
            return Err(HarvestError::AlreadyRunning);
        }
        crate::config::validate_crawler_config(&config).map_err(HarvestError::Config)?;
        self.config = config;
        Ok(())
    }

    /// Empties the page cache and removes its persisted file
    pub fn clear_cache(&mut self) -> Result<()> {
        self.cache.clear();
        if self.cache_path.exists() {
            std::fs::remove_file(&self.cache_path)?;
        }
        Ok(())
    }

    /// Crawls from the given entry URLs until the queue drains or the
    /// page budget is exhausted
    pub async fn crawl(&mut self, entry_urls: &[String]) -> Result<CrawlResult> {
        if self.is_running {
            return Err(HarvestError::AlreadyRunning);
        }
        self.is_running = true;

        let result = self.run_fresh(entry_urls).await;
        self.finish_run().await;
        result
    }

    /// Resumes a checkpointed crawl by id
    ///
    /// Fails fast with `CheckpointNotFound` for an unknown id and
    /// `AlreadyRunning` on a busy engine.
    pub async fn resume_crawl(&mut self, checkpoint_id: &str) -> Result<CrawlResult> {
        if self.is_running {
            return Err(HarvestError::AlreadyRunning);
        }

        let checkpoint = self.checkpoints.load(checkpoint_id)?;
        self.is_running = true;

        let result = self.run_resumed(checkpoint).await;
        self.finish_run().await;
        result
    }

    async fn finish_run(&mut self) {
        self.is_running = false;
        if let Some(renderer) = &self.dynamic_renderer {
            renderer.cleanup().await;
        }
        if let Err(e) = self.cache.persist(&self.cache_path) {
            tracing::warn!("Failed to persist page cache: {}", e);
        }
    }

    async fn run_fresh(&mut self, entry_urls: &[String]) -> Result<CrawlResult> {
        self.reset_run_state();
        self.stats.start_time = Some(Utc::now());

        self.allowed_domains = self
            .config
            .allowed_domains
            .iter()
            .map(|d| d.to_lowercase())
            .collect();

        for entry in entry_urls {
            if let Some(domain) = extract_domain(entry) {
                self.allowed_domains.insert(domain);
            }
            let Some(item) = QueueItem::new(entry, 0, 100, PageType::List) else {
                tracing::warn!("Skipping malformed entry URL: {}", entry);
                continue;
            };
            if self.queue.enqueue(item) {
                self.stats.total_urls += 1;
            }
        }

        self.run_meta = Some(RunMeta {
            checkpoint_id: CheckpointManager::generate_id(&self.source),
            created_at: Utc::now(),
        });

        self.emit(&CrawlEvent::Started {
            entry_urls: entry_urls.to_vec(),
        });

        self.crawl_loop().await
    }

    async fn run_resumed(&mut self, checkpoint: CrawlCheckpoint) -> Result<CrawlResult> {
        tracing::info!(
            "Resuming checkpoint {} ({} visited, {} queued)",
            checkpoint.id,
            checkpoint.state.visited_urls.len(),
            checkpoint.state.queued_items.len()
        );

        if let (Some(current), Some(saved)) = (&self.config_hash, &checkpoint.config_hash) {
            if current != saved {
                tracing::warn!(
                    "Configuration changed since checkpoint {} was taken; resuming with the checkpointed config",
                    checkpoint.id
                );
            }
        }

        self.reset_run_state();
        self.source = checkpoint.name.clone();
        self.config = checkpoint.config.clone();
        self.queue = UrlQueue::import(QueueSnapshot {
            visited_urls: checkpoint.state.visited_urls.clone(),
            queued_items: checkpoint.state.queued_items.clone(),
        });
        self.subsidies = checkpoint.results.subsidies.clone();
        self.errors = checkpoint.results.errors.clone();
        self.stats = checkpoint.results.stats.clone();
        self.stats.end_time = None;
        if self.stats.start_time.is_none() {
            self.stats.start_time = Some(Utc::now());
        }
        self.current_depth = checkpoint.state.current_depth;

        self.allowed_domains = self
            .config
            .allowed_domains
            .iter()
            .map(|d| d.to_lowercase())
            .collect();
        let snapshot = self.queue.export();
        for url in snapshot
            .visited_urls
            .iter()
            .chain(snapshot.queued_items.iter().map(|i| &i.url))
        {
            if let Some(domain) = extract_domain(url) {
                self.allowed_domains.insert(domain);
            }
        }

        self.run_meta = Some(RunMeta {
            checkpoint_id: checkpoint.id.clone(),
            created_at: checkpoint.created_at,
        });

        self.emit(&CrawlEvent::Started {
            entry_urls: Vec::new(),
        });

        self.crawl_loop().await
    }

    fn reset_run_state(&mut self) {
        // The page cache deliberately survives across runs
        self.queue = UrlQueue::new();
        self.subsidies.clear();
        self.errors.clear();
        self.stats = CrawlStats::default();
        self.current_depth = 0;
        self.run_meta = None;
    }

    async fn crawl_loop(&mut self) -> Result<CrawlResult> {
        self.checkpoints.start_auto_save();
        self.save_checkpoint_now();

        while let Some(item) = self.queue.dequeue() {
            if self.stats.visited_urls >= self.config.max_pages {
                tracing::info!("Page budget ({}) reached", self.config.max_pages);
                // Put the item back so a checkpoint resume can continue here
                self.queue.enqueue(item);
                break;
            }
            if item.depth > self.config.max_depth {
                continue;
            }

            if let Err(e) = self.process_url(&item).await {
                tracing::warn!("Failed to process {}: {}", item.url, e);
                self.record_error(&item.url, &e);
                self.emit(&CrawlEvent::PageError {
                    url: item.url.clone(),
                    message: e.to_string(),
                });
                if self.queue.requeue_for_retry(item.clone()) {
                    tracing::debug!("Requeued {} (retry {})", item.url, item.retry_count + 1);
                }
            }

            self.tick_checkpoint();
        }

        self.checkpoints.stop_auto_save();
        self.finalize_stats();
        self.save_checkpoint_now();

        let stats = self.stats.clone();
        self.emit(&CrawlEvent::Finished {
            stats: stats.clone(),
        });

        if self.config.dry_run {
            tracing::info!(
                "Dry run: {} candidate records were not handed to persistence",
                self.subsidies.len()
            );
        }

        Ok(CrawlResult {
            subsidies: self.subsidies.clone(),
            stats,
            errors: self.errors.clone(),
        })
    }

    async fn process_url(&mut self, item: &QueueItem) -> Result<()> {
        let url = item.url.as_str();

        if self.config.respect_robots_txt {
            if !self.robots.is_allowed(url).await {
                tracing::info!("Disallowed by robots.txt: {}", url);
                self.skip_page(url, "robots.txt disallow");
                return Ok(());
            }
            if let Some(domain) = extract_domain(url) {
                if let Some(delay) = self.robots.crawl_delay(&domain).await {
                    if delay > Duration::from_millis(self.config.request_delay) {
                        self.limiter.set_crawl_delay(&domain, delay).await;
                    }
                }
            }
        }

        let page = match self.cache.get(url) {
            Some(page) => {
                self.stats.cache_hits += 1;
                tracing::debug!("Cache hit: {}", url);
                Some(page)
            }
            None => {
                let fetched = {
                    let _permit = self.limiter.acquire(url).await;
                    self.fetch_page(url).await?
                };
                if let Some(page) = &fetched {
                    self.cache.set(url, page, None);
                }
                fetched
            }
        };

        let Some(page) = page else {
            self.skip_page(url, "not fetchable (4xx or non-HTML)");
            return Ok(());
        };

        self.queue.mark_visited(url);
        self.stats.visited_urls += 1;
        self.current_depth = self.current_depth.max(item.depth);
        self.emit(&CrawlEvent::PageVisited {
            url: url.to_string(),
            depth: item.depth,
        });

        let today = Utc::now().date_naive();
        if let Some(info) =
            self.subsidy_extractor
                .extract(&page.html, url, self.site_selectors.as_ref(), today)
        {
            if let Some(record) = ScrapedSubsidy::from_info(&info, &self.source) {
                tracing::info!(
                    "Subsidy found: {} (confidence {})",
                    record.title,
                    record.confidence
                );
                self.stats.subsidies_found += 1;
                self.emit(&CrawlEvent::SubsidyFound {
                    title: record.title.clone(),
                    url: url.to_string(),
                });
                self.subsidies.push(record);
            }
        }

        let base = Url::parse(&page.url).or_else(|_| Url::parse(url))?;

        // PDFs are leaf documents, processed regardless of remaining depth
        let pdf_links = self.link_extractor.extract_pdf_links(&page.html, &base);
        for pdf in pdf_links.into_iter().take(MAX_PDFS_PER_PAGE) {
            if !self.domain_allowed(&pdf.url) {
                continue;
            }
            if let Err(e) = self.process_pdf(&pdf.url, today).await {
                tracing::debug!("PDF processing failed for {}: {}", pdf.url, e);
                self.record_error(&pdf.url, &e);
            }
        }

        if item.depth < self.config.max_depth {
            let links = self
                .link_extractor
                .extract_links(&page.html, &base, self.site_selectors.as_ref());
            for link in links {
                if !self.domain_allowed(&link.url) {
                    continue;
                }
                let queued = QueueItem {
                    url: link.url,
                    depth: item.depth + 1,
                    priority: link.priority,
                    source_url: Some(url.to_string()),
                    page_type: link.page_type,
                    retry_count: 0,
                    added_at: Utc::now(),
                };
                if self.queue.enqueue(queued) {
                    self.stats.total_urls += 1;
                }
            }

            // A pagination target is a listing whose value is its children;
            // enqueue it only while those children still fit the depth budget
            if item.depth + 1 < self.config.max_depth {
                let pagination = self.link_extractor.extract_pagination_links(&page.html, &base);
                for link in pagination {
                    if !self.domain_allowed(&link.url) {
                        continue;
                    }
                    let queued = QueueItem {
                        url: link.url,
                        depth: item.depth + 1,
                        priority: link.priority,
                        source_url: Some(url.to_string()),
                        page_type: PageType::List,
                        retry_count: 0,
                        added_at: Utc::now(),
                    };
                    if self.queue.enqueue(queued) {
                        self.stats.total_urls += 1;
                    }
                }
            }
        }

        Ok(())
    }

    /// Fetches and extracts one PDF document
    async fn process_pdf(&mut self, url: &str, today: chrono::NaiveDate) -> Result<()> {
        if self.queue.is_visited(url) {
            return Ok(());
        }
        if self.config.respect_robots_txt && !self.robots.is_allowed(url).await {
            self.stats.skipped_urls += 1;
            return Ok(());
        }

        let bytes = {
            let _permit = self.limiter.acquire(url).await;
            let response = self
                .client
                .get(url)
                .timeout(Duration::from_millis(self.config.timeout))
                .send()
                .await
                .map_err(|e| HarvestError::Http {
                    url: url.to_string(),
                    source: e,
                })?;
            if !response.status().is_success() {
                return Ok(());
            }
            response.bytes().await.map_err(|e| HarvestError::Http {
                url: url.to_string(),
                source: e,
            })?
        };

        self.queue.mark_visited(url);

        if let Some(info) = self.pdf_extractor.extract(&bytes, url, today) {
            if let Some(record) = ScrapedSubsidy::from_info(&info, &self.source) {
                tracing::info!("Subsidy found in PDF: {}", record.title);
                self.stats.subsidies_found += 1;
                self.emit(&CrawlEvent::SubsidyFound {
                    title: record.title.clone(),
                    url: url.to_string(),
                });
                self.subsidies.push(record);
            }
        }

        Ok(())
    }

    /// Applies the rendering policy for one page
    async fn fetch_page(&self, url: &str) -> Result<Option<RenderedPage>> {
        match self.config.headless_browser {
            BrowserMode::Never => self.static_renderer.render(url).await,
            BrowserMode::Always => match &self.dynamic_renderer {
                Some(renderer) => renderer.render(url).await,
                None => self.static_renderer.render(url).await,
            },
            BrowserMode::Auto => {
                let page = self.static_renderer.render(url).await?;
                match page {
                    Some(page) if needs_dynamic_rendering(&page.html) => {
                        let Some(renderer) = &self.dynamic_renderer else {
                            return Ok(Some(page));
                        };
                        tracing::debug!("Static render looks client-side, re-rendering: {}", url);
                        match renderer.render(url).await {
                            Ok(Some(dynamic_page)) => Ok(Some(dynamic_page)),
                            Ok(None) => Ok(Some(page)),
                            Err(e) => {
                                tracing::warn!(
                                    "Dynamic render failed for {}, keeping static page: {}",
                                    url,
                                    e
                                );
                                Ok(Some(page))
                            }
                        }
                    }
                    other => Ok(other),
                }
            }
        }
    }

    fn skip_page(&mut self, url: &str, reason: &str) {
        self.queue.mark_visited(url);
        self.stats.skipped_urls += 1;
        self.emit(&CrawlEvent::PageSkipped {
            url: url.to_string(),
            reason: reason.to_string(),
        });
    }

    fn domain_allowed(&self, url: &str) -> bool {
        if !self.config.stay_in_domain {
            return true;
        }
        match extract_domain(url) {
            Some(domain) => self.allowed_domains.contains(&domain),
            None => false,
        }
    }

    fn record_error(&mut self, url: &str, error: &HarvestError) {
        let code = match error {
            HarvestError::Timeout { .. } => Some("timeout".to_string()),
            HarvestError::HttpStatus { status, .. } => Some(status.to_string()),
            HarvestError::FetchExhausted { .. } => Some("fetch_exhausted".to_string()),
            HarvestError::Browser(_) => Some("browser".to_string()),
            _ => None,
        };
        self.errors.push(CrawlError {
            url: url.to_string(),
            message: error.to_string(),
            code,
            timestamp: Utc::now(),
        });
    }

    fn finalize_stats(&mut self) {
        let end = Utc::now();
        self.stats.end_time = Some(end);
        if let Some(start) = self.stats.start_time {
            self.stats.duration_ms = (end - start).num_milliseconds().max(0) as u64;
        }
    }

    fn build_checkpoint(&self) -> Option<CrawlCheckpoint> {
        let meta = self.run_meta.as_ref()?;
        let snapshot = self.queue.export();
        Some(CrawlCheckpoint {
            id: meta.checkpoint_id.clone(),
            name: self.source.clone(),
            config: self.config.clone(),
            config_hash: self.config_hash.clone(),
            state: CheckpointState {
                visited_urls: snapshot.visited_urls,
                queued_items: snapshot.queued_items,
                current_depth: self.current_depth,
            },
            results: CheckpointResults {
                subsidies: self.subsidies.clone(),
                stats: self.stats.clone(),
                errors: self.errors.clone(),
            },
            created_at: meta.created_at,
            updated_at: meta.created_at,
        })
    }

    fn save_checkpoint_now(&mut self) {
        if let Some(mut checkpoint) = self.build_checkpoint() {
            if let Err(e) = self.checkpoints.save(&mut checkpoint) {
                tracing::warn!("Checkpoint save failed: {}", e);
            }
        }
    }

    fn tick_checkpoint(&mut self) {
        if let Some(mut checkpoint) = self.build_checkpoint() {
            if let Err(e) = self.checkpoints.tick(&mut checkpoint) {
                tracing::warn!("Checkpoint auto-save failed: {}", e);
            }
        }
    }

    /// Broadcasts an event; a panicking listener is contained
    fn emit(&self, event: &CrawlEvent) {
        for listener in &self.listeners {
            let outcome =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| listener(event)));
            if outcome.is_err() {
                tracing::warn!("Crawl event listener panicked; continuing");
            }
        }
    }
}

/// Builds the shared HTTP client with the configured identity
fn build_http_client(config: &CrawlerConfig) -> Result<Client> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_millis(config.timeout))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_engine(dir: &TempDir) -> CrawlerEngine {
        let mut config = CrawlerConfig::default();
        config.request_delay = 10;
        config.retry_delay = 10;
        config.headless_browser = BrowserMode::Never;
        let storage = StorageConfig {
            checkpoint_dir: dir.path().join("checkpoints").display().to_string(),
            checkpoint_interval: 60_000,
            cache_path: dir.path().join("cache/pages.json").display().to_string(),
            cache_entries: 100,
            cache_ttl: 3_600_000,
        };
        CrawlerEngine::new(config, &storage, "test").unwrap()
    }

    #[tokio::test]
    async fn test_resume_unknown_checkpoint() {
        let dir = TempDir::new().unwrap();
        let mut engine = test_engine(&dir);
        let result = engine.resume_crawl("no-such-checkpoint").await;
        assert!(matches!(result, Err(HarvestError::CheckpointNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_config_validates() {
        let dir = TempDir::new().unwrap();
        let mut engine = test_engine(&dir);

        let mut bad = CrawlerConfig::default();
        bad.request_delay = 0;
        assert!(engine.update_config(bad).is_err());

        let mut good = CrawlerConfig::default();
        good.max_depth = 5;
        engine.update_config(good).unwrap();
    }

    #[tokio::test]
    async fn test_listener_panic_is_contained() {
        let dir = TempDir::new().unwrap();
        let mut engine = test_engine(&dir);
        engine.add_listener(|_event| panic!("misbehaving observer"));

        // Crawl over an empty queue: Started/Finished still fire into the
        // panicking listener and must not abort the run
        let result = engine.crawl(&[]).await.unwrap();
        assert_eq!(result.stats.visited_urls, 0);
    }

    #[tokio::test]
    async fn test_empty_entry_urls_finish_cleanly() {
        let dir = TempDir::new().unwrap();
        let mut engine = test_engine(&dir);
        let result = engine.crawl(&[]).await.unwrap();
        assert_eq!(result.stats.total_urls, 0);
        assert!(result.subsidies.is_empty());
        assert!(result.stats.end_time.is_some());
    }

    #[tokio::test]
    async fn test_engine_reusable_after_run() {
        let dir = TempDir::new().unwrap();
        let mut engine = test_engine(&dir);
        engine.crawl(&[]).await.unwrap();
        // The running guard is released when the crawl ends
        engine.crawl(&[]).await.unwrap();
    }
}
