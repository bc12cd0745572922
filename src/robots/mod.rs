//! Robots.txt compliance
//!
//! Fetches, parses, and caches robots.txt per domain, answering allow/deny
//! and crawl-delay queries. Fetch or parse failure is treated as fully
//! permissive (fail-open): an unreachable robots.txt must not stall the
//! crawl. Concurrent checks against a cold domain are de-duplicated so
//! exactly one fetch goes out.

mod parser;

pub use parser::{RobotsRule, RobotsTxt};

use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

/// Timeout for robots.txt fetches, independent of the page timeout
const ROBOTS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a fetched robots.txt stays valid
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

struct CachedRobots {
    robots: Arc<RobotsTxt>,
    fetched_at: Instant,
}

/// Per-domain robots.txt gatekeeper
pub struct RobotsParser {
    client: Client,
    user_agent: String,
    cache_ttl: Duration,
    cache: Mutex<HashMap<String, CachedRobots>>,
    /// Per-domain fetch locks; concurrent cold lookups serialize here and
    /// all but the first are served from the cache
    fetch_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RobotsParser {
    pub fn new(client: Client, user_agent: &str) -> Self {
        Self {
            client,
            user_agent: user_agent.to_string(),
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Mutex::new(HashMap::new()),
            fetch_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Checks whether the crawler may fetch this URL
    ///
    /// A malformed URL is denied; everything else fails open when the
    /// domain's robots.txt cannot be fetched or parsed.
    pub async fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };

        let robots = self.robots_for(&parsed, host).await;

        let mut path = parsed.path().to_string();
        if let Some(query) = parsed.query() {
            path.push('?');
            path.push_str(query);
        }

        robots.is_allowed(&path, &self.user_agent)
    }

    /// Crawl-delay directive for a domain, if its cached rules carry one
    ///
    /// Only returns a value for domains already fetched through
    /// `is_allowed`; the engine consults this right after the gate check.
    pub async fn crawl_delay(&self, domain: &str) -> Option<Duration> {
        let cache = self.cache.lock().await;
        cache
            .get(&domain.to_lowercase())
            .and_then(|cached| cached.robots.crawl_delay(&self.user_agent))
    }

    /// Drops all cached rules (test isolation hook)
    pub async fn reset(&self) {
        self.cache.lock().await.clear();
        self.fetch_locks.lock().await.clear();
    }

    async fn robots_for(&self, url: &Url, host: &str) -> Arc<RobotsTxt> {
        let domain = host.to_lowercase();

        if let Some(robots) = self.cached(&domain).await {
            return robots;
        }

        // Serialize cold fetches per domain
        let lock = {
            let mut locks = self.fetch_locks.lock().await;
            Arc::clone(locks.entry(domain.clone()).or_default())
        };
        let _guard = lock.lock().await;

        // Another task may have fetched while we waited on the lock
        if let Some(robots) = self.cached(&domain).await {
            return robots;
        }

        let robots = Arc::new(self.fetch(url, &domain).await);
        self.cache.lock().await.insert(
            domain,
            CachedRobots {
                robots: Arc::clone(&robots),
                fetched_at: Instant::now(),
            },
        );
        robots
    }

    async fn cached(&self, domain: &str) -> Option<Arc<RobotsTxt>> {
        let cache = self.cache.lock().await;
        cache.get(domain).and_then(|cached| {
            if cached.fetched_at.elapsed() < self.cache_ttl {
                Some(Arc::clone(&cached.robots))
            } else {
                None
            }
        })
    }

    async fn fetch(&self, url: &Url, domain: &str) -> RobotsTxt {
        let robots_url = match robots_url_for(url) {
            Some(u) => u,
            None => return RobotsTxt::allow_all(),
        };

        tracing::debug!("Fetching robots.txt for {}", domain);

        let response = self
            .client
            .get(robots_url)
            .timeout(ROBOTS_FETCH_TIMEOUT)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(content) => RobotsTxt::parse(&content),
                Err(e) => {
                    tracing::debug!("robots.txt body read failed for {}: {}", domain, e);
                    RobotsTxt::allow_all()
                }
            },
            Ok(resp) => {
                tracing::debug!(
                    "robots.txt returned {} for {}, treating as permissive",
                    resp.status(),
                    domain
                );
                RobotsTxt::allow_all()
            }
            Err(e) => {
                tracing::debug!("robots.txt fetch failed for {}: {}", domain, e);
                RobotsTxt::allow_all()
            }
        }
    }
}

/// Builds `{scheme}://{authority}/robots.txt` for the URL's origin
fn robots_url_for(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let mut robots = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        robots.push_str(&format!(":{}", port));
    }
    robots.push_str("/robots.txt");
    Some(robots)
}
