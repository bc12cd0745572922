//! Per-domain rate limiting with a global concurrency ceiling
//!
//! Politeness is per-host: each domain tracks its own last-request time
//! independently, so a slow domain never starves a ready one. A global
//! semaphore bounds the number of simultaneous in-flight requests.

use crate::url::extract_domain;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

/// Per-domain pacing state
#[derive(Debug, Default)]
struct DomainPacing {
    last_request: Option<Instant>,
    /// Crawl-delay override from robots.txt; only ever lengthens the wait
    crawl_delay: Option<Duration>,
}

/// An acquired request slot
///
/// Dropping the permit releases the concurrency slot, so a slot can never
/// leak past the scope that acquired it.
pub struct RatePermit {
    _permit: OwnedSemaphorePermit,
}

/// Paces outbound requests per domain and caps global concurrency
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    request_delay: Duration,
    domains: Mutex<HashMap<String, DomainPacing>>,
}

impl RateLimiter {
    /// Creates a limiter with the given concurrency ceiling and default
    /// minimum delay between requests to one domain
    pub fn new(concurrency: usize, request_delay: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
            request_delay,
            domains: Mutex::new(HashMap::new()),
        }
    }

    /// Waits until a request to this URL's domain is permitted
    ///
    /// Blocks (asynchronously) until a concurrency slot is free and the
    /// domain's effective delay has elapsed since its previous request,
    /// then stamps the domain and returns the slot. Waiters on the
    /// semaphore are served FIFO.
    pub async fn acquire(&self, url: &str) -> RatePermit {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("rate limiter semaphore closed");

        let domain = extract_domain(url).unwrap_or_default();

        loop {
            let wait = {
                let mut domains = self.domains.lock().await;
                let pacing = domains.entry(domain.clone()).or_default();
                let delay = self.effective_delay(pacing);

                match pacing.last_request {
                    Some(last) => {
                        let elapsed = last.elapsed();
                        if elapsed >= delay {
                            pacing.last_request = Some(Instant::now());
                            None
                        } else {
                            Some(delay - elapsed)
                        }
                    }
                    None => {
                        pacing.last_request = Some(Instant::now());
                        None
                    }
                }
            };

            match wait {
                None => return RatePermit { _permit: permit },
                Some(duration) => {
                    tracing::trace!("Pacing {}: waiting {:?}", domain, duration);
                    tokio::time::sleep(duration).await;
                }
            }
        }
    }

    /// Sets a robots.txt crawl-delay override for a domain
    ///
    /// Takes effect on the next `acquire` for that domain. The effective
    /// delay is the maximum of the configured default and this override,
    /// never shorter than the default.
    pub async fn set_crawl_delay(&self, domain: &str, delay: Duration) {
        let mut domains = self.domains.lock().await;
        let pacing = domains.entry(domain.to_lowercase()).or_default();
        pacing.crawl_delay = Some(delay);
    }

    fn effective_delay(&self, pacing: &DomainPacing) -> Duration {
        match pacing.crawl_delay {
            Some(override_delay) => self.request_delay.max(override_delay),
            None => self.request_delay,
        }
    }

    /// Number of free concurrency slots (test/diagnostic hook)
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_permit_released_on_drop() {
        let limiter = RateLimiter::new(2, Duration::from_millis(1));
        assert_eq!(limiter.available_slots(), 2);

        {
            let _permit = limiter.acquire("https://a.example.go.jp/").await;
            assert_eq!(limiter.available_slots(), 1);
        }
        assert_eq!(limiter.available_slots(), 2);
    }

    #[tokio::test]
    async fn test_concurrency_ceiling() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_millis(1)));

        let permit = limiter.acquire("https://a.example.go.jp/").await;
        assert_eq!(limiter.available_slots(), 0);

        // A second acquire on a different domain must wait for the slot
        let limiter2 = Arc::clone(&limiter);
        let waiter = tokio::spawn(async move {
            let _p = limiter2.acquire("https://b.example.go.jp/").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(permit);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_same_domain_spacing() {
        let limiter = RateLimiter::new(4, Duration::from_millis(80));

        let start = Instant::now();
        drop(limiter.acquire("https://a.example.go.jp/1").await);
        drop(limiter.acquire("https://a.example.go.jp/2").await);
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_domains_paced_independently() {
        let limiter = RateLimiter::new(4, Duration::from_millis(200));

        let start = Instant::now();
        drop(limiter.acquire("https://a.example.go.jp/").await);
        drop(limiter.acquire("https://b.example.go.jp/").await);
        // Different domains: the second request does not wait for the first's delay
        assert!(start.elapsed() < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_crawl_delay_extends_spacing() {
        let limiter = RateLimiter::new(4, Duration::from_millis(10));
        limiter
            .set_crawl_delay("a.example.go.jp", Duration::from_millis(100))
            .await;

        let start = Instant::now();
        drop(limiter.acquire("https://a.example.go.jp/1").await);
        drop(limiter.acquire("https://a.example.go.jp/2").await);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_crawl_delay_never_shortens_default() {
        let limiter = RateLimiter::new(4, Duration::from_millis(100));
        limiter
            .set_crawl_delay("a.example.go.jp", Duration::from_millis(10))
            .await;

        let start = Instant::now();
        drop(limiter.acquire("https://a.example.go.jp/1").await);
        drop(limiter.acquire("https://a.example.go.jp/2").await);
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
