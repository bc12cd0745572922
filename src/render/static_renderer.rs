//! Static page fetcher
//!
//! Timeout-bounded GET with linear-backoff retry on 5xx and network
//! errors. 4xx responses and non-HTML content types are not retryable;
//! they yield `Ok(None)` so the engine records a skip, not a failure.

use crate::render::{RenderedPage, Renderer};
use crate::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};

pub struct StaticRenderer {
    client: Client,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl StaticRenderer {
    pub fn new(client: Client, timeout: Duration, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            client,
            timeout,
            max_retries,
            retry_delay,
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<Option<RenderedPage>> {
        let start = Instant::now();

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HarvestError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    HarvestError::Http {
                        url: url.to_string(),
                        source: e,
                    }
                }
            })?;

        let status = response.status();

        if status.is_client_error() {
            tracing::debug!("HTTP {} for {}, not retryable", status, url);
            return Ok(None);
        }

        if !status.is_success() {
            return Err(HarvestError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.is_empty() && !content_type.contains("text/html") {
            tracing::debug!("Skipping non-HTML content ({}) at {}", content_type, url);
            return Ok(None);
        }

        let final_url = response.url().to_string();
        let html = response.text().await.map_err(|e| HarvestError::Http {
            url: url.to_string(),
            source: e,
        })?;

        Ok(Some(RenderedPage {
            html,
            url: final_url,
            status: status.as_u16(),
            content_type,
            load_time_ms: start.elapsed().as_millis() as u64,
        }))
    }
}

#[async_trait]
impl Renderer for StaticRenderer {
    /// Fetches a URL, retrying transient failures with linear backoff
    ///
    /// Attempt N sleeps `retry_delay * N` before retrying. Gives up after
    /// `max_retries` attempts and reports the last error.
    async fn render(&self, url: &str) -> Result<Option<RenderedPage>> {
        let attempts = self.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match self.fetch_once(url).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    tracing::debug!("Fetch attempt {}/{} failed for {}: {}", attempt, attempts, url, e);
                    last_error = e.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }

        Err(HarvestError::FetchExhausted {
            url: url.to_string(),
            attempts,
            message: last_error,
        })
    }

    async fn cleanup(&self) {
        // Nothing held beyond the shared client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn renderer() -> StaticRenderer {
        StaticRenderer::new(
            Client::new(),
            Duration::from_secs(5),
            3,
            Duration::from_millis(10),
        )
    }

    #[tokio::test]
    async fn test_successful_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body>補助金</body></html>")
                    .insert_header("content-type", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let page = renderer()
            .render(&format!("{}/page", server.uri()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.status, 200);
        assert!(page.html.contains("補助金"));
        assert!(page.content_type.contains("text/html"));
    }

    #[tokio::test]
    async fn test_404_returns_none_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let result = renderer()
            .render(&format!("{}/missing", server.uri()))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_non_html_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("{}")
                    .insert_header("content-type", "application/json"),
            )
            .mount(&server)
            .await;

        let result = renderer()
            .render(&format!("{}/data.json", server.uri()))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_5xx_retried_until_exhaustion() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let result = renderer().render(&format!("{}/broken", server.uri())).await;
        assert!(matches!(
            result,
            Err(HarvestError::FetchExhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_5xx_then_success_recovers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body>ok</body></html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let page = renderer()
            .render(&format!("{}/flaky", server.uri()))
            .await
            .unwrap();
        assert!(page.is_some());
    }

    #[tokio::test]
    async fn test_connection_error_exhausts() {
        // Nothing listens on this port
        let result = renderer().render("http://127.0.0.1:9/unreachable").await;
        assert!(matches!(result, Err(HarvestError::FetchExhausted { .. })));
    }
}
