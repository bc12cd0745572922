//! Headless-browser renderer
//!
//! Lazily launches a chromiumoxide-driven browser on first use; each
//! `render` opens one page, navigates, waits for main-content selectors
//! against a fixed floor, and always closes the page afterwards. The
//! engine never touches chromiumoxide directly; this type is reachable
//! only through the `Renderer` trait.

use crate::render::{RenderedPage, Renderer};
use crate::{HarvestError, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Selectors that mark a content-bearing page as ready
const READY_SELECTORS: &str = "main, article, .content, #content";

/// Minimum time given to client scripts before the content check
const RENDER_FLOOR: Duration = Duration::from_secs(3);

/// Extra settle time after the floor/selector race
const SETTLE_DELAY: Duration = Duration::from_secs(1);

struct BrowserHandle {
    browser: Browser,
    event_loop: JoinHandle<()>,
}

pub struct DynamicRenderer {
    handle: Mutex<Option<BrowserHandle>>,
    timeout: Duration,
}

impl DynamicRenderer {
    pub fn new(timeout: Duration) -> Self {
        Self {
            handle: Mutex::new(None),
            timeout,
        }
    }

    /// Launches the browser process if it is not already running
    async fn ensure_browser(&self) -> Result<()> {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return Ok(());
        }

        tracing::info!("Launching headless browser");
        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .request_timeout(self.timeout)
            .build()
            .map_err(HarvestError::Browser)?;

        let (browser, mut events) = Browser::launch(config)
            .await
            .map_err(|e| HarvestError::Browser(e.to_string()))?;

        let event_loop = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        *handle = Some(BrowserHandle {
            browser,
            event_loop,
        });
        Ok(())
    }

    async fn render_on_page(&self, page: &Page, url: &str, start: Instant) -> Result<RenderedPage> {
        page.goto(url)
            .await
            .map_err(|e| HarvestError::Browser(e.to_string()))?;
        let _ = page.wait_for_navigation().await;

        // Race content readiness against the render floor, then settle
        let ready = async {
            loop {
                if page.find_element(READY_SELECTORS).await.is_ok() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        };
        let _ = tokio::time::timeout(RENDER_FLOOR, ready).await;
        tokio::time::sleep(SETTLE_DELAY).await;

        let html = page
            .content()
            .await
            .map_err(|e| HarvestError::Browser(e.to_string()))?;

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| url.to_string());

        Ok(RenderedPage {
            html,
            url: final_url,
            // The CDP content path does not surface the HTTP status; a page
            // that rendered is treated as fetched
            status: 200,
            content_type: "text/html".to_string(),
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[async_trait]
impl Renderer for DynamicRenderer {
    async fn render(&self, url: &str) -> Result<Option<RenderedPage>> {
        let start = Instant::now();
        self.ensure_browser().await?;

        let page = {
            let handle = self.handle.lock().await;
            let browser = &handle
                .as_ref()
                .ok_or_else(|| HarvestError::Browser("browser not initialized".to_string()))?
                .browser;
            browser
                .new_page("about:blank")
                .await
                .map_err(|e| HarvestError::Browser(e.to_string()))?
        };

        let result = tokio::time::timeout(self.timeout, self.render_on_page(&page, url, start))
            .await
            .unwrap_or(Err(HarvestError::Timeout {
                url: url.to_string(),
            }));

        // The page must be closed whether rendering succeeded or not
        if let Err(e) = page.close().await {
            tracing::debug!("Failed to close browser page for {}: {}", url, e);
        }

        result.map(Some)
    }

    async fn cleanup(&self) {
        let mut handle = self.handle.lock().await;
        if let Some(mut h) = handle.take() {
            tracing::info!("Shutting down headless browser");
            if let Err(e) = h.browser.close().await {
                tracing::debug!("Browser close failed: {}", e);
            }
            let _ = h.browser.wait().await;
            h.event_loop.abort();
        }
    }
}
