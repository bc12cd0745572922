//! Page renderers
//!
//! Two fetch strategies behind one interface: a static fetcher built on
//! reqwest, and a headless-browser renderer for script-heavy pages. The
//! engine depends only on the `Renderer` trait so the browser capability
//! can be swapped or stubbed in tests.

mod dynamic;
mod static_renderer;

pub use dynamic::DynamicRenderer;
pub use static_renderer::StaticRenderer;

use crate::extract::visible_text;
use crate::Result;
use async_trait::async_trait;

/// A fetched and rendered page
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Full HTML after rendering
    pub html: String,

    /// Final URL after redirects
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value
    pub content_type: String,

    /// Wall-clock fetch/render time in milliseconds
    pub load_time_ms: u64,
}

/// A page fetch strategy
///
/// `render` returns `Ok(None)` for pages that exist but are not worth
/// processing (4xx, non-HTML); errors are reserved for transient failures
/// that exhausted their retries.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<Option<RenderedPage>>;

    /// Releases held resources (browser processes, open pages)
    async fn cleanup(&self);
}

/// Minimum visible text length below which a script-bearing page is
/// considered client-rendered
const MIN_STATIC_TEXT_LEN: usize = 200;

/// Decides whether a statically fetched page needs a headless re-render
///
/// Detects known SPA framework fingerprints, or suspiciously little
/// visible text on a page that does carry scripts. Most government sites
/// are server-rendered, so this gate keeps the expensive browser path
/// rare.
pub fn needs_dynamic_rendering(html: &str) -> bool {
    const FINGERPRINTS: &[&str] = &[
        "__NEXT_DATA__",
        "id=\"__next\"",
        "window.__NUXT__",
        "id=\"__nuxt\"",
        "data-reactroot",
        "ng-version=",
        "ng-app",
        "JavaScriptを有効に",
        "JavaScript を有効に",
        "enable JavaScript",
    ];

    if FINGERPRINTS.iter().any(|fp| html.contains(fp)) {
        return true;
    }

    if !html.contains("<script") {
        return false;
    }

    visible_text(html).chars().count() < MIN_STATIC_TEXT_LEN
}
