//! Link discovery and scoring
//!
//! Harvests outbound links from a page: plain anchors, SPA-style
//! `data-href`/`role=link` buttons, and any site-specific selectors
//! configured for the current target. Site-selector matches are domain
//! knowledge and override the generic lexical scoring: they are tagged as
//! detail links at top priority.

use crate::config::SiteSelectors;
use crate::queue::{calculate_priority, classify_page_type, PageType};
use crate::url::{is_crawlable, normalize_url};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Default cap on links returned per page, applied after priority sorting
const DEFAULT_MAX_LINKS: usize = 100;

/// Priority for site-selector and pagination matches
const PRIORITY_FORCED_DETAIL: i32 = 100;
const PRIORITY_PAGINATION: i32 = 60;

/// Subsidy keywords used to boost PDF links by their anchor text
const PDF_BOOST_KEYWORDS: &[&str] = &["補助", "助成", "支援", "交付", "公募", "募集"];

/// One discovered link
#[derive(Debug, Clone)]
pub struct ExtractedLink {
    /// Normalized absolute URL
    pub url: String,

    /// Anchor text, trimmed
    pub text: String,

    pub priority: i32,

    pub page_type: PageType,
}

pub struct LinkExtractor {
    max_links: usize,
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINKS)
    }
}

impl LinkExtractor {
    pub fn new(max_links: usize) -> Self {
        Self { max_links }
    }

    /// Extracts, scores, and prioritizes crawlable links from a page
    ///
    /// Relative and protocol-relative hrefs resolve against the page's own
    /// URL; duplicates (by normalized URL) within the page are dropped, as
    /// are excluded schemes/extensions/keywords. The result is sorted by
    /// priority descending and truncated to `max_links`.
    pub fn extract_links(
        &self,
        html: &str,
        base_url: &Url,
        site: Option<&SiteSelectors>,
    ) -> Vec<ExtractedLink> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        // Site-specific selectors first so their forced priority wins dedup
        if let Some(site) = site {
            for selector_str in &site.detail_links {
                let Ok(selector) = Selector::parse(selector_str) else {
                    tracing::warn!("Invalid site selector: {}", selector_str);
                    continue;
                };
                for element in document.select(&selector) {
                    let Some(href) = element.value().attr("href") else {
                        continue;
                    };
                    let text = element.text().collect::<String>().trim().to_string();
                    if let Some(url) = resolve_and_admit(href, base_url, &mut seen) {
                        links.push(ExtractedLink {
                            url,
                            text,
                            priority: PRIORITY_FORCED_DETAIL,
                            page_type: PageType::Detail,
                        });
                    }
                }
            }
        }

        // Plain anchors; pagination-shaped anchors are left to
        // `extract_pagination_links`, which has its own depth rule
        if let Ok(anchors) = Selector::parse("a[href]") {
            for element in document.select(&anchors) {
                let Some(href) = element.value().attr("href") else {
                    continue;
                };
                let text = element.text().collect::<String>().trim().to_string();
                if is_pagination_text(&text) {
                    continue;
                }
                if let Some(url) = resolve_and_admit(href, base_url, &mut seen) {
                    let priority = calculate_priority(&text, &url);
                    let page_type = classify_page_type(&text, &url);
                    links.push(ExtractedLink {
                        url,
                        text,
                        priority,
                        page_type,
                    });
                }
            }
        }

        // SPA-style buttons carrying their destination in data-href
        if let Ok(buttons) = Selector::parse("[data-href], [role='link'][data-href]") {
            for element in document.select(&buttons) {
                let Some(href) = element.value().attr("data-href") else {
                    continue;
                };
                let text = element.text().collect::<String>().trim().to_string();
                if let Some(url) = resolve_and_admit(href, base_url, &mut seen) {
                    let priority = calculate_priority(&text, &url);
                    let page_type = classify_page_type(&text, &url);
                    links.push(ExtractedLink {
                        url,
                        text,
                        priority,
                        page_type,
                    });
                }
            }
        }

        links.sort_by(|a, b| b.priority.cmp(&a.priority));
        links.truncate(self.max_links);
        links
    }

    /// Extracts pagination links: numeric or "next" anchors inside
    /// pager-like containers
    pub fn extract_pagination_links(&self, html: &str, base_url: &Url) -> Vec<ExtractedLink> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        let containers = [
            ".pagination a[href]",
            ".pager a[href]",
            ".page-nav a[href]",
            "nav[aria-label] a[href]",
            "ul.page-numbers a[href]",
        ];

        for container in containers {
            let Ok(selector) = Selector::parse(container) else {
                continue;
            };
            for element in document.select(&selector) {
                let text = element.text().collect::<String>().trim().to_string();
                if !is_pagination_text(&text) {
                    continue;
                }
                let Some(href) = element.value().attr("href") else {
                    continue;
                };
                if let Some(url) = resolve_and_admit(href, base_url, &mut seen) {
                    links.push(ExtractedLink {
                        url,
                        text,
                        priority: PRIORITY_PAGINATION,
                        page_type: PageType::List,
                    });
                }
            }
        }

        links
    }

    /// Extracts links to PDF documents
    ///
    /// PDFs never enter the page queue; the engine feeds these to the PDF
    /// extractor directly. Priority is boosted when the anchor text
    /// mentions subsidies.
    pub fn extract_pdf_links(&self, html: &str, base_url: &Url) -> Vec<ExtractedLink> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        let Ok(selector) = Selector::parse("a[href]") else {
            return links;
        };

        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Ok(resolved) = base_url.join(href.trim()) else {
                continue;
            };
            if !resolved.path().to_lowercase().ends_with(".pdf") {
                continue;
            }
            let Ok(url) = normalize_url(resolved.as_str()) else {
                continue;
            };
            if !seen.insert(url.clone()) {
                continue;
            }

            let text = element.text().collect::<String>().trim().to_string();
            let boosted = PDF_BOOST_KEYWORDS.iter().any(|kw| text.contains(kw));
            links.push(ExtractedLink {
                url,
                text,
                priority: if boosted { 80 } else { 40 },
                page_type: PageType::Detail,
            });
        }

        links.sort_by(|a, b| b.priority.cmp(&a.priority));
        links
    }
}

/// Resolves an href against the page URL and runs it through the
/// admission rules, recording it in the page-local dedup set
fn resolve_and_admit(href: &str, base_url: &Url, seen: &mut HashSet<String>) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let resolved = base_url.join(href).ok()?;
    let normalized = normalize_url(resolved.as_str()).ok()?;

    if !is_crawlable(&normalized) {
        return None;
    }
    if !seen.insert(normalized.clone()) {
        return None;
    }

    Some(normalized)
}

fn is_pagination_text(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().all(|c| c.is_ascii_digit()) && !trimmed.is_empty() {
        return true;
    }
    const NEXT_WORDS: &[&str] = &["次へ", "次の", "次ページ", "next", "Next", ">", "»"];
    NEXT_WORDS.iter().any(|w| trimmed.contains(w))
}
