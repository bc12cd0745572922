//! URL handling module
//!
//! This module provides URL normalization, domain extraction, and the
//! exclusion rules (schemes, file extensions, keyword patterns) shared by
//! the queue and the link extractor.

mod normalize;

pub use normalize::normalize_url;

use url::Url;

/// File extensions that are never enqueued as crawlable pages.
///
/// PDF is included here on purpose: PDF documents are handled out of band
/// by the PDF extractor, not fetched through the page queue.
pub const EXCLUDED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "svg", "ico", "webp", "css", "js", "pdf", "doc", "docx", "xls",
    "xlsx", "ppt", "pptx", "zip", "gz", "tar", "rar", "7z", "mp3", "mp4", "avi", "mov", "exe",
];

/// URL substrings that mark pages with no subsidy content worth crawling
/// (login forms, contact pages, FAQ, legal boilerplate).
pub const EXCLUDED_KEYWORDS: &[&str] = &[
    "login",
    "logout",
    "signin",
    "signup",
    "register",
    "mypage",
    "cart",
    "contact",
    "inquiry",
    "otoiawase",
    "toiawase",
    "faq",
    "sitemap",
    "privacy",
    "policy",
    "terms",
    "accessibility",
    "mailmagazine",
    "calendar.ics",
];

/// Extracts the host (domain) from a URL string
///
/// # Returns
///
/// * `Some(String)` - The lowercased host
/// * `None` - The URL is malformed or has no host
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
}

/// Returns true if the URL uses a scheme the crawler can fetch
///
/// `javascript:`, `mailto:`, `tel:`, `data:` and anything else that is not
/// plain HTTP(S) is rejected.
pub fn is_fetchable_scheme(url: &str) -> bool {
    match Url::parse(url) {
        Ok(u) => u.scheme() == "http" || u.scheme() == "https",
        Err(_) => false,
    }
}

/// Returns true if the URL path ends in an excluded file extension
pub fn has_excluded_extension(url: &str) -> bool {
    let path = match Url::parse(url) {
        Ok(u) => u.path().to_lowercase(),
        Err(_) => return false,
    };
    match path.rsplit_once('.') {
        Some((_, ext)) => EXCLUDED_EXTENSIONS.contains(&ext),
        None => false,
    }
}

/// Returns true if the URL contains an excluded keyword
///
/// Matching is case-insensitive over the full URL string.
pub fn contains_excluded_keyword(url: &str) -> bool {
    let lower = url.to_lowercase();
    EXCLUDED_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Returns true if the URL passes every admission rule for the queue
pub fn is_crawlable(url: &str) -> bool {
    is_fetchable_scheme(url) && !has_excluded_extension(url) && !contains_excluded_keyword(url)
}
