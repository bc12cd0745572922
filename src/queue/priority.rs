//! Lexical priority scoring for discovered links
//!
//! The crawler has no global link-graph signal, so locally visible anchor
//! text and the URL itself are the only ranking features available cheaply.
//! Keywords are checked tier by tier; the first tier with a hit wins.

use crate::queue::PageType;

/// Keywords marking application/detail pages (highest tier)
const DETAIL_KEYWORDS: &[&str] = &[
    "申請",
    "応募",
    "募集要項",
    "公募要領",
    "交付要綱",
    "詳細",
    "詳しく",
    "detail",
    "apply",
    "youryou",
];

/// Keywords from the subsidy domain itself
const SUBSIDY_KEYWORDS: &[&str] = &[
    "補助金",
    "助成金",
    "支援金",
    "交付金",
    "給付金",
    "奨励金",
    "hojokin",
    "josei",
    "subsidy",
];

/// Keywords marking listing or search pages
const LISTING_KEYWORDS: &[&str] = &["一覧", "検索", "募集中", "list", "search", "ichiran"];

/// Keywords marking news/announcement pages (often stale listings)
const NEWS_KEYWORDS: &[&str] = &["新着", "お知らせ", "ニュース", "news", "topics", "whatsnew"];

const PRIORITY_DETAIL: i32 = 100;
const PRIORITY_SUBSIDY: i32 = 80;
const PRIORITY_LISTING: i32 = 60;
const PRIORITY_NEWS: i32 = 40;
const PRIORITY_DEFAULT: i32 = 20;

/// Scores a link by its anchor text and URL
///
/// Tiers (first hit wins): detail/application 100 > subsidy domain 80 >
/// listing/search 60 > news 40 > default 20.
pub fn calculate_priority(link_text: &str, url: &str) -> i32 {
    let text = link_text.to_lowercase();
    let url = url.to_lowercase();

    let hit = |keywords: &[&str]| keywords.iter().any(|kw| text.contains(kw) || url.contains(kw));

    if hit(DETAIL_KEYWORDS) {
        PRIORITY_DETAIL
    } else if hit(SUBSIDY_KEYWORDS) {
        PRIORITY_SUBSIDY
    } else if hit(LISTING_KEYWORDS) {
        PRIORITY_LISTING
    } else if hit(NEWS_KEYWORDS) {
        PRIORITY_NEWS
    } else {
        PRIORITY_DEFAULT
    }
}

/// Classifies a link into a coarse page type from the same lexical signals
pub fn classify_page_type(link_text: &str, url: &str) -> PageType {
    let text = link_text.to_lowercase();
    let url_lower = url.to_lowercase();

    let hit = |keywords: &[&str]| {
        keywords
            .iter()
            .any(|kw| text.contains(kw) || url_lower.contains(kw))
    };

    if hit(DETAIL_KEYWORDS) {
        PageType::Detail
    } else if hit(&["検索", "search"]) {
        PageType::Search
    } else if hit(LISTING_KEYWORDS) || hit(SUBSIDY_KEYWORDS) {
        PageType::List
    } else {
        PageType::Other
    }
}
