//! Structured-field extraction
//!
//! Three extractors share one text engine: the link extractor discovers
//! and scores outbound links, the subsidy extractor pulls structured
//! fields out of HTML detail pages, and the PDF extractor does the same
//! for PDF documents.

mod links;
mod pdf;
mod subsidy;
mod text;

pub use links::{ExtractedLink, LinkExtractor};
pub use pdf::PdfExtractor;
pub use subsidy::SubsidyExtractor;
pub use text::{AmountCandidate, AmountKind, SubsidyRate, TextExtractor};

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

/// Maximum characters of page text carried in a `SubsidyInfo` excerpt
const RAW_EXCERPT_LEN: usize = 2000;

/// A partial subsidy record extracted from one page or document
///
/// Transient: the engine converts it into a persistable record before
/// appending it to the run's results.
#[derive(Debug, Clone)]
pub struct SubsidyInfo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub max_amount: Option<u64>,
    pub subsidy_rate: Option<SubsidyRate>,
    pub application_start: Option<NaiveDate>,
    pub application_end: Option<NaiveDate>,
    pub target_area: Option<String>,
    pub organization: Option<String>,
    pub is_recruitment_ended: bool,
    pub source_url: String,
    pub raw_excerpt: String,
    /// 0-100 score; a downstream ranking signal, never a hard filter
    pub confidence: u8,
}

impl SubsidyInfo {
    pub(crate) fn excerpt_of(text: &str) -> String {
        text.chars().take(RAW_EXCERPT_LEN).collect()
    }
}

/// Collects the visible text of an HTML document
///
/// Script, style, and noscript subtrees are excluded; text nodes are
/// joined with single spaces.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(body) = Selector::parse("body") else {
        return String::new();
    };

    let mut out = String::new();
    if let Some(body_el) = document.select(&body).next() {
        push_visible_text(body_el, &mut out);
    }
    out.trim_end().to_string()
}

fn push_visible_text(el: ElementRef, out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push_str(trimmed);
                out.push(' ');
            }
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if name != "script" && name != "style" && name != "noscript" {
                push_visible_text(child_el, out);
            }
        }
    }
}
