//! PDF document extraction
//!
//! Government subsidy programs routinely publish the authoritative details
//! (募集要項) only as PDF. This extractor pulls the text layer out of a
//! fetched document and runs the same field extraction as the HTML path.

use crate::extract::text::TextExtractor;
use crate::extract::SubsidyInfo;
use chrono::NaiveDate;
use std::sync::Arc;

/// A PDF needs this many distinct indicator keywords to qualify,
/// mirroring the HTML precision gate
const MIN_INDICATOR_KEYWORDS: usize = 2;

const INDICATOR_KEYWORDS: &[&str] = &[
    "補助金",
    "助成金",
    "支援金",
    "交付金",
    "給付金",
    "補助率",
    "補助対象",
    "公募",
    "募集要項",
];

const TITLE_MIN_CHARS: usize = 5;
const TITLE_MAX_CHARS: usize = 200;

pub struct PdfExtractor {
    text_engine: Arc<TextExtractor>,
}

impl PdfExtractor {
    pub fn new(text_engine: Arc<TextExtractor>) -> Self {
        Self { text_engine }
    }

    /// Attempts structured extraction from raw PDF bytes
    ///
    /// Returns `None` when the document has no extractable text layer or
    /// does not qualify as subsidy material; both are normal outcomes.
    pub fn extract(&self, data: &[u8], url: &str, today: NaiveDate) -> Option<SubsidyInfo> {
        let text = match pdf_extract::extract_text_from_mem(data) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("PDF text extraction failed for {}: {}", url, e);
                return None;
            }
        };

        let keyword_hits = INDICATOR_KEYWORDS
            .iter()
            .filter(|kw| text.contains(**kw))
            .count();
        if keyword_hits < MIN_INDICATOR_KEYWORDS {
            return None;
        }

        let title = extract_pdf_title(&text);

        let max_amount = self.text_engine.extract_amount(&text);
        let subsidy_rate = self.text_engine.extract_rate(&text);
        let application_end = self.text_engine.extract_deadline(&text, today);
        let application_start = self.text_engine.extract_start_date(&text, today);
        let is_recruitment_ended = self.text_engine.is_recruitment_ended(&text);

        let mut confidence = 0u32;
        if title.is_some() {
            confidence += 30;
        }
        if max_amount.is_some() {
            confidence += 20;
        }
        if application_end.is_some() {
            confidence += 15;
        }
        if subsidy_rate.is_some() {
            confidence += 15;
        }

        Some(SubsidyInfo {
            title,
            description: None,
            max_amount,
            subsidy_rate,
            application_start,
            application_end,
            target_area: None,
            organization: None,
            is_recruitment_ended,
            source_url: url.to_string(),
            raw_excerpt: SubsidyInfo::excerpt_of(&text),
            confidence: confidence.min(100) as u8,
        })
    }
}

/// The first reasonably sized non-empty line doubles as the title
fn extract_pdf_title(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|line| {
            let len = line.chars().count();
            (TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&len)
        })
}
