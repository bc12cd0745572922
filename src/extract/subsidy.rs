//! Subsidy-page field extraction
//!
//! Classifies a page as a subsidy page only when its body text carries at
//! least two distinct subsidy-indicator keywords (a cheap precision
//! filter against unrelated government pages), then extracts title,
//! description, amount, rate, dates, and status, scoring the result with
//! a 0-100 confidence value.

use crate::config::SiteSelectors;
use crate::extract::text::TextExtractor;
use crate::extract::{visible_text, SubsidyInfo};
use chrono::NaiveDate;
use scraper::{Html, Selector};
use std::sync::Arc;

/// A page needs this many distinct indicator keywords to qualify
const MIN_INDICATOR_KEYWORDS: usize = 2;

/// Title length bounds, in characters
const TITLE_MIN_CHARS: usize = 5;
const TITLE_MAX_CHARS: usize = 200;

/// Description cap, in characters
const DESCRIPTION_MAX_CHARS: usize = 1000;

const INDICATOR_KEYWORDS: &[&str] = &[
    "補助金",
    "助成金",
    "支援金",
    "交付金",
    "給付金",
    "補助率",
    "補助対象",
    "助成対象",
    "補助上限",
    "申請期間",
    "募集期間",
    "公募",
    "申請方法",
];

/// Containers tried, in order, for description text
const CONTENT_SELECTORS: &[&str] = &["main", "article", ".content", "#content", "#main"];

/// Boilerplate markers; lines containing one are stripped from descriptions
const BOILERPLATE_MARKERS: &[&str] = &[
    "copyright",
    "all rights reserved",
    "©",
    "プライバシーポリシー",
    "サイトマップ",
    "javascript",
    "cookie",
];

/// Prefecture names for target-area detection, checked in page text
const PREFECTURES: &[&str] = &[
    "北海道", "青森県", "岩手県", "宮城県", "秋田県", "山形県", "福島県", "茨城県", "栃木県",
    "群馬県", "埼玉県", "千葉県", "東京都", "神奈川県", "新潟県", "富山県", "石川県", "福井県",
    "山梨県", "長野県", "岐阜県", "静岡県", "愛知県", "三重県", "滋賀県", "京都府", "大阪府",
    "兵庫県", "奈良県", "和歌山県", "鳥取県", "島根県", "岡山県", "広島県", "山口県", "徳島県",
    "香川県", "愛媛県", "高知県", "福岡県", "佐賀県", "長崎県", "熊本県", "大分県", "宮崎県",
    "鹿児島県", "沖縄県",
];

pub struct SubsidyExtractor {
    text_engine: Arc<TextExtractor>,
}

impl SubsidyExtractor {
    pub fn new(text_engine: Arc<TextExtractor>) -> Self {
        Self { text_engine }
    }

    /// Attempts structured extraction from an HTML page
    ///
    /// Returns `None` when the page does not qualify as a subsidy page;
    /// that is a normal outcome, not an error.
    pub fn extract(
        &self,
        html: &str,
        url: &str,
        site: Option<&SiteSelectors>,
        today: NaiveDate,
    ) -> Option<SubsidyInfo> {
        let text = visible_text(html);
        if !is_subsidy_page(&text) {
            return None;
        }

        let document = Html::parse_document(html);

        let title = extract_title(&document, site);
        let description = extract_description(&document, &text, title.as_deref());

        let max_amount = self.text_engine.extract_amount(&text);
        let subsidy_rate = self.text_engine.extract_rate(&text);
        let application_end = self.text_engine.extract_deadline(&text, today);
        let application_start = self.text_engine.extract_start_date(&text, today);
        let is_recruitment_ended = self.text_engine.is_recruitment_ended(&text);

        let target_area = PREFECTURES
            .iter()
            .find(|pref| text.contains(**pref))
            .map(|s| s.to_string());
        let organization = extract_organization(&text);

        let confidence = score_confidence(
            title.is_some(),
            max_amount.is_some(),
            application_end.is_some(),
            subsidy_rate.is_some(),
            description.as_deref(),
        );

        Some(SubsidyInfo {
            title,
            description,
            max_amount,
            subsidy_rate,
            application_start,
            application_end,
            target_area,
            organization,
            is_recruitment_ended,
            source_url: url.to_string(),
            raw_excerpt: SubsidyInfo::excerpt_of(&text),
            confidence,
        })
    }
}

/// Precision gate: require two distinct indicator keywords
fn is_subsidy_page(text: &str) -> bool {
    INDICATOR_KEYWORDS
        .iter()
        .filter(|kw| text.contains(**kw))
        .count()
        >= MIN_INDICATOR_KEYWORDS
}

/// Extracts a title: site selectors, then h1, then the cleaned title tag
///
/// The first candidate of 5-200 characters wins.
fn extract_title(document: &Html, site: Option<&SiteSelectors>) -> Option<String> {
    let mut candidates: Vec<String> = Vec::new();
    if let Some(site) = site {
        candidates.extend(site.title.iter().cloned());
    }
    candidates.push("h1".to_string());

    for selector_str in &candidates {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        for element in document.select(&selector) {
            let text = element.text().collect::<String>().trim().to_string();
            if title_length_ok(&text) {
                return Some(text);
            }
        }
    }

    // Fall back to <title>, stripping a trailing "| sitename" suffix
    let title_selector = Selector::parse("title").ok()?;
    let raw = document
        .select(&title_selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())?;
    let cleaned = clean_title_tag(&raw);
    title_length_ok(&cleaned).then_some(cleaned)
}

fn title_length_ok(title: &str) -> bool {
    let len = title.chars().count();
    (TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&len)
}

/// Strips a trailing site-name suffix from a title-tag value
fn clean_title_tag(raw: &str) -> String {
    let mut title = raw.trim().to_string();
    for separator in ["|", "｜", "：", " - ", "−"] {
        if let Some(idx) = title.rfind(separator) {
            let head = title[..idx].trim();
            if head.chars().count() >= TITLE_MIN_CHARS {
                title = head.to_string();
            }
        }
    }
    title
}

/// Builds a description from the main content, stripped of boilerplate
fn extract_description(document: &Html, body_text: &str, title: Option<&str>) -> Option<String> {
    let mut content = None;
    for selector_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = element
                .text()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if text.chars().count() >= 50 {
                content = Some(text);
                break;
            }
        }
    }

    let mut text = content.unwrap_or_else(|| body_text.to_string());

    // Drop boilerplate fragments
    text = text
        .split(['。', '\n'])
        .filter(|fragment| {
            let lower = fragment.to_lowercase();
            !BOILERPLATE_MARKERS.iter().any(|m| lower.contains(m))
        })
        .collect::<Vec<_>>()
        .join("。");

    // The title is reported separately; remove its occurrence
    if let Some(title) = title {
        text = text.replace(title, "");
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated: String = collapsed.chars().take(DESCRIPTION_MAX_CHARS).collect();
    let trimmed = truncated.trim().to_string();

    (!trimmed.is_empty()).then_some(trimmed)
}

/// Pulls an implementing-organization name from marker-led phrases
fn extract_organization(text: &str) -> Option<String> {
    for marker in ["実施機関", "実施主体", "お問い合わせ先", "問い合わせ先", "担当"] {
        if let Some(idx) = text.find(marker) {
            let after = &text[idx + marker.len()..];
            let after = after.trim_start_matches([':', '：', ' ', '　']);
            let name: String = after
                .chars()
                .take_while(|c| !matches!(c, '、' | '。' | ' ' | '　' | '\n' | '(' | '（'))
                .collect();
            let len = name.chars().count();
            if (2..=40).contains(&len) {
                return Some(name);
            }
        }
    }
    None
}

fn score_confidence(
    has_title: bool,
    has_amount: bool,
    has_deadline: bool,
    has_rate: bool,
    description: Option<&str>,
) -> u8 {
    let mut score = 0u32;
    if has_title {
        score += 30;
    }
    if has_amount {
        score += 20;
    }
    if has_deadline {
        score += 15;
    }
    if has_rate {
        score += 15;
    }
    if let Some(desc) = description {
        // Up to 20 points, one per 50 characters of description
        score += (desc.chars().count() / 50).min(20) as u32;
    }
    score.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::SubsidyRate;

    fn extractor() -> SubsidyExtractor {
        SubsidyExtractor::new(Arc::new(TextExtractor::new()))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    const DETAIL_PAGE: &str = r#"<html>
<head><title>小規模事業者持続化補助金 | 東京都産業労働局</title></head>
<body>
<main>
<h1>小規模事業者持続化補助金（一般型）</h1>
<p>販路開拓に取り組む小規模事業者を支援します。補助対象は広報費、設備費等です。</p>
<p>補助上限額は50万円、補助率は3分の2です。</p>
<p>申請期限: 令和7年10月31日</p>
<p>実施機関: 東京都中小企業振興公社</p>
</main>
</body></html>"#;

    #[test]
    fn test_full_detail_extraction() {
        let info = extractor()
            .extract(DETAIL_PAGE, "https://example.go.jp/subsidy/1", None, today())
            .unwrap();

        assert_eq!(
            info.title.as_deref(),
            Some("小規模事業者持続化補助金（一般型）")
        );
        assert_eq!(info.max_amount, Some(500_000));
        assert_eq!(
            info.subsidy_rate,
            Some(SubsidyRate::Fraction {
                numerator: 2,
                denominator: 3
            })
        );
        assert_eq!(
            info.application_end,
            NaiveDate::from_ymd_opt(2025, 10, 31)
        );
        assert_eq!(info.target_area.as_deref(), Some("東京都"));
        assert_eq!(
            info.organization.as_deref(),
            Some("東京都中小企業振興公社")
        );
        assert!(!info.is_recruitment_ended);
        assert!(info.confidence >= 80);
    }

    #[test]
    fn test_non_subsidy_page_rejected() {
        // One indicator keyword is not enough
        let html = r#"<html><body><main><h1>庁舎のご案内</h1>
            <p>開庁時間は平日8時30分からです。公募情報は別ページをご覧ください。</p>
        </main></body></html>"#;
        assert!(extractor()
            .extract(html, "https://example.go.jp/about", None, today())
            .is_none());
    }

    #[test]
    fn test_title_from_title_tag_with_suffix_stripped() {
        let html = r#"<html>
<head><title>設備投資促進助成金のご案内 | 県庁公式サイト</title></head>
<body><p>助成金の公募を行います。補助率は2分の1です。</p></body></html>"#;
        let info = extractor()
            .extract(html, "https://example.go.jp/x", None, today())
            .unwrap();
        assert_eq!(info.title.as_deref(), Some("設備投資促進助成金のご案内"));
    }

    #[test]
    fn test_site_selector_title_wins() {
        let html = r#"<html>
<head><title>ページタイトル | サイト</title></head>
<body><h1>汎用見出しテキスト</h1><div class="subsidy-name">創業支援補助金（特別枠）</div>
<p>補助金の公募情報。補助対象は設備費。</p></body></html>"#;
        let site = SiteSelectors {
            title: vec![".subsidy-name".to_string()],
            detail_links: vec![],
        };
        let info = extractor()
            .extract(html, "https://example.go.jp/x", Some(&site), today())
            .unwrap();
        assert_eq!(info.title.as_deref(), Some("創業支援補助金（特別枠）"));
    }

    #[test]
    fn test_recruitment_ended_page_still_extracts() {
        let html = r#"<html><body><main>
<h1>令和6年度 省エネ設備導入補助金</h1>
<p>募集は終了しました。補助上限額は100万円、補助率は2分の1でした。</p>
</main></body></html>"#;
        let info = extractor()
            .extract(html, "https://example.go.jp/x", None, today())
            .unwrap();
        assert!(info.is_recruitment_ended);
        assert_eq!(info.max_amount, Some(1_000_000));
    }

    #[test]
    fn test_description_strips_title_and_boilerplate() {
        let html = r#"<html><body><main>
<h1>検証用の補助金制度名称</h1>
<p>検証用の補助金制度名称は設備導入を支援する助成金です。</p>
<p>Copyright 2025 Example Pref. All Rights Reserved.</p>
</main></body></html>"#;
        let info = extractor()
            .extract(html, "https://example.go.jp/x", None, today())
            .unwrap();
        let desc = info.description.unwrap();
        assert!(!desc.contains("検証用の補助金制度名称"));
        assert!(!desc.to_lowercase().contains("copyright"));
    }

    #[test]
    fn test_confidence_scoring_components() {
        assert_eq!(score_confidence(true, true, true, true, None), 80);
        assert_eq!(score_confidence(true, false, false, false, None), 30);
        let long_desc = "あ".repeat(1000);
        assert_eq!(
            score_confidence(true, true, true, true, Some(&long_desc)),
            100
        );
        assert_eq!(score_confidence(false, false, false, false, None), 0);
    }
}
