//! Japanese text extraction engine
//!
//! Pulls amounts, subsidy rates, application dates, and recruitment-ended
//! signals out of free-form Japanese prose. Multiple candidate matches can
//! legitimately appear on one page; the selection policy differs per field
//! and is part of the contract:
//!
//! - Amounts: every pattern's matches are collected and the **maximum**
//!   numeric value wins. Pages often state a small per-item amount next to
//!   a large aggregate figure, and the product prefers the ceiling.
//! - Rates: the single **highest-priority** pattern match wins.
//! - Dates: patterns are tried in priority order and the **first** match
//!   short-circuits.
//!
//! Every extractor returns `None` on no-match; "nothing found" is a normal
//! outcome, never an error.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::fmt;

/// Amounts at or above this are rejected as noise (1000億円)
const MAX_VALID_AMOUNT: u64 = 100_000_000_000;

/// Semantic tag for an amount pattern family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountKind {
    /// 上限/限度額 with an explicit cap label
    UpperLimit,
    /// 補助金額/助成額 labeled amounts
    NamedAmount,
    /// 最大/最高 prefixed
    Maximum,
    /// 億-scale figures, possibly compound (1億5000万円)
    OkuScale,
    /// Right side of an amount range
    RangeMax,
    /// Per-audience corporate figure
    Corporate,
    /// Per-audience individual figure
    Individual,
    /// Periodic monthly figure
    Monthly,
    /// Periodic yearly figure
    Yearly,
    /// N円まで / を上限 suffix form
    UpToSuffix,
    /// Amount inside 「」 quotes
    Quoted,
    /// Bare N円 fallback
    Generic,
}

/// One amount match, kept for attribution and per-audience segmentation
#[derive(Debug, Clone)]
pub struct AmountCandidate {
    pub amount: u64,
    pub raw: String,
    pub priority: u8,
    pub kind: AmountKind,
}

/// An extracted subsidy rate
#[derive(Debug, Clone, PartialEq)]
pub enum SubsidyRate {
    Fraction { numerator: u32, denominator: u32 },
    Percent(f64),
    /// 定額 (fixed amount, no rate)
    Fixed,
}

impl fmt::Display for SubsidyRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubsidyRate::Fraction {
                numerator,
                denominator,
            } => write!(f, "{}/{}", numerator, denominator),
            SubsidyRate::Percent(pct) => {
                if (pct.fract()).abs() < f64::EPSILON {
                    write!(f, "{}%", *pct as u64)
                } else {
                    write!(f, "{}%", pct)
                }
            }
            SubsidyRate::Fixed => write!(f, "定額"),
        }
    }
}

enum DateForm {
    /// 令和N年M月D日 (元年 = 2019)
    Era,
    /// YYYY年M月D日
    Western,
    /// M月D日 with the year inferred from "today"
    MonthDay,
}

struct AmountPattern {
    regex: Regex,
    priority: u8,
    kind: AmountKind,
}

enum RateKind {
    /// N分のM: denominator comes first lexically (3分の1 = 1/3)
    Fraction,
    /// N/M slash form
    Slash,
    Percent,
    Fixed,
}

struct RatePattern {
    regex: Regex,
    priority: u8,
    kind: RateKind,
}

struct DatePattern {
    regex: Regex,
    form: DateForm,
}

/// Compiled pattern sets; construct once and share between extractors
pub struct TextExtractor {
    amount_patterns: Vec<AmountPattern>,
    rate_patterns: Vec<RatePattern>,
    deadline_patterns: Vec<DatePattern>,
    start_patterns: Vec<DatePattern>,
    ended_patterns: Vec<Regex>,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextExtractor {
    pub fn new() -> Self {
        let re = |pattern: &str| Regex::new(pattern).expect("pattern set is statically valid");

        let amount_patterns = vec![
            AmountPattern {
                regex: re(r"(?:上限額?|限度額|補助上限額?|助成上限額?)(?:は|:)?\s*(?:最大)?\s*([0-9][0-9,]*)\s*(億|万)?円"),
                priority: 100,
                kind: AmountKind::UpperLimit,
            },
            AmountPattern {
                regex: re(r"(?:補助金額|補助額|助成金額|助成額|交付額|支援額)(?:は|:)?\s*(?:最大|上限)?\s*([0-9][0-9,]*)\s*(億|万)?円"),
                priority: 95,
                kind: AmountKind::NamedAmount,
            },
            AmountPattern {
                regex: re(r"(?:最大|最高)\s*([0-9][0-9,]*)\s*(億|万)?円"),
                priority: 92,
                kind: AmountKind::Maximum,
            },
            AmountPattern {
                // Two captures: 億 part and optional 万 part
                regex: re(r"([0-9][0-9,]*)億(?:([0-9][0-9,]*)万)?円"),
                priority: 90,
                kind: AmountKind::OkuScale,
            },
            AmountPattern {
                // Capture only the right-hand side of the range
                regex: re(r"[0-9][0-9,]*\s*(?:億|万)?円\s*[~〜～-]\s*([0-9][0-9,]*)\s*(億|万)?円"),
                priority: 85,
                kind: AmountKind::RangeMax,
            },
            AmountPattern {
                regex: re(r"法人(?:の場合)?(?:は|:)?\s*([0-9][0-9,]*)\s*(億|万)?円"),
                priority: 80,
                kind: AmountKind::Corporate,
            },
            AmountPattern {
                regex: re(r"個人(?:事業主)?(?:の場合)?(?:は|:)?\s*([0-9][0-9,]*)\s*(億|万)?円"),
                priority: 80,
                kind: AmountKind::Individual,
            },
            AmountPattern {
                regex: re(r"月額\s*([0-9][0-9,]*)\s*(億|万)?円"),
                priority: 75,
                kind: AmountKind::Monthly,
            },
            AmountPattern {
                regex: re(r"年額\s*([0-9][0-9,]*)\s*(億|万)?円"),
                priority: 75,
                kind: AmountKind::Yearly,
            },
            AmountPattern {
                regex: re(r"([0-9][0-9,]*)\s*(億|万)?円\s*(?:まで|を上限|以内)"),
                priority: 70,
                kind: AmountKind::UpToSuffix,
            },
            AmountPattern {
                regex: re(r"「[^」]*?([0-9][0-9,]*)\s*(億|万)?円[^」]*?」"),
                priority: 60,
                kind: AmountKind::Quoted,
            },
            AmountPattern {
                regex: re(r"([0-9][0-9,]*)\s*(億|万)?円"),
                priority: 50,
                kind: AmountKind::Generic,
            },
        ];

        let rate_patterns = vec![
            RatePattern {
                regex: re(r"補助率(?:は|:)?\s*([0-9]+)分の([0-9]+)"),
                priority: 100,
                kind: RateKind::Fraction,
            },
            RatePattern {
                regex: re(r"補助率(?:は|:)?\s*([0-9]+(?:\.[0-9]+)?)\s*(?:%|％|パーセント)"),
                priority: 95,
                kind: RateKind::Percent,
            },
            RatePattern {
                regex: re(r"補助率(?:は|:)?\s*([0-9]+)\s*/\s*([0-9]+)"),
                priority: 90,
                kind: RateKind::Slash,
            },
            RatePattern {
                regex: re(r"(?:助成率|負担率)(?:は|:)?\s*([0-9]+)分の([0-9]+)"),
                priority: 85,
                kind: RateKind::Fraction,
            },
            RatePattern {
                regex: re(r"([0-9]+)分の([0-9]+)"),
                priority: 80,
                kind: RateKind::Fraction,
            },
            RatePattern {
                // The surrounding character classes keep date-like M/D and
                // 年/月 counters out; plausibility is checked after capture
                regex: re(r"(?:^|[^0-9/月年第])([0-9])\s*/\s*([0-9]{1,2})(?:[^0-9/日]|$)"),
                priority: 70,
                kind: RateKind::Slash,
            },
            RatePattern {
                regex: re(r"([0-9]+(?:\.[0-9]+)?)\s*(?:%|％|パーセント)"),
                priority: 60,
                kind: RateKind::Percent,
            },
            RatePattern {
                regex: re(r"定額"),
                priority: 50,
                kind: RateKind::Fixed,
            },
        ];

        let weekday = r"(?:\s*[（(][^）)]{1,3}[）)])?";
        let markers = r"(?:まで|必着|締切|締め切り|〆切)";
        let lead = r"(?:締切|締め切り|〆切|申請期限|応募期限|提出期限|申込期限|期限)[^0-9令]{0,10}";

        let deadline_patterns = vec![
            DatePattern {
                regex: re(&format!(
                    r"令和(元|[0-9]{{1,2}})年\s*([0-9]{{1,2}})月\s*([0-9]{{1,2}})日{weekday}\s*{markers}"
                )),
                form: DateForm::Era,
            },
            DatePattern {
                regex: re(&format!(
                    r"{lead}令和(元|[0-9]{{1,2}})年\s*([0-9]{{1,2}})月\s*([0-9]{{1,2}})日"
                )),
                form: DateForm::Era,
            },
            DatePattern {
                regex: re(&format!(
                    r"([0-9]{{4}})年\s*([0-9]{{1,2}})月\s*([0-9]{{1,2}})日{weekday}\s*{markers}"
                )),
                form: DateForm::Western,
            },
            DatePattern {
                regex: re(&format!(
                    r"{lead}([0-9]{{4}})年\s*([0-9]{{1,2}})月\s*([0-9]{{1,2}})日"
                )),
                form: DateForm::Western,
            },
            DatePattern {
                regex: re(&format!(
                    r"([0-9]{{1,2}})月\s*([0-9]{{1,2}})日{weekday}\s*{markers}"
                )),
                form: DateForm::MonthDay,
            },
            // Bare dates, lowest priority: callers feed field-scoped text
            DatePattern {
                regex: re(r"令和(元|[0-9]{1,2})年\s*([0-9]{1,2})月\s*([0-9]{1,2})日"),
                form: DateForm::Era,
            },
            DatePattern {
                regex: re(r"([0-9]{4})年\s*([0-9]{1,2})月\s*([0-9]{1,2})日"),
                form: DateForm::Western,
            },
        ];

        let start_lead = r"(?:受付開始|申請受付|募集開始|申請開始|公募開始)[^0-9令]{0,10}";
        let start_patterns = vec![
            DatePattern {
                regex: re(&format!(
                    r"令和(元|[0-9]{{1,2}})年\s*([0-9]{{1,2}})月\s*([0-9]{{1,2}})日{weekday}\s*から"
                )),
                form: DateForm::Era,
            },
            DatePattern {
                regex: re(&format!(
                    r"{start_lead}令和(元|[0-9]{{1,2}})年\s*([0-9]{{1,2}})月\s*([0-9]{{1,2}})日"
                )),
                form: DateForm::Era,
            },
            DatePattern {
                regex: re(&format!(
                    r"([0-9]{{4}})年\s*([0-9]{{1,2}})月\s*([0-9]{{1,2}})日{weekday}\s*から"
                )),
                form: DateForm::Western,
            },
            DatePattern {
                regex: re(&format!(
                    r"{start_lead}([0-9]{{4}})年\s*([0-9]{{1,2}})月\s*([0-9]{{1,2}})日"
                )),
                form: DateForm::Western,
            },
            DatePattern {
                regex: re(&format!(
                    r"([0-9]{{1,2}})月\s*([0-9]{{1,2}})日{weekday}\s*から"
                )),
                form: DateForm::MonthDay,
            },
        ];

        let ended_patterns = vec![
            re(r"募集(?:は|を)?\s*終了"),
            re(r"受付(?:は|を)?\s*終了"),
            re(r"受け?付け?(?:は|を)?\s*終了\s*(?:しました|いたしました)"),
            re(r"申請(?:は|を)?\s*終了"),
            re(r"公募(?:は|を)?\s*終了"),
            re(r"締め?切りました"),
            re(r"令和[0-9元]{1,2}年度.*募集.*終了"),
            re(r"今年度の募集は行って(?:いま|おりま)せん"),
        ];

        Self {
            amount_patterns,
            rate_patterns,
            deadline_patterns,
            start_patterns,
            ended_patterns,
        }
    }

    /// Extracts the reported maximum amount in yen
    ///
    /// The maximum numeric value across all candidates wins, regardless of
    /// which pattern produced it. Pattern priorities exist for attribution
    /// and per-audience segmentation, not for selection.
    pub fn extract_amount(&self, text: &str) -> Option<u64> {
        self.extract_amount_candidates(text)
            .into_iter()
            .map(|c| c.amount)
            .max()
    }

    /// Collects every valid amount match across every pattern
    pub fn extract_amount_candidates(&self, text: &str) -> Vec<AmountCandidate> {
        let text = preprocess(text);
        let mut candidates = Vec::new();

        for pattern in &self.amount_patterns {
            for caps in pattern.regex.captures_iter(&text) {
                let amount = match pattern.kind {
                    AmountKind::OkuScale => {
                        let oku = caps.get(1).and_then(|m| parse_number(m.as_str()));
                        let man = caps.get(2).map_or(Some(0), |m| parse_number(m.as_str()));
                        match (oku, man) {
                            (Some(oku), Some(man)) => oku
                                .checked_mul(100_000_000)
                                .and_then(|v| v.checked_add(man.saturating_mul(10_000))),
                            _ => None,
                        }
                    }
                    _ => {
                        let number = caps.get(1).and_then(|m| parse_number(m.as_str()));
                        let unit = caps.get(2).map(|m| m.as_str());
                        number.and_then(|n| apply_unit(n, unit))
                    }
                };

                if let Some(amount) = amount {
                    if amount > 0 && amount < MAX_VALID_AMOUNT {
                        candidates.push(AmountCandidate {
                            amount,
                            raw: caps.get(0).map_or(String::new(), |m| m.as_str().to_string()),
                            priority: pattern.priority,
                            kind: pattern.kind,
                        });
                    }
                }
            }
        }

        candidates
    }

    /// Extracts the subsidy rate; the highest-priority match wins
    pub fn extract_rate(&self, text: &str) -> Option<SubsidyRate> {
        let text = preprocess(text);

        for pattern in &self.rate_patterns {
            for caps in pattern.regex.captures_iter(&text) {
                let rate = match pattern.kind {
                    RateKind::Fraction => {
                        // N分のM reads "M out of N": denominator first
                        let den: u32 = caps.get(1)?.as_str().parse().ok()?;
                        let num: u32 = caps.get(2)?.as_str().parse().ok()?;
                        valid_fraction(num, den)
                    }
                    RateKind::Slash => {
                        let num: u32 = caps.get(1)?.as_str().parse().ok()?;
                        let den: u32 = caps.get(2)?.as_str().parse().ok()?;
                        valid_fraction(num, den)
                    }
                    RateKind::Percent => {
                        let pct: f64 = caps.get(1)?.as_str().parse().ok()?;
                        if pct > 0.0 && pct <= 100.0 {
                            Some(SubsidyRate::Percent(pct))
                        } else {
                            None
                        }
                    }
                    RateKind::Fixed => Some(SubsidyRate::Fixed),
                };

                if rate.is_some() {
                    return rate;
                }
            }
        }

        None
    }

    /// Extracts the application deadline
    ///
    /// `today` anchors year inference for year-omitted M月D日 forms: the
    /// date is placed in the current year unless it has already passed,
    /// in which case next year is assumed.
    pub fn extract_deadline(&self, text: &str, today: NaiveDate) -> Option<NaiveDate> {
        self.extract_date(&self.deadline_patterns, text, today)
    }

    /// Extracts the application start date
    pub fn extract_start_date(&self, text: &str, today: NaiveDate) -> Option<NaiveDate> {
        self.extract_date(&self.start_patterns, text, today)
    }

    fn extract_date(
        &self,
        patterns: &[DatePattern],
        text: &str,
        today: NaiveDate,
    ) -> Option<NaiveDate> {
        let text = preprocess(text);

        for pattern in patterns {
            for caps in pattern.regex.captures_iter(&text) {
                let date = match pattern.form {
                    DateForm::Era => {
                        let era_year = caps.get(1)?.as_str();
                        let n: i32 = if era_year == "元" {
                            1
                        } else {
                            era_year.parse().ok()?
                        };
                        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
                        let day: u32 = caps.get(3)?.as_str().parse().ok()?;
                        NaiveDate::from_ymd_opt(2018 + n, month, day)
                    }
                    DateForm::Western => {
                        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
                        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
                        let day: u32 = caps.get(3)?.as_str().parse().ok()?;
                        NaiveDate::from_ymd_opt(year, month, day)
                    }
                    DateForm::MonthDay => {
                        let month: u32 = caps.get(1)?.as_str().parse().ok()?;
                        let day: u32 = caps.get(2)?.as_str().parse().ok()?;
                        infer_year(month, day, today)
                    }
                };

                // First valid date in priority order short-circuits
                if date.is_some() {
                    return date;
                }
            }
        }

        None
    }

    /// True when any recruitment-ended phrase appears
    ///
    /// Independent of the numeric extractors; a single match is enough.
    pub fn is_recruitment_ended(&self, text: &str) -> bool {
        let text = preprocess(text);
        self.ended_patterns.iter().any(|p| p.is_match(&text))
    }
}

/// Normalizes text before pattern matching: full-width digits and
/// punctuation to half-width, all whitespace runs to single spaces
fn preprocess(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|ch| match ch {
            '０'..='９' => {
                char::from_u32(ch as u32 - '０' as u32 + '0' as u32).unwrap_or(ch)
            }
            '，' => ',',
            '．' => '.',
            '：' => ':',
            '／' => '/',
            '　' => ' ',
            _ => ch,
        })
        .collect();

    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_number(s: &str) -> Option<u64> {
    s.replace(',', "").parse().ok()
}

fn apply_unit(n: u64, unit: Option<&str>) -> Option<u64> {
    let multiplier = match unit {
        Some("億") => 100_000_000,
        Some("万") => 10_000,
        _ => 1,
    };
    n.checked_mul(multiplier)
}

fn valid_fraction(numerator: u32, denominator: u32) -> Option<SubsidyRate> {
    if numerator > 0 && denominator > 0 && numerator <= denominator && denominator <= 10 {
        Some(SubsidyRate::Fraction {
            numerator,
            denominator,
        })
    } else {
        None
    }
}

/// Places a year-omitted date relative to "today"
fn infer_year(month: u32, day: u32, today: NaiveDate) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
    match this_year {
        Some(date) if date < today => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
        Some(date) => Some(date),
        // Invalid in this year (e.g. Feb 29): try next year
        None => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> TextExtractor {
        TextExtractor::new()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_amount_max_wins_across_patterns() {
        // The labeled 上限 figure is smaller than a bare figure elsewhere;
        // the maximum across all candidates is reported
        let amount = engine()
            .extract_amount("上限500万円ですが、別途1000万円の枠もあります")
            .unwrap();
        assert_eq!(amount, 10_000_000);
    }

    #[test]
    fn test_amount_upper_limit() {
        assert_eq!(
            engine().extract_amount("補助上限額は300万円です"),
            Some(3_000_000)
        );
    }

    #[test]
    fn test_amount_with_commas() {
        assert_eq!(
            engine().extract_amount("助成額: 1,500万円"),
            Some(15_000_000)
        );
    }

    #[test]
    fn test_amount_full_width_digits() {
        assert_eq!(
            engine().extract_amount("上限５００万円"),
            Some(5_000_000)
        );
    }

    #[test]
    fn test_amount_oku_scale() {
        assert_eq!(engine().extract_amount("最大1億円"), Some(100_000_000));
    }

    #[test]
    fn test_amount_oku_compound() {
        assert_eq!(
            engine().extract_amount("総額1億5000万円"),
            Some(150_000_000)
        );
    }

    #[test]
    fn test_amount_range_takes_maximum() {
        assert_eq!(
            engine().extract_amount("補助額は50万円〜200万円"),
            Some(2_000_000)
        );
    }

    #[test]
    fn test_amount_plain_yen() {
        assert_eq!(engine().extract_amount("交付額 300,000円"), Some(300_000));
    }

    #[test]
    fn test_amount_none_when_absent() {
        assert_eq!(engine().extract_amount("本事業は終了しました"), None);
        assert_eq!(engine().extract_amount(""), None);
    }

    #[test]
    fn test_amount_candidates_tagged() {
        let candidates = engine().extract_amount_candidates("法人1000万円、個人500万円");
        assert!(candidates
            .iter()
            .any(|c| c.kind == AmountKind::Corporate && c.amount == 10_000_000));
        assert!(candidates
            .iter()
            .any(|c| c.kind == AmountKind::Individual && c.amount == 5_000_000));
    }

    #[test]
    fn test_amount_rejects_out_of_range() {
        // 1000億円 and above is treated as noise
        assert_eq!(engine().extract_amount("予算総額1000億円"), None);
    }

    #[test]
    fn test_rate_fraction_inversion() {
        // 3分の1 means one third: denominator comes first lexically
        assert_eq!(
            engine().extract_rate("補助率は3分の1です"),
            Some(SubsidyRate::Fraction {
                numerator: 1,
                denominator: 3
            })
        );
    }

    #[test]
    fn test_rate_labeled_beats_generic() {
        // Both a labeled rate and a bare percentage appear; priority wins
        assert_eq!(
            engine().extract_rate("消費税10%。補助率: 2分の1"),
            Some(SubsidyRate::Fraction {
                numerator: 1,
                denominator: 2
            })
        );
    }

    #[test]
    fn test_rate_percent() {
        assert_eq!(
            engine().extract_rate("補助率50%"),
            Some(SubsidyRate::Percent(50.0))
        );
    }

    #[test]
    fn test_rate_slash_not_confused_by_dates() {
        // 6/30 is a date, not a rate; the guarded slash pattern and the
        // plausibility check both reject it
        assert_eq!(engine().extract_rate("申請は 6/30 まで"), None);
    }

    #[test]
    fn test_rate_slash_plausible() {
        assert_eq!(
            engine().extract_rate("補助率 1/2 以内"),
            Some(SubsidyRate::Fraction {
                numerator: 1,
                denominator: 2
            })
        );
    }

    #[test]
    fn test_rate_fixed() {
        assert_eq!(engine().extract_rate("定額(10万円)を交付"), Some(SubsidyRate::Fixed));
    }

    #[test]
    fn test_rate_percent_out_of_range_discarded() {
        assert_eq!(engine().extract_rate("達成率120%"), None);
    }

    #[test]
    fn test_rate_display() {
        assert_eq!(
            SubsidyRate::Fraction {
                numerator: 2,
                denominator: 3
            }
            .to_string(),
            "2/3"
        );
        assert_eq!(SubsidyRate::Percent(50.0).to_string(), "50%");
        assert_eq!(SubsidyRate::Fixed.to_string(), "定額");
    }

    #[test]
    fn test_deadline_era_conversion() {
        assert_eq!(
            engine().extract_deadline("令和7年1月15日まで", today()),
            NaiveDate::from_ymd_opt(2025, 1, 15)
        );
        assert_eq!(
            engine().extract_deadline("申請期限: 令和1年4月1日", today()),
            NaiveDate::from_ymd_opt(2019, 4, 1)
        );
    }

    #[test]
    fn test_deadline_era_gannen() {
        assert_eq!(
            engine().extract_deadline("令和元年5月7日まで", today()),
            NaiveDate::from_ymd_opt(2019, 5, 7)
        );
    }

    #[test]
    fn test_deadline_western() {
        assert_eq!(
            engine().extract_deadline("2025年12月26日（金）まで", today()),
            NaiveDate::from_ymd_opt(2025, 12, 26)
        );
    }

    #[test]
    fn test_deadline_year_inference_future() {
        // Still ahead in the current year
        assert_eq!(
            engine().extract_deadline("12月31日まで", today()),
            NaiveDate::from_ymd_opt(2025, 12, 31)
        );
    }

    #[test]
    fn test_deadline_year_inference_passed() {
        // Already passed this year: next year is assumed
        assert_eq!(
            engine().extract_deadline("1月1日まで", today()),
            NaiveDate::from_ymd_opt(2026, 1, 1)
        );
    }

    #[test]
    fn test_deadline_today_is_not_passed() {
        assert_eq!(
            engine().extract_deadline("6月1日まで", today()),
            NaiveDate::from_ymd_opt(2025, 6, 1)
        );
    }

    #[test]
    fn test_deadline_invalid_date_skipped() {
        assert_eq!(engine().extract_deadline("2月30日まで", today()), None);
    }

    #[test]
    fn test_deadline_none_without_dates() {
        assert_eq!(engine().extract_deadline("随時受付中です", today()), None);
    }

    #[test]
    fn test_start_date_kara() {
        assert_eq!(
            engine().extract_start_date("令和7年4月1日から受付", today()),
            NaiveDate::from_ymd_opt(2025, 4, 1)
        );
    }

    #[test]
    fn test_start_date_marker_led() {
        assert_eq!(
            engine().extract_start_date("受付開始: 2025年7月1日", today()),
            NaiveDate::from_ymd_opt(2025, 7, 1)
        );
    }

    #[test]
    fn test_recruitment_ended_phrases() {
        let engine = engine();
        assert!(engine.is_recruitment_ended("募集は終了しました"));
        assert!(engine.is_recruitment_ended("受付を終了いたしました"));
        assert!(engine.is_recruitment_ended("令和6年度の本事業の募集はすべて終了しています"));
        assert!(!engine.is_recruitment_ended("現在募集中です"));
    }

    #[test]
    fn test_recruitment_ended_independent_of_other_fields() {
        let engine = engine();
        let text = "募集は終了しました。補助上限は500万円、締切は令和7年3月31日でした。";
        assert!(engine.is_recruitment_ended(text));
        // Amount and deadline are still extractable from the same text
        assert_eq!(engine.extract_amount(text), Some(5_000_000));
        assert!(engine.extract_deadline(text, today()).is_some());
    }

    #[test]
    fn test_preprocess_collapses_whitespace() {
        assert_eq!(preprocess("上限  ５００万円\n　まで"), "上限 500万円 まで");
    }
}
