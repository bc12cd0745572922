//! Persistable subsidy records
//!
//! The crawler's output contract: a list of `ScrapedSubsidy` records the
//! orchestration layer upserts by the `source:source_id` natural key.
//! Boilerplate stripping beyond the extractor's own and stale-record
//! deactivation belong to that collaborator, not to this crate.

use crate::extract::SubsidyInfo;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex characters of the URL hash used as `source_id`
const SOURCE_ID_LEN: usize = 16;

/// One well-formed candidate subsidy record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedSubsidy {
    /// Originating target id (e.g. "tokyo")
    pub source: String,

    /// Stable id within the source, derived from the source URL
    pub source_id: String,

    pub source_url: String,

    pub title: String,

    pub description: Option<String>,

    /// Maximum amount in yen
    pub max_amount: Option<u64>,

    /// Display form of the subsidy rate ("2/3", "50%", "定額")
    pub subsidy_rate: Option<String>,

    pub application_start: Option<NaiveDate>,

    pub application_end: Option<NaiveDate>,

    /// Prefecture name, or 全国 when no narrower area was found
    pub target_area: String,

    pub organization: Option<String>,

    /// False when the page announced the recruitment has ended
    pub is_active: bool,

    /// Extraction confidence, 0-100
    pub confidence: u8,
}

impl ScrapedSubsidy {
    /// Converts an extraction result into a persistable record
    ///
    /// Returns `None` when no title was extracted: a record without a
    /// title cannot be meaningfully shown or deduplicated downstream.
    pub fn from_info(info: &SubsidyInfo, source: &str) -> Option<Self> {
        let title = info.title.as_ref()?.clone();

        Some(Self {
            source: source.to_string(),
            source_id: source_id_for(&info.source_url),
            source_url: info.source_url.clone(),
            title,
            description: info.description.clone(),
            max_amount: info.max_amount,
            subsidy_rate: info.subsidy_rate.as_ref().map(|r| r.to_string()),
            application_start: info.application_start,
            application_end: info.application_end,
            target_area: info
                .target_area
                .clone()
                .unwrap_or_else(|| "全国".to_string()),
            organization: info.organization.clone(),
            is_active: !info.is_recruitment_ended,
            confidence: info.confidence,
        })
    }

    /// The natural key the persistence collaborator upserts by
    pub fn natural_key(&self) -> String {
        format!("{}:{}", self.source, self.source_id)
    }
}

/// Deterministic id from the source URL
fn source_id_for(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())[..SOURCE_ID_LEN].to_string()
}
