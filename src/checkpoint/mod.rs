//! Checkpoint persistence
//!
//! The whole of a crawl's mutable state (config, visited set, queued
//! items, accumulated results) serializes as one JSON file per
//! checkpoint: a stop-the-world snapshot, never an incremental diff, so a
//! restored run can never see partially applied state. Files are written
//! to a temp path and atomically renamed so a crash mid-write cannot
//! truncate an existing checkpoint.

use crate::config::CrawlerConfig;
use crate::engine::{CrawlError, CrawlStats};
use crate::queue::QueueItem;
use crate::record::ScrapedSubsidy;
use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Default age past which `cleanup` deletes checkpoints
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Queue and traversal state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointState {
    pub visited_urls: Vec<String>,
    pub queued_items: Vec<QueueItem>,
    pub current_depth: u32,
}

/// Results accumulated so far
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointResults {
    pub subsidies: Vec<ScrapedSubsidy>,
    pub stats: CrawlStats,
    pub errors: Vec<CrawlError>,
}

/// The sole unit of resumability
///
/// Restoring a checkpoint must reproduce the queue's pending/visited sets
/// and the engine's counters exactly, or a resumed run double-visits and
/// double-counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlCheckpoint {
    pub id: String,
    pub name: String,
    pub config: CrawlerConfig,
    /// Hash of the config file active when the run started
    pub config_hash: Option<String>,
    pub state: CheckpointState,
    pub results: CheckpointResults,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row for the operational surface
#[derive(Debug, Clone)]
pub struct CheckpointSummary {
    pub id: String,
    pub name: String,
    pub updated_at: DateTime<Utc>,
    pub visited: usize,
    pub queued: usize,
    pub subsidies: usize,
}

struct AutoSave {
    last_saved: Instant,
}

/// Saves, loads, lists, and prunes checkpoint files in one directory
pub struct CheckpointManager {
    dir: PathBuf,
    save_interval: Duration,
    auto_save: Option<AutoSave>,
}

impl CheckpointManager {
    pub fn new(dir: &Path, save_interval: Duration) -> Self {
        Self {
            dir: dir.to_path_buf(),
            save_interval,
            auto_save: None,
        }
    }

    /// Generates a checkpoint id for a named run: `slug(name)-base36(now)`
    pub fn generate_id(name: &str) -> String {
        format!("{}-{}", slug(name), base36(Utc::now().timestamp_millis()))
    }

    /// Arms periodic auto-saving; the caller performs one immediate save
    /// and then drives `tick` from its loop
    pub fn start_auto_save(&mut self) {
        self.auto_save = Some(AutoSave {
            last_saved: Instant::now(),
        });
    }

    pub fn stop_auto_save(&mut self) {
        self.auto_save = None;
    }

    /// Saves the checkpoint if the auto-save interval has elapsed
    ///
    /// Returns true when a save happened.
    pub fn tick(&mut self, checkpoint: &mut CrawlCheckpoint) -> Result<bool> {
        let due = match &self.auto_save {
            Some(auto) => auto.last_saved.elapsed() >= self.save_interval,
            None => false,
        };
        if !due {
            return Ok(false);
        }
        self.save(checkpoint)?;
        if let Some(auto) = &mut self.auto_save {
            auto.last_saved = Instant::now();
        }
        Ok(true)
    }

    /// Writes the full checkpoint, stamping `updated_at`
    ///
    /// The file is written to a temp sibling and renamed into place.
    pub fn save(&self, checkpoint: &mut CrawlCheckpoint) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        checkpoint.updated_at = Utc::now();

        let path = self.path_for(&checkpoint.id);
        let tmp_path = path.with_extension("json.tmp");

        let json = serde_json::to_string_pretty(checkpoint)?;
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &path)?;

        tracing::debug!(
            "Checkpoint {} saved ({} visited, {} queued)",
            checkpoint.id,
            checkpoint.state.visited_urls.len(),
            checkpoint.state.queued_items.len()
        );
        Ok(())
    }

    /// Loads a checkpoint by id
    pub fn load(&self, id: &str) -> Result<CrawlCheckpoint> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(HarvestError::CheckpointNotFound(id.to_string()));
        }
        let json = std::fs::read_to_string(&path)?;
        let checkpoint = serde_json::from_str(&json)?;
        Ok(checkpoint)
    }

    /// Lists checkpoints, newest first, skipping unreadable files
    pub fn list(&self) -> Result<Vec<CheckpointSummary>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(HarvestError::from)
                .and_then(|json| serde_json::from_str::<CrawlCheckpoint>(&json).map_err(Into::into))
            {
                Ok(cp) => summaries.push(CheckpointSummary {
                    id: cp.id,
                    name: cp.name,
                    updated_at: cp.updated_at,
                    visited: cp.state.visited_urls.len(),
                    queued: cp.state.queued_items.len(),
                    subsidies: cp.results.subsidies.len(),
                }),
                Err(e) => {
                    tracing::warn!("Skipping unreadable checkpoint {}: {}", path.display(), e);
                }
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// Deletes one checkpoint
    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(HarvestError::CheckpointNotFound(id.to_string()));
        }
        std::fs::remove_file(path)?;
        Ok(())
    }

    /// Deletes checkpoints older than `max_age`; returns the count removed
    pub fn cleanup(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now() - chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::days(7));
        let mut deleted = 0;

        for summary in self.list()? {
            if summary.updated_at < cutoff {
                if let Err(e) = self.delete(&summary.id) {
                    tracing::warn!("Failed to delete checkpoint {}: {}", summary.id, e);
                } else {
                    deleted += 1;
                }
            }
        }

        Ok(deleted)
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

/// Lowercases and dashes a name for use in filenames
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "crawl".to_string()
    } else {
        trimmed.to_string()
    }
}

fn base36(mut value: i64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value <= 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_else(|_| "0".to_string())
}
