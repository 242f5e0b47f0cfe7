//! Local record of apply runs
//!
//! NSO keeps rollback files but not which run produced them. Every
//! non-dry-run apply appends an entry here with the rollback fixed-numbers
//! its commits returned, so `netintent rollback <id> --fixed` can target a
//! specific run later.

use crate::paths;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reconcile::ApplySummary;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Oldest entries are dropped beyond this
pub const MAX_RUNS: usize = 200;

// ============================================================================
// Journal Structures
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    #[serde(default)]
    pub runs: Vec<ApplyRecord>,

    /// Last time the journal was written
    pub last_updated: DateTime<Utc>,
}

/// One apply run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyRecord {
    pub started_at: DateTime<Utc>,

    /// Intent file the run reconciled
    pub intent: String,

    /// Devices that had at least one change
    #[serde(default)]
    pub devices: Vec<String>,

    pub succeeded: usize,
    pub failed: usize,

    /// Rollback fixed-numbers, oldest commit first
    #[serde(default)]
    pub rollback_ids: Vec<u64>,
}

impl ApplyRecord {
    pub fn from_summary(intent: &Path, started_at: DateTime<Utc>, summary: &ApplySummary) -> Self {
        let mut devices: Vec<String> = Vec::new();
        for result in &summary.results {
            if !devices.contains(&result.device) {
                devices.push(result.device.clone());
            }
        }
        Self {
            started_at,
            intent: intent.display().to_string(),
            devices,
            succeeded: summary.succeeded,
            failed: summary.failed,
            rollback_ids: summary.rollback_ids(),
        }
    }

    /// Fixed-number that undoes the whole run: the one before its first commit
    ///
    /// NSO's rollback file N restores the state before commit N, so the
    /// first id of the run is the one to apply.
    pub fn undo_id(&self) -> Option<u64> {
        self.rollback_ids.first().copied()
    }
}

// ============================================================================
// Journal Implementation
// ============================================================================

impl Default for Journal {
    fn default() -> Self {
        Self {
            runs: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

impl Journal {
    /// Default journal path (`<state_dir>/journal.toml`)
    pub fn default_path() -> Result<PathBuf> {
        Ok(paths::state_dir()?.join("journal.toml"))
    }

    /// Load the journal, or an empty one if the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("Journal {} does not exist, starting empty", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read journal: {}", path.display()))?;
        let journal: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse journal: {}", path.display()))?;

        log::debug!("Loaded {} journal entries from {}", journal.runs.len(), path.display());
        Ok(journal)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize journal to TOML")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write journal: {}", path.display()))?;

        log::debug!("Saved journal to {}", path.display());
        Ok(())
    }

    /// Append a run, trimming the oldest beyond [`MAX_RUNS`]
    pub fn record(&mut self, record: ApplyRecord) {
        self.runs.push(record);
        if self.runs.len() > MAX_RUNS {
            let excess = self.runs.len() - MAX_RUNS;
            self.runs.drain(..excess);
        }
        self.last_updated = Utc::now();
    }

    /// Most recent runs first
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &ApplyRecord> {
        self.runs.iter().rev().take(limit)
    }

    /// Load, append and save in one step
    pub fn append(path: &Path, record: ApplyRecord) -> Result<()> {
        let mut journal = Self::load_from(path)?;
        journal.record(record);
        journal.save_to(path)
    }
}

// ============================================================================
// Tests
// ============================================================================
