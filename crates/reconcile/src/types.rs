//! Core types for intent reconciliation

use crate::change::Change;
use crate::error::ApplyError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a change does to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Resource is absent and must be created
    Create,
    /// Resource exists but differs from desired
    Update,
    /// Resource exists but is not declared
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// Kind of resource a change addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Loopback,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loopback => "loopback",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying a single change successfully
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applied {
    /// Nothing was sent to the controller
    pub dry_run: bool,
    /// Fixed-number of the rollback file the commit produced
    pub rollback_id: Option<u64>,
    /// The device was synced and re-read after the change
    pub verified: bool,
}

impl Applied {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }
}

/// Per-change record kept in an [`ApplySummary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeResult {
    /// Display form of the change, e.g. `[r1] CREATE loopback 100`
    pub change: String,
    pub device: String,
    pub resource_type: ResourceKind,
    pub resource_id: String,
    pub action: Action,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_id: Option<u64>,
}

/// What happened to a plan handed to [`crate::IntentEngine::execute_plan`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// Every device already matched its intent
    NoChanges,
    /// The caller declined to apply
    Declined,
    Applied(ApplySummary),
}

impl PlanOutcome {
    /// The apply summary, empty when nothing was applied
    pub fn into_summary(self, dry_run: bool) -> ApplySummary {
        match self {
            Self::Applied(summary) => summary,
            Self::NoChanges | Self::Declined => ApplySummary::new(dry_run),
        }
    }
}

/// Aggregate outcome of applying a set of changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplySummary {
    pub dry_run: bool,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<ChangeResult>,
}

impl ApplySummary {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// `(success_count, failure_count)`
    pub fn counts(&self) -> (usize, usize) {
        (self.succeeded, self.failed)
    }

    /// Total number of changes attempted
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Check if every change succeeded
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Rollback fixed-numbers recorded for tracked commits, in apply order
    pub fn rollback_ids(&self) -> Vec<u64> {
        self.results.iter().filter_map(|r| r.rollback_id).collect()
    }

    /// Failed changes only
    pub fn failures(&self) -> impl Iterator<Item = &ChangeResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: ApplySummary) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.results.extend(other.results);
    }

    /// Add the outcome of one change to the summary
    pub fn record(&mut self, change: &Change, outcome: &Result<Applied, ApplyError>) {
        let (success, error, rollback_id) = match outcome {
            Ok(applied) => (true, None, applied.rollback_id),
            Err(e) => (false, Some(e.to_string()), None),
        };
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(ChangeResult {
            change: change.to_string(),
            device: change.device().to_string(),
            resource_type: change.resource_type(),
            resource_id: change.resource_id().to_string(),
            action: change.action(),
            success,
            error,
            rollback_id,
        });
    }
}

/// Options for reconciliation runs
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Number of devices reconciled concurrently (1 = sequential)
    pub jobs: usize,
    /// Ask the controller for a rollback id with every commit
    pub track_rollback: bool,
    /// Sync and re-read a device after each mutation to confirm it
    pub verify: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            track_rollback: false,
            verify: true,
        }
    }
}
