//! Structured events emitted during reconciliation
//!
//! The engine reports what it does through an [`EventSink`] instead of a
//! concrete logging framework. [`LogSink`] forwards events to the `log`
//! facade; [`NoEvents`] drops them; [`MemorySink`] keeps them for
//! inspection.

use crate::change::Change;
use crate::diff::PlanSummary;
use crate::error::ApplyError;
use restconf::{RollbackTarget, ShapeError};
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// How much attention an event deserves
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// Something that happened while reconciling
#[derive(Debug)]
pub enum Event<'a> {
    /// About to read current state from a device
    Querying { device: &'a str },
    /// Sync-from-device failed; stored config may be stale
    SyncFailed { device: &'a str },
    /// The controller returned no configuration for the device
    ConfigUnavailable { device: &'a str },
    /// The configuration tree had no readable loopback list
    StateUnreadable {
        device: &'a str,
        reason: &'a ShapeError,
    },
    /// Current loopbacks read from a device
    StateRead { device: &'a str, count: usize },
    /// Undeclared loopbacks left alone (safe mode)
    UnmanagedKept { device: &'a str, ids: &'a [String] },
    /// Undeclared loopbacks scheduled for deletion
    UnmanagedDeleted { device: &'a str, ids: &'a [String] },
    /// BGP is declared but not reconciled
    BgpSkipped { device: &'a str },
    /// Diff phase finished
    Planned { summary: &'a PlanSummary },
    /// Starting to apply a change
    Applying { change: &'a Change, dry_run: bool },
    /// A change was applied
    Applied {
        change: &'a Change,
        rollback_id: Option<u64>,
    },
    /// A change failed; the batch continues
    Failed {
        change: &'a Change,
        error: &'a ApplyError,
    },
    /// A rollback file is being applied
    RollingBack { target: RollbackTarget },
    /// The device pool could not be created; running sequentially
    Sequential { reason: &'a str },
    /// Apply phase finished
    Finished {
        succeeded: usize,
        failed: usize,
        dry_run: bool,
    },
}

impl Event<'_> {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Querying { .. } | Self::BgpSkipped { .. } => Severity::Debug,
            Self::StateUnreadable { reason, .. } if reason.is_missing() => Severity::Debug,
            Self::StateUnreadable { .. }
            | Self::SyncFailed { .. }
            | Self::ConfigUnavailable { .. }
            | Self::UnmanagedDeleted { .. }
            | Self::RollingBack { .. }
            | Self::Sequential { .. } => Severity::Warn,
            Self::Failed { .. } => Severity::Error,
            Self::Finished { failed, .. } if *failed > 0 => Severity::Warn,
            _ => Severity::Info,
        }
    }

    /// Device the event concerns, if any
    pub fn device(&self) -> Option<&str> {
        match self {
            Self::Querying { device }
            | Self::SyncFailed { device }
            | Self::ConfigUnavailable { device }
            | Self::StateUnreadable { device, .. }
            | Self::StateRead { device, .. }
            | Self::UnmanagedKept { device, .. }
            | Self::UnmanagedDeleted { device, .. }
            | Self::BgpSkipped { device } => Some(*device),
            Self::Applying { change, .. }
            | Self::Applied { change, .. }
            | Self::Failed { change, .. } => Some(change.device()),
            _ => None,
        }
    }
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Querying { device } => write!(f, "Querying current loopbacks from {device}"),
            Self::SyncFailed { device } => {
                write!(f, "[{device}] sync-from-device failed, reading stored config")
            }
            Self::ConfigUnavailable { device } => {
                write!(f, "[{device}] could not retrieve config, assuming no loopbacks")
            }
            Self::StateUnreadable { device, reason } => {
                write!(f, "[{device}] no loopbacks read: {reason}")
            }
            Self::StateRead { device, count } => {
                write!(f, "Found {count} loopbacks on {device}")
            }
            Self::UnmanagedKept { device, ids } => write!(
                f,
                "[{device}] delete_unmanaged_loopbacks=false: ignoring {} unmanaged loopbacks: {}",
                ids.len(),
                ids.join(", ")
            ),
            Self::UnmanagedDeleted { device, ids } => write!(
                f,
                "[{device}] delete_unmanaged_loopbacks=true: will DELETE {} loopbacks not in intent: {}",
                ids.len(),
                ids.join(", ")
            ),
            Self::BgpSkipped { device } => {
                write!(f, "[{device}] BGP intent declared; BGP is not reconciled")
            }
            Self::Planned { summary } => write!(f, "Planned changes: {summary}"),
            Self::Applying { change, dry_run } => {
                if *dry_run {
                    write!(f, "[DRY-RUN] Would apply: {change}")
                } else {
                    write!(f, "Applying: {change}")
                }
            }
            Self::Applied {
                change,
                rollback_id: Some(id),
            } => write!(f, "Applied: {change} (rollback fixed-number {id})"),
            Self::Applied { change, .. } => write!(f, "Applied: {change}"),
            Self::Failed { error, .. } => write!(f, "Failed to apply {error}"),
            Self::RollingBack { target } => write!(f, "Applying {target}"),
            Self::Sequential { reason } => {
                write!(f, "Parallel apply unavailable ({reason}), running sequentially")
            }
            Self::Finished {
                succeeded,
                dry_run: true,
                ..
            } => write!(f, "Dry run complete: {succeeded} changes would be applied"),
            Self::Finished {
                succeeded, failed, ..
            } => write!(
                f,
                "Intent reconciliation complete: {succeeded} succeeded, {failed} failed"
            ),
        }
    }
}

/// Receiver for reconciliation events
///
/// Sinks are shared across the device pool, so they must be thread-safe.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &Event<'_>);
}

/// Forwards events to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &Event<'_>) {
        let level = match event.severity() {
            Severity::Debug => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Warn => log::Level::Warn,
            Severity::Error => log::Level::Error,
        };
        log::log!(target: "reconcile", level, "{event}");
    }
}

/// Drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEvents;

impl EventSink for NoEvents {
    fn emit(&self, _event: &Event<'_>) {}
}

/// Keeps rendered events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event so far as `(severity, message)`
    pub fn events(&self) -> Vec<(Severity, String)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages at or above `severity`
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(s, _)| *s >= severity)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events().iter().any(|(_, m)| m.contains(needle))
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &Event<'_>) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((event.severity(), event.to_string()));
    }
}
