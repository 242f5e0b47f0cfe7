//! # Reconcile
//!
//! Intent reconciliation for network devices.
//!
//! The engine reads the current loopbacks of each device through a
//! [`restconf::DeviceConfigClient`], compares them with the declared
//! [`intent::NetworkIntent`], and applies the minimal set of changes.
//!
//! ## Core Concepts
//!
//! - **Change**: one create, update or delete of a resource on a device,
//!   with before/after snapshots
//! - **Plan**: the ordered list of changes for an intent; computing it never
//!   mutates anything
//! - **ApplySummary**: per-change outcomes and aggregate counts
//! - **EventSink**: where the engine reports what it does
//!
//! ## Guarantees
//!
//! - A device that already matches its intent produces no changes
//! - Loopbacks not declared in the intent are deleted only when the device
//!   sets `delete_unmanaged_loopbacks`
//! - Dry runs never call a mutating client operation
//! - A failing change is counted and reported; the rest of the batch still runs
//! - Rollback is only ever applied on request, never after a failed apply

mod change;
pub mod diff;
mod engine;
mod error;
pub mod events;
mod types;

pub use change::{Change, FieldChange};
pub use diff::{PlanSummary, desired_snapshot, diff_loopbacks, group_by_device};
pub use engine::IntentEngine;
pub use error::ApplyError;
pub use events::{Event, EventSink, LogSink, MemorySink, NoEvents, Severity};
pub use types::{
    Action, Applied, ApplySummary, ChangeResult, EngineOptions, PlanOutcome, ResourceKind,
};
