//! The device-configuration client abstraction.
//!
//! [`DeviceConfigClient`] is the seam between reconciliation and the
//! controller. [`crate::NsoClient`] talks RESTCONF over HTTP;
//! [`crate::MockClient`] keeps an in-memory controller for tests.

use crate::device_config::DeviceConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Desired settings for one loopback interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopbackConfig {
    /// Interface number (`Loopback<id>`).
    pub id: u32,
    /// Primary IPv4 address, dotted quad.
    pub ip: String,
    /// Dotted-decimal netmask.
    pub netmask: String,
    /// Interface description.
    pub description: Option<String>,
}

impl LoopbackConfig {
    pub fn new(id: u32, ip: impl Into<String>, netmask: impl Into<String>) -> Self {
        Self {
            id,
            ip: ip.into(),
            netmask: netmask.into(),
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Which rollback file to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RollbackTarget {
    /// Offset from the newest rollback file; 0 undoes the latest commit.
    Relative(u32),
    /// Controller-assigned fixed number, stable across commits.
    Fixed(u64),
}

impl Default for RollbackTarget {
    fn default() -> Self {
        Self::Relative(0)
    }
}

impl fmt::Display for RollbackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relative(n) => write!(f, "rollback {n}"),
            Self::Fixed(id) => write!(f, "rollback fixed-number {id}"),
        }
    }
}

/// One rollback file as listed by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackFile {
    pub id: u32,
    pub fixed_number: u64,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub via: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Operations the reconciliation engine needs from the controller.
///
/// Read-side methods degrade instead of failing: an unreachable controller
/// answers `false` to [`health_check`](Self::health_check) and
/// [`sync_from_device`](Self::sync_from_device), and `None` to
/// [`device_config`](Self::device_config). Mutations return errors.
pub trait DeviceConfigClient: Send + Sync {
    /// Whether the controller answers at all.
    fn health_check(&self) -> bool;

    /// Names of the devices the controller manages.
    fn devices(&self) -> Result<Vec<String>>;

    /// Pull the device's running configuration into the controller.
    fn sync_from_device(&self, device: &str) -> bool;

    /// The controller's copy of a device's configuration.
    fn device_config(&self, device: &str) -> Option<DeviceConfig>;

    /// Create or update a loopback interface.
    fn configure_loopback(&self, device: &str, loopback: &LoopbackConfig) -> Result<()>;

    /// Ask the controller what a configure would send to the device.
    fn configure_loopback_dry_run(
        &self,
        device: &str,
        loopback: &LoopbackConfig,
    ) -> Result<serde_json::Value>;

    /// Configure and return the rollback fixed-number of the commit, if any.
    fn configure_loopback_tracked(
        &self,
        device: &str,
        loopback: &LoopbackConfig,
    ) -> Result<Option<u64>>;

    /// Remove a loopback interface.
    fn delete_loopback(&self, device: &str, id: &str) -> Result<()>;

    /// Remove the description of a loopback interface.
    ///
    /// Configure merges into the existing entry, so a description the
    /// intent no longer declares has to be removed explicitly. Succeeds
    /// when there is no description to remove.
    fn delete_loopback_description(&self, device: &str, id: &str) -> Result<()>;

    /// Apply a rollback file.
    fn rollback(&self, target: RollbackTarget) -> Result<()>;

    /// Rollback files known to the controller, newest first.
    fn rollback_files(&self) -> Result<Vec<RollbackFile>>;
}
