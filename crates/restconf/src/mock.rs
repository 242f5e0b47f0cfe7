//! In-memory controller for testing without network access.
//!
//! ```
//! use restconf::{DeviceConfigClient, LoopbackConfig, MockClient};
//!
//! let mock = MockClient::new();
//! mock.add_device("dist-rtr01");
//! mock.configure_loopback("dist-rtr01", &LoopbackConfig::new(100, "10.0.0.1", "255.255.255.255"))?;
//!
//! let loopbacks = mock.device_config("dist-rtr01").unwrap().loopbacks().unwrap();
//! assert!(loopbacks.contains_key("100"));
//! # Ok::<(), restconf::Error>(())
//! ```

use crate::client::{DeviceConfigClient, LoopbackConfig, RollbackFile, RollbackTarget};
use crate::device_config::{DeviceConfig, LoopbackMap, LoopbackSnapshot, loopback_tree};
use crate::error::{Error, Result};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// First fixed-number handed out by the mock's rollback history.
const FIRST_FIXED_NUMBER: u64 = 10_000;

/// A request the mock received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Sync(String),
    Configure { device: String, id: u32 },
    ConfigureDryRun { device: String, id: u32 },
    Delete { device: String, id: String },
    DeleteDescription { device: String, id: String },
    Rollback(RollbackTarget),
}

impl MockCall {
    /// Whether the call changes controller state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Configure { .. }
                | Self::Delete { .. }
                | Self::DeleteDescription { .. }
                | Self::Rollback(_)
        )
    }
}

type Devices = BTreeMap<String, LoopbackMap>;

#[derive(Debug)]
struct Commit {
    fixed_number: u64,
    before: Devices,
}

#[derive(Debug, Default)]
struct MockState {
    devices: Devices,
    unreachable: bool,
    failing_syncs: HashSet<String>,
    failing_loopbacks: HashSet<(String, String)>,
    ignored_writes: HashSet<String>,
    raw_configs: BTreeMap<String, Value>,
    calls: Vec<MockCall>,
    commits: Vec<Commit>,
    closes: usize,
}

/// In-memory stand-in for the controller.
///
/// Clones share state, so a test can keep a handle while the engine
/// borrows another.
#[derive(Debug, Clone, Default)]
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
}

impl MockClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a device with no loopbacks.
    pub fn add_device(&self, device: &str) {
        self.state().devices.entry(device.to_string()).or_default();
    }

    /// Seed a loopback without recording a call.
    pub fn add_loopback(&self, device: &str, id: &str, loopback: LoopbackSnapshot) {
        self.state()
            .devices
            .entry(device.to_string())
            .or_default()
            .insert(id.to_string(), loopback);
    }

    /// Answer `device_config` for this device with an arbitrary tree.
    pub fn set_raw_config(&self, device: &str, tree: Value) {
        self.state().raw_configs.insert(device.to_string(), tree);
    }

    /// Make every call behave as if the controller were down.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    /// Make `sync_from_device` fail for one device.
    pub fn fail_sync(&self, device: &str) {
        self.state().failing_syncs.insert(device.to_string());
    }

    /// Reject configure and delete requests for one loopback.
    pub fn fail_loopback(&self, device: &str, id: &str) {
        self.state()
            .failing_loopbacks
            .insert((device.to_string(), id.to_string()));
    }

    /// Accept mutations for a device without changing its configuration.
    pub fn ignore_writes(&self, device: &str) {
        self.state().ignored_writes.insert(device.to_string());
    }

    /// Current loopbacks of a device.
    pub fn loopbacks(&self, device: &str) -> LoopbackMap {
        self.state().devices.get(device).cloned().unwrap_or_default()
    }

    /// Every call received, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Calls that changed (or tried to change) controller state.
    pub fn mutations(&self) -> Vec<MockCall> {
        self.calls().into_iter().filter(MockCall::is_mutation).collect()
    }

    /// Mark the client closed. Idempotent; every call is counted.
    pub fn close(&self) {
        self.state().closes += 1;
    }

    pub fn close_count(&self) -> usize {
        self.state().closes
    }

    fn check_reachable(state: &MockState) -> Result<()> {
        if state.unreachable {
            return Err(Error::Transport {
                method: "GET",
                url: "mock://nso".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    fn mutate(
        &self,
        device: &str,
        id: &str,
        method: &'static str,
        call: MockCall,
        apply: impl FnOnce(&mut LoopbackMap),
    ) -> Result<Option<u64>> {
        let mut state = self.state();
        state.calls.push(call);
        Self::check_reachable(&state)?;

        let url = format!("mock://nso/{device}/Loopback={id}");
        if !state.devices.contains_key(device) {
            return Err(Error::Status {
                method,
                url,
                status: 404,
            });
        }
        if state
            .failing_loopbacks
            .contains(&(device.to_string(), id.to_string()))
        {
            return Err(Error::Status {
                method,
                url,
                status: 400,
            });
        }
        if state.ignored_writes.contains(device) {
            return Ok(None);
        }

        let fixed_number = FIRST_FIXED_NUMBER + state.commits.len() as u64;
        let before = state.devices.clone();
        state.commits.push(Commit {
            fixed_number,
            before,
        });
        if let Some(loopbacks) = state.devices.get_mut(device) {
            apply(loopbacks);
        }
        Ok(Some(fixed_number))
    }
}

/// Merge a configure request into an existing entry, as the controller does
fn merge(entry: &mut LoopbackSnapshot, loopback: &LoopbackConfig) {
    entry.ip = Some(loopback.ip.clone());
    entry.netmask = Some(loopback.netmask.clone());
    if let Some(description) = &loopback.description {
        entry.description = Some(description.clone());
    }
}

impl DeviceConfigClient for MockClient {
    fn health_check(&self) -> bool {
        !self.state().unreachable
    }

    fn devices(&self) -> Result<Vec<String>> {
        let state = self.state();
        Self::check_reachable(&state)?;
        Ok(state.devices.keys().cloned().collect())
    }

    fn sync_from_device(&self, device: &str) -> bool {
        let mut state = self.state();
        state.calls.push(MockCall::Sync(device.to_string()));
        !state.unreachable
            && state.devices.contains_key(device)
            && !state.failing_syncs.contains(device)
    }

    fn device_config(&self, device: &str) -> Option<DeviceConfig> {
        let state = self.state();
        if state.unreachable {
            return None;
        }
        if let Some(tree) = state.raw_configs.get(device) {
            return Some(DeviceConfig::new(tree.clone()));
        }
        state
            .devices
            .get(device)
            .map(|loopbacks| DeviceConfig::new(loopback_tree(loopbacks)))
    }

    fn configure_loopback(&self, device: &str, loopback: &LoopbackConfig) -> Result<()> {
        self.configure_loopback_tracked(device, loopback).map(|_| ())
    }

    fn configure_loopback_dry_run(
        &self,
        device: &str,
        loopback: &LoopbackConfig,
    ) -> Result<Value> {
        let mut state = self.state();
        state.calls.push(MockCall::ConfigureDryRun {
            device: device.to_string(),
            id: loopback.id,
        });
        Self::check_reachable(&state)?;
        Ok(json!({
            "dry-run-result": {
                "native": {
                    "device": [{
                        "name": device,
                        "data": format!(
                            "interface Loopback{}\n ip address {} {}\n",
                            loopback.id, loopback.ip, loopback.netmask
                        )
                    }]
                }
            }
        }))
    }

    fn configure_loopback_tracked(
        &self,
        device: &str,
        loopback: &LoopbackConfig,
    ) -> Result<Option<u64>> {
        let id = loopback.id.to_string();
        let call = MockCall::Configure {
            device: device.to_string(),
            id: loopback.id,
        };
        let loopback = loopback.clone();
        self.mutate(device, &id.clone(), "PATCH", call, move |loopbacks| {
            merge(loopbacks.entry(id).or_default(), &loopback);
        })
    }

    fn delete_loopback(&self, device: &str, id: &str) -> Result<()> {
        let call = MockCall::Delete {
            device: device.to_string(),
            id: id.to_string(),
        };
        self.mutate(device, id, "DELETE", call, |loopbacks| {
            loopbacks.remove(id);
        })
        .map(|_| ())
    }

    fn delete_loopback_description(&self, device: &str, id: &str) -> Result<()> {
        let call = MockCall::DeleteDescription {
            device: device.to_string(),
            id: id.to_string(),
        };
        self.mutate(device, id, "DELETE", call, |loopbacks| {
            if let Some(entry) = loopbacks.get_mut(id) {
                entry.description = None;
            }
        })
        .map(|_| ())
    }

    fn rollback(&self, target: RollbackTarget) -> Result<()> {
        let mut state = self.state();
        state.calls.push(MockCall::Rollback(target));
        Self::check_reachable(&state)?;

        let index = match target {
            RollbackTarget::Relative(n) => state.commits.len().checked_sub(n as usize + 1),
            RollbackTarget::Fixed(number) => state
                .commits
                .iter()
                .position(|c| c.fixed_number == number),
        };
        let Some(index) = index else {
            return Err(Error::Status {
                method: "POST",
                url: "mock://nso/apply-rollback-file".to_string(),
                status: 400,
            });
        };

        // Undo the selected commit and everything after it
        let commit = state.commits.drain(index..).next();
        if let Some(commit) = commit {
            state.devices = commit.before;
        }
        Ok(())
    }

    fn rollback_files(&self) -> Result<Vec<RollbackFile>> {
        let state = self.state();
        Self::check_reachable(&state)?;
        Ok(state
            .commits
            .iter()
            .rev()
            .enumerate()
            .map(|(offset, commit)| RollbackFile {
                id: offset as u32,
                fixed_number: commit.fixed_number,
                creator: Some("mock".to_string()),
                date: None,
                via: Some("rest".to_string()),
                label: None,
                comment: None,
            })
            .collect())
    }
}
