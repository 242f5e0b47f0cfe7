//! Typed access to a device's stored configuration tree
//!
//! The controller returns the configuration of a device as a nested JSON
//! document whose shape depends on the NED in use. Instead of walking the
//! tree by string keys, each known shape is described by serde types and
//! read through an accessor that either yields the value or says which
//! part of the path was missing or malformed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

const CONFIG_KEY: &str = "tailf-ncs:config";
const INTERFACE_KEY: &str = "tailf-ned-cisco-ios:interface";
const LOOPBACK_KEY: &str = "Loopback";

/// Why a value could not be read from the configuration tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// A container along the path is absent
    Missing { path: String },
    /// A container exists but has an unexpected shape
    Malformed { path: String, reason: String },
}

impl ShapeError {
    pub fn path(&self) -> &str {
        match self {
            Self::Missing { path } | Self::Malformed { path, .. } => path,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { path } => write!(f, "{path} not found"),
            Self::Malformed { path, reason } => write!(f, "{path} is malformed: {reason}"),
        }
    }
}

impl std::error::Error for ShapeError {}

/// Observed state of one loopback interface
///
/// Every field is optional because devices may carry partially configured
/// interfaces (no address, no description).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopbackSnapshot {
    pub ip: Option<String>,
    pub netmask: Option<String>,
    pub description: Option<String>,
}

impl LoopbackSnapshot {
    pub fn new(ip: &str, netmask: &str, description: Option<&str>) -> Self {
        Self {
            ip: Some(ip.to_string()),
            netmask: Some(netmask.to_string()),
            description: description.map(str::to_string),
        }
    }
}

/// Loopbacks keyed by interface number, ordered by key
pub type LoopbackMap = BTreeMap<String, LoopbackSnapshot>;

/// Configuration of one device as stored by the controller
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceConfig {
    tree: Value,
}

impl DeviceConfig {
    pub fn new(tree: Value) -> Self {
        Self { tree }
    }

    /// The untyped tree, for display or debugging
    pub fn raw(&self) -> &Value {
        &self.tree
    }

    /// Loopback interfaces declared under the Cisco IOS NED interface list
    pub fn loopbacks(&self) -> Result<LoopbackMap, ShapeError> {
        let interface = self.interface_tree()?;
        let path = format!("{CONFIG_KEY}/{INTERFACE_KEY}/{LOOPBACK_KEY}");

        let Some(entries) = interface.get(LOOPBACK_KEY) else {
            return Err(ShapeError::Missing { path });
        };

        let entries: Vec<LoopbackEntry> =
            serde_json::from_value(entries.clone()).map_err(|e| ShapeError::Malformed {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        Ok(entries
            .into_iter()
            .filter_map(LoopbackEntry::into_snapshot)
            .collect())
    }

    fn interface_tree(&self) -> Result<&serde_json::Map<String, Value>, ShapeError> {
        let root = self.tree.as_object().ok_or_else(|| ShapeError::Malformed {
            path: "/".to_string(),
            reason: "expected an object".to_string(),
        })?;

        let config = root.get(CONFIG_KEY).ok_or_else(|| ShapeError::Missing {
            path: CONFIG_KEY.to_string(),
        })?;
        let config = config.as_object().ok_or_else(|| ShapeError::Malformed {
            path: CONFIG_KEY.to_string(),
            reason: "expected an object".to_string(),
        })?;

        let path = format!("{CONFIG_KEY}/{INTERFACE_KEY}");
        let interface = config
            .get(INTERFACE_KEY)
            .ok_or_else(|| ShapeError::Missing { path: path.clone() })?;
        interface.as_object().ok_or_else(|| ShapeError::Malformed {
            path,
            reason: "expected an object".to_string(),
        })
    }
}

// =============================================================================
// Cisco IOS NED shapes
// =============================================================================

/// Interface numbers arrive as JSON numbers or strings depending on the NED
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InterfaceName {
    Number(u64),
    Text(String),
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoopbackEntry {
    name: Option<InterfaceName>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    ip: Option<IpBlock>,
}

#[derive(Debug, Deserialize)]
struct IpBlock {
    #[serde(default)]
    address: Option<AddressBlock>,
}

#[derive(Debug, Deserialize)]
struct AddressBlock {
    #[serde(default)]
    primary: Option<PrimaryAddress>,
}

#[derive(Debug, Deserialize)]
struct PrimaryAddress {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    mask: Option<String>,
}

impl LoopbackEntry {
    fn into_snapshot(self) -> Option<(String, LoopbackSnapshot)> {
        let id = self.name?.to_string();
        if id.is_empty() {
            return None;
        }
        let primary = self.ip.and_then(|ip| ip.address).and_then(|a| a.primary);
        let (ip, netmask) = match primary {
            Some(p) => (p.address, p.mask),
            None => (None, None),
        };
        Some((
            id,
            LoopbackSnapshot {
                ip,
                netmask,
                description: self.description,
            },
        ))
    }
}

/// Build the tree the controller stores for a set of loopbacks
///
/// Used by the mock client to answer `device_config` the way the
/// controller does.
pub fn loopback_tree(loopbacks: &LoopbackMap) -> Value {
    let entries: Vec<Value> = loopbacks
        .iter()
        .map(|(id, lb)| loopback_entry(id, lb))
        .collect();
    serde_json::json!({
        CONFIG_KEY: {
            INTERFACE_KEY: {
                LOOPBACK_KEY: entries
            }
        }
    })
}

/// One `Loopback` list entry in NED JSON form
pub fn loopback_entry(id: &str, lb: &LoopbackSnapshot) -> Value {
    let name = id
        .parse::<u64>()
        .map_or_else(|_| Value::String(id.to_string()), Value::from);
    let mut entry = serde_json::json!({ "name": name });
    if let Some(description) = &lb.description {
        entry["description"] = Value::String(description.clone());
    }
    if lb.ip.is_some() || lb.netmask.is_some() {
        entry["ip"] = serde_json::json!({
            "address": {
                "primary": {
                    "address": lb.ip,
                    "mask": lb.netmask
                }
            }
        });
    }
    entry
}
