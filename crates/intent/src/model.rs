//! Validated network intent
//!
//! Every type here is built from its raw document counterpart and is
//! immutable afterwards. Construction collects all violations before
//! failing, so no partially-valid value is ever handed out.

use crate::document::{
    BgpDocument, BgpNeighborDocument, DeviceDocument, Field, IntentDocument, LoopbackDocument,
    optional, read_document, required,
};
use crate::error::{Result, ValidationErrors};
use crate::rules::{self, Netmask};
use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;

/// Maximum loopback description length
pub const LOOPBACK_DESCRIPTION_MAX: usize = 240;

/// Maximum BGP neighbor description length
pub const NEIGHBOR_DESCRIPTION_MAX: usize = 80;

/// Device operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceType {
    #[serde(rename = "ios")]
    Ios,
    #[serde(rename = "ios-xe")]
    IosXe,
    #[serde(rename = "ios-xr")]
    IosXr,
    #[serde(rename = "nxos")]
    Nxos,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::IosXe => "ios-xe",
            Self::IosXr => "ios-xr",
            Self::Nxos => "nxos",
        }
    }

    pub fn all() -> [DeviceType; 4] {
        [Self::Ios, Self::IosXe, Self::IosXr, Self::Nxos]
    }

    pub fn parse(value: &str) -> std::result::Result<Self, String> {
        Self::all()
            .into_iter()
            .find(|t| t.as_str() == value)
            .ok_or_else(|| {
                format!(
                    "unknown device type {value}, expected one of: ios, ios-xe, ios-xr, nxos"
                )
            })
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired state of one loopback interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopbackIntent {
    id: u32,
    ipv4: Ipv4Addr,
    netmask: Netmask,
    description: Option<String>,
}

impl LoopbackIntent {
    /// Validate a single loopback outside of a full document
    pub fn new(
        id: i64,
        ipv4: &str,
        netmask: &str,
        description: Option<&str>,
    ) -> std::result::Result<Self, ValidationErrors> {
        let doc = LoopbackDocument {
            id: Some(Field::from(id)),
            ipv4: Some(Field::from(ipv4.to_string())),
            netmask: Some(Field::from(netmask.to_string())),
            description: description.map(|text| Field::from(text.to_string())),
        };
        Self::try_from(doc)
    }

    pub(crate) fn check(
        doc: &LoopbackDocument,
        path: &str,
        errors: &mut ValidationErrors,
    ) -> Option<Self> {
        let id = errors.check(
            &format!("{path}.id"),
            required(&doc.id).and_then(|id| rules::loopback_id(*id)),
        );
        let ipv4 = errors.check(
            &format!("{path}.ipv4"),
            required(&doc.ipv4).map(String::as_str).and_then(rules::host_address),
        );
        let netmask = errors.check(
            &format!("{path}.netmask"),
            required(&doc.netmask).map(String::as_str).and_then(rules::netmask),
        );
        // An empty description means no description
        let description = errors.check(
            &format!("{path}.description"),
            optional(&doc.description).and_then(|text| {
                text.filter(|t| !t.is_empty())
                    .map(|t| rules::description(t, LOOPBACK_DESCRIPTION_MAX))
                    .transpose()
            }),
        );

        Some(Self {
            id: id?,
            ipv4: ipv4?,
            netmask: netmask?,
            description: description?,
        })
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Loopback id as used by the controller's interface list
    pub fn key(&self) -> String {
        self.id.to_string()
    }

    pub fn ipv4(&self) -> Ipv4Addr {
        self.ipv4
    }

    pub fn netmask(&self) -> Netmask {
        self.netmask
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl TryFrom<LoopbackDocument> for LoopbackIntent {
    type Error = ValidationErrors;

    fn try_from(doc: LoopbackDocument) -> std::result::Result<Self, Self::Error> {
        let mut errors = ValidationErrors::new();
        match Self::check(&doc, "loopback", &mut errors) {
            Some(lb) if errors.is_empty() => Ok(lb),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BgpNeighborIntent {
    ip: Ipv4Addr,
    remote_asn: u32,
    description: Option<String>,
    update_source: Option<String>,
}

impl BgpNeighborIntent {
    fn check(doc: &BgpNeighborDocument, path: &str, errors: &mut ValidationErrors) -> Option<Self> {
        let ip = errors.check(
            &format!("{path}.ip"),
            required(&doc.ip).map(String::as_str).and_then(rules::dotted_quad),
        );
        let remote_asn = errors.check(
            &format!("{path}.remote_asn"),
            required(&doc.remote_asn).and_then(|asn| rules::asn(*asn)),
        );
        let description = errors.check(
            &format!("{path}.description"),
            optional(&doc.description).and_then(|text| {
                text.map(|t| rules::bounded_text(t, 0, NEIGHBOR_DESCRIPTION_MAX))
                    .transpose()
            }),
        );
        let update_source = errors.check(
            &format!("{path}.update_source"),
            optional(&doc.update_source).map(|v| v.cloned()),
        );

        Some(Self {
            ip: ip?,
            remote_asn: remote_asn?,
            description: description?,
            update_source: update_source?,
        })
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.ip
    }

    pub fn remote_asn(&self) -> u32 {
        self.remote_asn
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn update_source(&self) -> Option<&str> {
        self.update_source.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BgpIntent {
    asn: u32,
    router_id: Option<Ipv4Addr>,
    neighbors: Vec<BgpNeighborIntent>,
}

impl BgpIntent {
    fn check(doc: &BgpDocument, path: &str, errors: &mut ValidationErrors) -> Option<Self> {
        let asn = errors.check(
            &format!("{path}.asn"),
            required(&doc.asn).and_then(|asn| rules::asn(*asn)),
        );
        let router_id = errors.check(
            &format!("{path}.router_id"),
            optional(&doc.router_id)
                .and_then(|id| id.map(|id| rules::dotted_quad(id)).transpose()),
        );

        let neighbors: Vec<_> = doc
            .neighbors
            .iter()
            .enumerate()
            .map(|(i, n)| BgpNeighborIntent::check(n, &format!("{path}.neighbors[{i}]"), errors))
            .collect();

        let ips = doc.neighbors.iter().filter_map(|n| n.ip.as_ref()?.valid());
        for dup in rules::duplicates(ips.map(String::as_str)) {
            errors.push(format!("{path}.neighbors"), format!("Duplicate neighbor IPs: {dup}"));
        }

        Some(Self {
            asn: asn?,
            router_id: router_id?,
            neighbors: neighbors.into_iter().collect::<Option<Vec<_>>>()?,
        })
    }

    pub fn asn(&self) -> u32 {
        self.asn
    }

    pub fn router_id(&self) -> Option<Ipv4Addr> {
        self.router_id
    }

    pub fn neighbors(&self) -> &[BgpNeighborIntent] {
        &self.neighbors
    }
}

/// Desired state of one managed device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIntent {
    name: String,
    device_type: DeviceType,
    loopbacks: Vec<LoopbackIntent>,
    bgp: Option<BgpIntent>,
    delete_unmanaged_loopbacks: bool,
}

impl DeviceIntent {
    pub(crate) fn check(
        doc: &DeviceDocument,
        path: &str,
        errors: &mut ValidationErrors,
    ) -> Option<Self> {
        let name = errors.check(
            &format!("{path}.name"),
            required(&doc.name).map(String::as_str).and_then(rules::hostname),
        );
        let device_type = errors.check(
            &format!("{path}.device_type"),
            required(&doc.device_type).map(String::as_str).and_then(DeviceType::parse),
        );
        let delete_unmanaged_loopbacks = errors.check(
            &format!("{path}.delete_unmanaged_loopbacks"),
            optional(&doc.delete_unmanaged_loopbacks).map(|v| v.copied().unwrap_or(false)),
        );

        let loopbacks: Vec<_> = doc
            .loopbacks
            .iter()
            .enumerate()
            .map(|(i, lb)| LoopbackIntent::check(lb, &format!("{path}.loopbacks[{i}]"), errors))
            .collect();

        let ids: Vec<String> = doc
            .loopbacks
            .iter()
            .filter_map(|lb| lb.id.as_ref()?.valid().map(ToString::to_string))
            .collect();
        for dup in rules::duplicates(ids.iter().map(String::as_str)) {
            errors.push(format!("{path}.loopbacks"), format!("Duplicate loopback ids: {dup}"));
        }

        let bgp = match &doc.bgp {
            Some(bgp) => BgpIntent::check(bgp, &format!("{path}.bgp"), errors).map(Some),
            None => Some(None),
        };

        Some(Self {
            name: name?,
            device_type: device_type?,
            loopbacks: loopbacks.into_iter().collect::<Option<Vec<_>>>()?,
            bgp: bgp?,
            delete_unmanaged_loopbacks: delete_unmanaged_loopbacks?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn loopbacks(&self) -> &[LoopbackIntent] {
        &self.loopbacks
    }

    pub fn bgp(&self) -> Option<&BgpIntent> {
        self.bgp.as_ref()
    }

    /// Whether loopbacks missing from the intent should be removed
    ///
    /// Defaults to false: resources not declared in intent are left alone.
    pub fn delete_unmanaged_loopbacks(&self) -> bool {
        self.delete_unmanaged_loopbacks
    }
}

impl TryFrom<DeviceDocument> for DeviceIntent {
    type Error = ValidationErrors;

    fn try_from(doc: DeviceDocument) -> std::result::Result<Self, Self::Error> {
        let mut errors = ValidationErrors::new();
        match Self::check(&doc, "device", &mut errors) {
            Some(device) if errors.is_empty() => Ok(device),
            _ => Err(errors),
        }
    }
}

/// Full network intent - the source of truth
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkIntent {
    devices: Vec<DeviceIntent>,
}

impl NetworkIntent {
    /// Validate a parsed document
    pub fn from_document(doc: &IntentDocument) -> std::result::Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if doc.devices.is_empty() {
            errors.push("devices", "at least one device is required");
        }

        let devices: Vec<_> = doc
            .devices
            .iter()
            .enumerate()
            .map(|(i, d)| DeviceIntent::check(d, &format!("devices[{i}]"), &mut errors))
            .collect();

        let names = doc.devices.iter().filter_map(|d| d.name.as_ref()?.valid());
        let duplicates = rules::duplicates(names.map(String::as_str));
        if !duplicates.is_empty() {
            errors.push(
                "devices",
                format!("Duplicate device names found: {}", duplicates.join(", ")),
            );
        }

        let devices = devices.into_iter().collect::<Option<Vec<_>>>();
        match devices {
            Some(devices) => errors.finish(|| Self { devices }),
            None => Err(errors),
        }
    }

    /// Validate an untyped document tree
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let doc: IntentDocument =
            serde_json::from_value(value).map_err(|e| crate::IntentError::Parse {
                format: "JSON",
                message: e.to_string(),
            })?;
        Ok(Self::from_document(&doc)?)
    }

    /// Load and validate an intent file (.yaml, .yml, .json or .toml)
    pub fn load(path: &Path) -> Result<Self> {
        let doc: IntentDocument = read_document(path)?;
        Ok(Self::from_document(&doc)?)
    }

    pub fn devices(&self) -> &[DeviceIntent] {
        &self.devices
    }

    /// Get device intent by name
    pub fn device(&self, name: &str) -> Option<&DeviceIntent> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// Restrict the intent to the named devices
    ///
    /// An empty filter keeps every device. Returns `None` when the filter
    /// matches nothing.
    pub fn select(&self, names: &[String]) -> Option<Self> {
        if names.is_empty() {
            return Some(self.clone());
        }
        let devices: Vec<_> = self
            .devices
            .iter()
            .filter(|d| names.iter().any(|n| n == &d.name))
            .cloned()
            .collect();
        (!devices.is_empty()).then_some(Self { devices })
    }

    /// Total number of declared loopbacks
    pub fn loopback_count(&self) -> usize {
        self.devices.iter().map(|d| d.loopbacks.len()).sum()
    }
}
