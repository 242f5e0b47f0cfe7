//! Service deployment intent
//!
//! A service groups related configuration (a BGP process, its router id,
//! its neighbors and policy references) that is deployed to a set of
//! target devices together.

use crate::document::{
    BgpPeerDocument, BgpPeeringDocument, ServiceDeploymentDocument, optional, read_document,
    required,
};
use crate::error::{Result, ValidationErrors};
use crate::rules;
use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;

/// Maximum BGP peer description length
pub const PEER_DESCRIPTION_MAX: usize = 240;

/// Service name used when the document leaves it out
pub const DEFAULT_SERVICE_NAME: &str = "bgp-peering";

/// Kind of service being deployed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    BgpPeering,
    Ospf,
    Loopback,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BgpPeering => "bgp-peering",
            Self::Ospf => "ospf",
            Self::Loopback => "loopback",
        }
    }

    pub fn parse(value: &str) -> std::result::Result<Self, String> {
        [Self::BgpPeering, Self::Ospf, Self::Loopback]
            .into_iter()
            .find(|t| t.as_str() == value)
            .ok_or_else(|| {
                format!("unknown service type {value}, expected one of: bgp-peering, ospf, loopback")
            })
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BgpPeer {
    neighbor_ip: Ipv4Addr,
    remote_as: u32,
    description: Option<String>,
    #[serde(skip_serializing)]
    password: Option<String>,
    update_source: Option<String>,
}

impl BgpPeer {
    fn check(doc: &BgpPeerDocument, path: &str, errors: &mut ValidationErrors) -> Option<Self> {
        let neighbor_ip = errors.check(
            &format!("{path}.neighbor_ip"),
            required(&doc.neighbor_ip).map(String::as_str).and_then(rules::dotted_quad),
        );
        let remote_as = errors.check(
            &format!("{path}.remote_as"),
            required(&doc.remote_as).and_then(|asn| rules::asn(*asn)),
        );
        let description = errors.check(
            &format!("{path}.description"),
            optional(&doc.description).and_then(|text| {
                text.map(|t| rules::description(t, PEER_DESCRIPTION_MAX))
                    .transpose()
            }),
        );
        let password = errors.check(
            &format!("{path}.password"),
            optional(&doc.password)
                .and_then(|secret| secret.map(|s| rules::bounded_text(s, 1, 80)).transpose()),
        );
        let update_source = errors.check(
            &format!("{path}.update_source"),
            optional(&doc.update_source).map(|v| v.cloned()),
        );

        Some(Self {
            neighbor_ip: neighbor_ip?,
            remote_as: remote_as?,
            description: description?,
            password: password?,
            update_source: update_source?,
        })
    }

    pub fn neighbor_ip(&self) -> Ipv4Addr {
        self.neighbor_ip
    }

    pub fn remote_as(&self) -> u32 {
        self.remote_as
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// MD5 session password, never serialized
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn update_source(&self) -> Option<&str> {
        self.update_source.as_deref()
    }
}

/// BGP peering service: process, router id, neighbors, policy references
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BgpPeeringService {
    service_name: String,
    local_as: u32,
    router_id: Ipv4Addr,
    neighbors: Vec<BgpPeer>,
    import_policy: Option<String>,
    export_policy: Option<String>,
}

impl BgpPeeringService {
    fn check(doc: &BgpPeeringDocument, path: &str, errors: &mut ValidationErrors) -> Option<Self> {
        let service_name = errors.check(
            &format!("{path}.service_name"),
            optional(&doc.service_name)
                .map(|name| name.map_or(DEFAULT_SERVICE_NAME, String::as_str).to_string()),
        );
        let local_as = errors.check(
            &format!("{path}.local_as"),
            required(&doc.local_as).and_then(|asn| rules::asn(*asn)),
        );
        let router_id = errors.check(
            &format!("{path}.router_id"),
            required(&doc.router_id).map(String::as_str).and_then(rules::dotted_quad),
        );
        let import_policy = errors.check(
            &format!("{path}.import_policy"),
            optional(&doc.import_policy).map(|v| v.cloned()),
        );
        let export_policy = errors.check(
            &format!("{path}.export_policy"),
            optional(&doc.export_policy).map(|v| v.cloned()),
        );

        if doc.neighbors.is_empty() {
            errors.push(format!("{path}.neighbors"), "at least one neighbor is required");
        }
        let neighbors: Vec<_> = doc
            .neighbors
            .iter()
            .enumerate()
            .map(|(i, n)| BgpPeer::check(n, &format!("{path}.neighbors[{i}]"), errors))
            .collect();
        let ips = doc.neighbors.iter().filter_map(|n| n.neighbor_ip.as_ref()?.valid());
        for dup in rules::duplicates(ips.map(String::as_str)) {
            errors.push(format!("{path}.neighbors"), format!("Duplicate neighbor IPs: {dup}"));
        }

        Some(Self {
            service_name: service_name?,
            local_as: local_as?,
            router_id: router_id?,
            neighbors: neighbors.into_iter().collect::<Option<Vec<_>>>()?,
            import_policy: import_policy?,
            export_policy: export_policy?,
        })
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn local_as(&self) -> u32 {
        self.local_as
    }

    pub fn router_id(&self) -> Ipv4Addr {
        self.router_id
    }

    pub fn neighbors(&self) -> &[BgpPeer] {
        &self.neighbors
    }

    pub fn import_policy(&self) -> Option<&str> {
        self.import_policy.as_deref()
    }

    pub fn export_policy(&self) -> Option<&str> {
        self.export_policy.as_deref()
    }
}

/// Which service to deploy, where, and with what payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceDeploymentIntent {
    service_type: ServiceType,
    target_devices: Vec<String>,
    bgp_config: Option<BgpPeeringService>,
}

impl ServiceDeploymentIntent {
    pub fn from_document(
        doc: &ServiceDeploymentDocument,
    ) -> std::result::Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let service_type = errors.check(
            "service_type",
            required(&doc.service_type).map(String::as_str).and_then(ServiceType::parse),
        );

        if doc.target_devices.is_empty() {
            errors.push("target_devices", "at least one target device is required");
        }
        let targets: Vec<_> = doc
            .target_devices
            .iter()
            .enumerate()
            .map(|(i, name)| {
                errors.check(
                    &format!("target_devices[{i}]"),
                    name.typed().map(String::as_str).and_then(rules::hostname),
                )
            })
            .collect();
        let names = doc.target_devices.iter().filter_map(|name| name.valid());
        let duplicates = rules::duplicates(names.map(String::as_str));
        if !duplicates.is_empty() {
            errors.push(
                "target_devices",
                format!("Duplicate device names: {}", duplicates.join(", ")),
            );
        }

        let bgp_config = match &doc.bgp_config {
            Some(bgp) => BgpPeeringService::check(bgp, "bgp_config", &mut errors).map(Some),
            None => Some(None),
        };

        // The payload selected by service_type has to be present
        if service_type == Some(ServiceType::BgpPeering) && doc.bgp_config.is_none() {
            errors.push(
                "bgp_config",
                "bgp_config required when service_type is 'bgp-peering'",
            );
        }

        let target_devices = targets.into_iter().collect::<Option<Vec<_>>>();
        match (service_type, target_devices, bgp_config) {
            (Some(service_type), Some(target_devices), Some(bgp_config)) => {
                errors.finish(|| Self {
                    service_type,
                    target_devices,
                    bgp_config,
                })
            }
            _ => Err(errors),
        }
    }

    /// Load and validate a service deployment file
    pub fn load(path: &Path) -> Result<Self> {
        let doc: ServiceDeploymentDocument = read_document(path)?;
        Ok(Self::from_document(&doc)?)
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn target_devices(&self) -> &[String] {
        &self.target_devices
    }

    pub fn bgp_config(&self) -> Option<&BgpPeeringService> {
        self.bgp_config.as_ref()
    }
}
