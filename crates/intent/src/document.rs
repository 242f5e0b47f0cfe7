//! Raw desired-state documents as they appear on disk
//!
//! These types only describe the shape of the input. Scalars are kept
//! loose (strings, wide integers, possibly missing, possibly the wrong
//! type) so that every constraint violation can be collected by the typed
//! model instead of failing on the first one.

use crate::error::{IntentError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk format of an intent document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
    Toml,
}

impl DocumentFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            other => Err(IntentError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
            Self::Toml => "TOML",
        }
    }

    /// Deserialize `text` in this format
    pub fn parse<T: DeserializeOwned>(&self, text: &str) -> Result<T> {
        let parsed = match self {
            Self::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(text).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| IntentError::Parse {
            format: self.name(),
            message,
        })
    }
}

/// Read and deserialize a document, choosing the format from the extension
pub fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = DocumentFormat::from_path(path)?;
    let text = std::fs::read_to_string(path).map_err(|source| IntentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    format.parse(&text)
}

/// Value of a field as written, whether or not it has the expected type
///
/// A wrong-typed value is kept instead of failing the parse, so that the
/// typed model can report it at its path next to every other violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field<T> {
    Valid(T),
    Invalid(serde_json::Value),
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Self::Valid(value)
    }
}

/// Scalar types a [`Field`] can expect
pub trait FieldType {
    /// How the expected type reads in a violation message
    const EXPECTED: &'static str;
}

impl FieldType for String {
    const EXPECTED: &'static str = "a string";
}

impl FieldType for i64 {
    const EXPECTED: &'static str = "an integer";
}

impl FieldType for bool {
    const EXPECTED: &'static str = "a boolean";
}

impl<T: FieldType> Field<T> {
    /// The typed value, or a message naming what was found instead
    pub fn typed(&self) -> std::result::Result<&T, String> {
        match self {
            Self::Valid(value) => Ok(value),
            Self::Invalid(found) => Err(format!("expected {}, found {found}", T::EXPECTED)),
        }
    }

    pub fn valid(&self) -> Option<&T> {
        match self {
            Self::Valid(value) => Some(value),
            Self::Invalid(_) => None,
        }
    }
}

/// A field that has to be present and well-typed
pub fn required<T: FieldType>(field: &Option<Field<T>>) -> std::result::Result<&T, String> {
    field
        .as_ref()
        .ok_or_else(|| "missing required field".to_string())?
        .typed()
}

/// A field that may be absent but has to be well-typed when present
pub fn optional<T: FieldType>(
    field: &Option<Field<T>>,
) -> std::result::Result<Option<&T>, String> {
    field.as_ref().map(Field::typed).transpose()
}

/// Top-level network intent document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentDocument {
    pub devices: Vec<DeviceDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceDocument {
    #[serde(default)]
    pub name: Option<Field<String>>,
    #[serde(default)]
    pub device_type: Option<Field<String>>,
    #[serde(default)]
    pub loopbacks: Vec<LoopbackDocument>,
    #[serde(default)]
    pub bgp: Option<BgpDocument>,
    #[serde(default)]
    pub delete_unmanaged_loopbacks: Option<Field<bool>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoopbackDocument {
    #[serde(default)]
    pub id: Option<Field<i64>>,
    #[serde(default)]
    pub ipv4: Option<Field<String>>,
    #[serde(default)]
    pub netmask: Option<Field<String>>,
    #[serde(default)]
    pub description: Option<Field<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BgpDocument {
    #[serde(default)]
    pub asn: Option<Field<i64>>,
    #[serde(default)]
    pub router_id: Option<Field<String>>,
    #[serde(default)]
    pub neighbors: Vec<BgpNeighborDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BgpNeighborDocument {
    #[serde(default)]
    pub ip: Option<Field<String>>,
    #[serde(default)]
    pub remote_asn: Option<Field<i64>>,
    #[serde(default)]
    pub description: Option<Field<String>>,
    #[serde(default)]
    pub update_source: Option<Field<String>>,
}

/// Service deployment document: one service pushed to several devices
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceDeploymentDocument {
    #[serde(default)]
    pub service_type: Option<Field<String>>,
    #[serde(default)]
    pub target_devices: Vec<Field<String>>,
    #[serde(default)]
    pub bgp_config: Option<BgpPeeringDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BgpPeeringDocument {
    #[serde(default)]
    pub service_name: Option<Field<String>>,
    #[serde(default)]
    pub local_as: Option<Field<i64>>,
    #[serde(default)]
    pub router_id: Option<Field<String>>,
    #[serde(default)]
    pub neighbors: Vec<BgpPeerDocument>,
    #[serde(default)]
    pub import_policy: Option<Field<String>>,
    #[serde(default)]
    pub export_policy: Option<Field<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BgpPeerDocument {
    #[serde(default)]
    pub neighbor_ip: Option<Field<String>>,
    #[serde(default)]
    pub remote_as: Option<Field<i64>>,
    #[serde(default)]
    pub description: Option<Field<String>>,
    #[serde(default)]
    pub password: Option<Field<String>>,
    #[serde(default)]
    pub update_source: Option<Field<String>>,
}
