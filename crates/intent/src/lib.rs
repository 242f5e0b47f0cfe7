//! # Intent
//!
//! Typed, validated desired state for network devices.
//!
//! An intent document declares which devices exist, which loopback
//! interfaces each should carry, optional BGP peering, and whether
//! loopbacks not declared in the intent may be removed. This crate turns
//! such a document into immutable typed values, or reports every
//! constraint the document violates.
//!
//! ## Example
//!
//! ```no_run
//! use intent::NetworkIntent;
//! use std::path::Path;
//!
//! let intent = NetworkIntent::load(Path::new("intent/network_intent.yaml"))?;
//! for device in intent.devices() {
//!     println!("{} ({}): {} loopbacks", device.name(), device.device_type(), device.loopbacks().len());
//! }
//! # Ok::<(), intent::IntentError>(())
//! ```
//!
//! ## Validation
//!
//! - Interface addresses are dotted quads with a first octet in 1..=223
//! - Netmasks must be one of the 33 contiguous dotted-decimal masks
//! - Loopback descriptions reject `< > & " '`, and an empty one means none
//! - A missing or wrong-typed field is a violation like any other
//! - Hostnames allow alphanumerics, `-` and `_`
//! - Device names, loopback ids and neighbor addresses must be unique

pub mod document;
mod error;
pub mod model;
pub mod rules;
pub mod service;

pub use document::{DocumentFormat, IntentDocument, ServiceDeploymentDocument};
pub use error::{IntentError, Result, ValidationErrors, Violation};
pub use model::{BgpIntent, BgpNeighborIntent, DeviceIntent, DeviceType, LoopbackIntent, NetworkIntent};
pub use rules::Netmask;
pub use service::{BgpPeer, BgpPeeringService, ServiceDeploymentIntent, ServiceType};
