//! # Restconf
//!
//! Device-configuration client for a Cisco NSO controller.
//!
//! The [`DeviceConfigClient`] trait covers what reconciliation needs from
//! the controller: reading a device's stored configuration, pulling the
//! running configuration from the device, creating, updating and deleting
//! loopback interfaces, and applying rollback files.
//!
//! Two implementations are provided:
//!
//! - [`NsoClient`] speaks RESTCONF over HTTP(S) with basic authentication
//! - [`MockClient`] keeps an in-memory controller for tests
//!
//! Configuration trees are read through [`DeviceConfig`], which maps the
//! NED-specific JSON shape onto typed values and reports a [`ShapeError`]
//! naming the missing or malformed path instead of silently returning
//! nothing.
//!
//! ## Example
//!
//! ```no_run
//! use restconf::{ClientConfig, DeviceConfigClient, NsoClient};
//!
//! let client = NsoClient::new(ClientConfig::new("10.10.20.49", 8080, "developer", "C1sco12345"));
//! client.sync_from_device("dist-rtr01");
//! if let Some(config) = client.device_config("dist-rtr01") {
//!     match config.loopbacks() {
//!         Ok(loopbacks) => println!("{} loopbacks", loopbacks.len()),
//!         Err(reason) => println!("no loopbacks: {reason}"),
//!     }
//! }
//! ```

mod client;
mod device_config;
mod error;
mod mock;
mod nso;

pub use client::{DeviceConfigClient, LoopbackConfig, RollbackFile, RollbackTarget};
pub use device_config::{
    DeviceConfig, LoopbackMap, LoopbackSnapshot, ShapeError, loopback_entry, loopback_tree,
};
pub use error::{Error, ErrorCategory, Result};
pub use mock::{MockCall, MockClient};
pub use nso::{ClientConfig, DEFAULT_TIMEOUT, NsoClient};
