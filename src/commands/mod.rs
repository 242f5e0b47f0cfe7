//! Command implementations
//!
//! Each command resolves its settings, builds what it needs and returns an
//! [`Outcome`]; `main` turns that into the process exit code. Commands that
//! talk to the controller split into a `run` that owns the [`NsoClient`] and
//! an inner function over `&dyn DeviceConfigClient` that tests drive with
//! [`restconf::MockClient`].

pub mod apply;
pub mod devices;
pub mod diff;
pub mod health;
pub mod history;
pub mod rollback;
pub mod sync;
pub mod validate;

use anyhow::{Context as _, Result, bail};
use intent::NetworkIntent;
use restconf::{DeviceConfigClient, NsoClient};
use std::path::Path;
use std::process::ExitCode;

use crate::config::NetintentConfig;

/// How a command ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Everything requested was done (or nothing needed doing)
    Success,
    /// At least one operation failed or the input was invalid
    Failed,
    /// A `--device` filter matched no device in the intent
    NoMatchingDevice,
}

impl Outcome {
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failed => 1,
            Self::NoMatchingDevice => 2,
        }
    }

    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(self.code())
    }

    pub fn from_success(success: bool) -> Self {
        if success { Self::Success } else { Self::Failed }
    }
}

/// Open a client for the configured controller
pub(crate) fn connect(config: &NetintentConfig) -> NsoClient {
    NsoClient::new(config.controller.to_client_config())
}

/// Fail early when the controller doesn't answer
///
/// Reads degrade to "no loopbacks" when the controller is down, which would
/// turn every declared loopback into a create.
pub(crate) fn ensure_reachable(client: &dyn DeviceConfigClient, target: &str) -> Result<()> {
    if !client.health_check() {
        bail!("NSO at {target} is not reachable");
    }
    Ok(())
}

/// Load an intent and apply the `--device` filter
///
/// Returns `None` when the filter matches no declared device.
pub(crate) fn load_intent(path: &Path, devices: &[String]) -> Result<Option<NetworkIntent>> {
    let intent = NetworkIntent::load(path)
        .with_context(|| format!("Failed to load intent from {}", path.display()))?;
    log::info!(
        "Loaded intent: {} devices, {} loopbacks",
        intent.devices().len(),
        intent.loopback_count()
    );

    let selected = intent.select(devices);
    if selected.is_none() {
        log::warn!("No device in the intent matches: {}", devices.join(", "));
    }
    Ok(selected)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Two devices; r1 keeps undeclared loopbacks, r2 deletes them
    pub const INTENT: &str = r"
devices:
  - name: r1
    device_type: ios-xe
    loopbacks:
      - id: 100
        ipv4: 10.0.0.1
        netmask: 255.255.255.255
        description: Mgmt
  - name: r2
    device_type: ios-xe
    delete_unmanaged_loopbacks: true
    loopbacks:
      - id: 100
        ipv4: 10.0.1.1
        netmask: 255.255.255.255
";

    /// Write `content` to a temp file with the given extension
    pub fn intent_file(content: &str, extension: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(&format!(".{extension}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_load_intent_with_filter() {
        let file = intent_file(INTENT, "yaml");

        let all = load_intent(file.path(), &[]).unwrap().unwrap();
        assert_eq!(all.devices().len(), 2);

        let r2 = load_intent(file.path(), &["r2".to_string()]).unwrap().unwrap();
        assert_eq!(r2.devices().len(), 1);
        assert!(r2.device("r2").is_some());

        assert!(load_intent(file.path(), &["r9".to_string()]).unwrap().is_none());
    }

    #[test]
    fn test_load_intent_reports_path() {
        let file = intent_file("devices: []\n", "yaml");
        let err = load_intent(file.path(), &[]).unwrap_err();
        assert!(format!("{err:#}").contains("at least one device is required"));
    }

    #[test]
    fn test_unreachable_controller_is_an_error() {
        let client = restconf::MockClient::new();
        assert!(ensure_reachable(&client, "mock").is_ok());
        client.set_unreachable(true);
        let err = ensure_reachable(&client, "mock").unwrap_err();
        assert!(err.to_string().contains("not reachable"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(Outcome::Success.code(), 0);
        assert_eq!(Outcome::from_success(false), Outcome::Failed);
        assert_eq!(Outcome::Failed.code(), 1);
        assert_eq!(Outcome::NoMatchingDevice.code(), 2);
    }
}
