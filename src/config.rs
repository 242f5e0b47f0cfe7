//! Controller and apply settings
//!
//! Settings are layered: built-in defaults, then `config.toml` (from
//! `--config` or the config directory), then command-line flags and their
//! `NSO_*` environment variables.
//!
//! ```toml
//! [controller]
//! host = "10.10.20.49"
//! port = 8080
//! username = "developer"
//! password = "C1sco12345"
//! https = false
//! verify_tls = true
//! timeout_secs = 30
//!
//! [apply]
//! jobs = 4
//! track_rollback = true
//! verify = true
//! ```

use crate::cli::ControllerArgs;
use crate::paths;
use anyhow::{Context, Result, bail};
use restconf::ClientConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Config Structures
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetintentConfig {
    pub controller: ControllerConfig,
    pub apply: ApplyDefaults,
}

/// Where and how to reach NSO
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub https: bool,
    pub verify_tls: bool,
    pub timeout_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            host: "10.10.20.49".to_string(),
            port: 8080,
            username: "developer".to_string(),
            password: "C1sco12345".to_string(),
            https: false,
            verify_tls: true,
            timeout_secs: restconf::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// Defaults for `apply`; flags override them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyDefaults {
    pub jobs: usize,
    pub track_rollback: bool,
    pub verify: bool,
}

impl Default for ApplyDefaults {
    fn default() -> Self {
        Self {
            jobs: 1,
            track_rollback: false,
            verify: true,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

impl NetintentConfig {
    /// Read a config file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolve the effective configuration for this invocation
    ///
    /// An explicit `--config` file must exist; the default file is optional.
    pub fn resolve(args: &ControllerArgs) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load_file(path)?,
            None => {
                let path = paths::config_file()?;
                if path.exists() {
                    Self::load_file(&path)?
                } else {
                    log::debug!("No config file at {}, using defaults", path.display());
                    Self::default()
                }
            }
        };
        config.controller.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.controller.host.trim().is_empty() {
            bail!("controller host must not be empty");
        }
        if self.controller.timeout_secs == 0 {
            bail!("controller timeout must be at least 1 second");
        }
        if self.apply.jobs == 0 {
            bail!("apply.jobs must be at least 1");
        }
        Ok(())
    }
}

impl ControllerConfig {
    fn apply_args(&mut self, args: &ControllerArgs) {
        if let Some(host) = &args.host {
            self.host.clone_from(host);
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(username) = &args.username {
            self.username.clone_from(username);
        }
        if let Some(password) = &args.password {
            self.password.clone_from(password);
        }
        if let Some(timeout) = args.timeout {
            self.timeout_secs = timeout;
        }
        if args.https {
            self.https = true;
        }
        if args.insecure {
            self.verify_tls = false;
        }
    }

    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.host, self.port, &self.username, &self.password)
            .with_https(self.https)
            .with_verify_tls(self.verify_tls)
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }
}
