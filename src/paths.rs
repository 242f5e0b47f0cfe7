//! Path resolution for netintent
//!
//! # Environment Variables
//!
//! - `NETINTENT_CONFIG_DIR` - Override config directory
//! - `NETINTENT_STATE_DIR` - Override state directory (rollback journal)
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `NETINTENT_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/netintent` (if set)
//! 3. `~/.config/netintent`
//!
//! For state_dir():
//! 1. `NETINTENT_STATE_DIR` environment variable
//! 2. `XDG_STATE_HOME/netintent` (if set)
//! 3. `~/.local/state/netintent`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "NETINTENT_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "NETINTENT_STATE_DIR";

const APP_DIR: &str = "netintent";

/// Get the netintent config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the netintent state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join(APP_DIR);
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Default config file: `<config_dir>/config.toml`
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Expand ~ and environment variables in a path string
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Run `f` with `key` set, restoring the previous value afterwards
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: tests touching a given variable don't run concurrently with readers of it
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: see above
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    fn without_env_var<F, R>(key: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: see with_env_var
        unsafe { env::remove_var(key) };
        let result = f();
        if let Some(v) = original {
            // SAFETY: see with_env_var
            unsafe { env::set_var(key, v) };
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/netintent/config", || {
            assert_eq!(
                config_dir().unwrap(),
                PathBuf::from("/custom/netintent/config")
            );
            assert_eq!(
                config_file().unwrap(),
                PathBuf::from("/custom/netintent/config/config.toml")
            );
        });
    }

    // Both cases share one test so they never race on NETINTENT_STATE_DIR
    #[test]
    fn test_state_dir_resolution() {
        let home = dirs::home_dir().unwrap();
        with_env_var(ENV_STATE_DIR, "~/netintent-state-test", || {
            assert_eq!(state_dir().unwrap(), home.join("netintent-state-test"));
        });

        without_env_var(ENV_STATE_DIR, || {
            with_env_var("XDG_STATE_HOME", "/tmp/xdg-state-netintent", || {
                assert_eq!(
                    state_dir().unwrap(),
                    PathBuf::from("/tmp/xdg-state-netintent/netintent")
                );
            });
        });
    }

    #[test]
    fn test_expand() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/intents/lab.yaml"), home.join("intents").join("lab.yaml"));
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
    }
}
