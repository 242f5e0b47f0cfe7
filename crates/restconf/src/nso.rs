//! RESTCONF client for a Cisco NSO controller.
//!
//! All requests are blocking and share one `ureq` agent configured with a
//! single timeout. The client owns that agent: [`NsoClient::close`] drops
//! it, after which every call fails with [`Error::Closed`].

use crate::client::{DeviceConfigClient, LoopbackConfig, RollbackFile, RollbackTarget};
use crate::device_config::{DeviceConfig, LoopbackSnapshot, loopback_entry};
use crate::error::{Error, ErrorCategory, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use ureq::Agent;
use ureq::tls::TlsConfig;

/// Media type for RESTCONF JSON payloads.
const YANG_JSON: &str = "application/yang-data+json";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for [`NsoClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub https: bool,
    /// Verify the controller's TLS certificate (ignored over plain HTTP).
    pub verify_tls: bool,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            https: false,
            verify_tls: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_https(mut self, https: bool) -> Self {
        self.https = https;
        self
    }

    #[must_use]
    pub fn with_verify_tls(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// RESTCONF root, e.g. `http://10.10.20.49:8080/restconf`.
    pub fn base_url(&self) -> String {
        let scheme = if self.https { "https" } else { "http" };
        format!("{scheme}://{}:{}/restconf", self.host, self.port)
    }

    fn authorization(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(credentials))
    }
}

/// Blocking RESTCONF client for NSO.
///
/// # Example
///
/// ```no_run
/// use restconf::{ClientConfig, DeviceConfigClient, NsoClient};
///
/// let mut client = NsoClient::new(ClientConfig::new("10.10.20.49", 8080, "developer", "C1sco12345"));
/// if client.health_check() {
///     println!("{:?}", client.devices()?);
/// }
/// client.close();
/// # Ok::<(), restconf::Error>(())
/// ```
pub struct NsoClient {
    agent: Option<Agent>,
    base_url: String,
    authorization: String,
}

impl NsoClient {
    /// Create a client. No request is made until the first call.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let mut builder = Agent::config_builder().timeout_global(Some(config.timeout));
        if config.https && !config.verify_tls {
            builder = builder.tls_config(TlsConfig::builder().disable_verification(true).build());
        }
        let agent: Agent = builder.build().into();

        log::debug!(
            "NSO client for {} (timeout {}s)",
            config.base_url(),
            config.timeout.as_secs()
        );

        Self {
            agent: Some(agent),
            base_url: config.base_url(),
            authorization: config.authorization(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Release the underlying connection pool. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.agent.take().is_some() {
            log::debug!("Closed NSO client for {}", self.base_url);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.agent.is_none()
    }

    fn agent(&self) -> Result<&Agent> {
        self.agent.as_ref().ok_or(Error::Closed)
    }

    fn device_url(&self, device: &str) -> String {
        format!("{}/data/tailf-ncs:devices/device={device}", self.base_url)
    }

    fn interface_url(&self, device: &str) -> String {
        format!(
            "{}/config/tailf-ned-cisco-ios:interface",
            self.device_url(device)
        )
    }

    fn get_json(&self, url: &str) -> Result<Value> {
        log::debug!("GET {url}");
        self.agent()?
            .get(url)
            .header("Authorization", &self.authorization)
            .header("Accept", YANG_JSON)
            .call()
            .map_err(|e| Error::from_ureq("GET", url, e))?
            .body_mut()
            .read_json()
            .map_err(|e| Error::from_ureq("GET", url, e))
    }

    /// POST or PATCH a JSON body and return the response text (often empty).
    fn send(&self, method: &'static str, url: &str, payload: &Value) -> Result<String> {
        log::debug!("{method} {url}");
        let agent = self.agent()?;
        let body = payload.to_string();
        let request = match method {
            "PATCH" => agent.patch(url),
            _ => agent.post(url),
        };
        request
            .header("Authorization", &self.authorization)
            .header("Accept", YANG_JSON)
            .header("Content-Type", YANG_JSON)
            .send(body)
            .map_err(|e| Error::from_ureq(method, url, e))?
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::from_ureq(method, url, e))
    }

    fn delete(&self, url: &str) -> Result<()> {
        log::debug!("DELETE {url}");
        self.agent()?
            .delete(url)
            .header("Authorization", &self.authorization)
            .call()
            .map_err(|e| Error::from_ureq("DELETE", url, e))?;
        Ok(())
    }
}

impl Drop for NsoClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Merge payload placing one loopback under the NED interface container.
///
/// Fields left out of the payload keep their current value on the device.
fn loopback_payload(loopback: &LoopbackConfig) -> Value {
    let snapshot = LoopbackSnapshot {
        ip: Some(loopback.ip.clone()),
        netmask: Some(loopback.netmask.clone()),
        description: loopback.description.clone(),
    };
    json!({
        "tailf-ned-cisco-ios:interface": {
            "Loopback": [loopback_entry(&loopback.id.to_string(), &snapshot)]
        }
    })
}

fn parse_body(url: &str, text: &str) -> Result<Option<Value>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text)
        .map(Some)
        .map_err(|e| Error::InvalidResponse {
            url: url.to_string(),
            message: e.to_string(),
        })
}

/// `tailf-restconf:result / rollback / id` from a commit response.
fn rollback_id(result: &Value) -> Option<u64> {
    let id = result.pointer("/tailf-restconf:result/rollback/id")?;
    id.as_u64()
        .or_else(|| id.as_str().and_then(|s| s.parse().ok()))
}

impl DeviceConfigClient for NsoClient {
    fn health_check(&self) -> bool {
        let url = format!("{}/data/tailf-ncs:devices", self.base_url);
        match self.get_json(&url) {
            Ok(_) => true,
            Err(e) => {
                log::error!("Health check failed: {e}");
                false
            }
        }
    }

    fn devices(&self) -> Result<Vec<String>> {
        let url = format!("{}/data/tailf-ncs:devices/device", self.base_url);
        let result: DeviceList =
            serde_json::from_value(self.get_json(&url)?).map_err(|e| Error::InvalidResponse {
                url,
                message: e.to_string(),
            })?;
        Ok(result.devices.into_iter().map(|d| d.name).collect())
    }

    fn sync_from_device(&self, device: &str) -> bool {
        let url = format!("{}/sync-from", self.device_url(device));
        log::info!("Syncing configuration from {device}");
        let response = self
            .send("POST", &url, &json!({ "input": {} }))
            .and_then(|text| parse_body(&url, &text));
        match response {
            Ok(output) => {
                // The action answers 200 even when the device is unreachable
                let ok = output
                    .as_ref()
                    .and_then(|v| v.pointer("/tailf-ncs:output/result"))
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                if !ok {
                    log::error!("Sync from {device} reported failure");
                }
                ok
            }
            Err(e) => {
                log::error!("Sync from {device} failed: {e}");
                false
            }
        }
    }

    fn device_config(&self, device: &str) -> Option<DeviceConfig> {
        let url = format!("{}/config", self.device_url(device));
        match self.get_json(&url) {
            Ok(tree) => Some(DeviceConfig::new(tree)),
            Err(e) => {
                log::error!("Failed to read configuration of {device}: {e}");
                None
            }
        }
    }

    fn configure_loopback(&self, device: &str, loopback: &LoopbackConfig) -> Result<()> {
        let url = self.interface_url(device);
        log::info!(
            "Configuring Loopback{} on {device}: {}/{}",
            loopback.id,
            loopback.ip,
            loopback.netmask
        );
        self.send("PATCH", &url, &loopback_payload(loopback))?;
        Ok(())
    }

    fn configure_loopback_dry_run(
        &self,
        device: &str,
        loopback: &LoopbackConfig,
    ) -> Result<Value> {
        let url = format!("{}?dry-run=native", self.interface_url(device));
        log::info!("[DRY-RUN] Configuring Loopback{} on {device}", loopback.id);
        let text = self.send("PATCH", &url, &loopback_payload(loopback))?;
        Ok(parse_body(&url, &text)?.unwrap_or_else(|| json!({ "status": "no-changes" })))
    }

    fn configure_loopback_tracked(
        &self,
        device: &str,
        loopback: &LoopbackConfig,
    ) -> Result<Option<u64>> {
        let url = format!("{}?rollback-id=true", self.interface_url(device));
        log::info!(
            "Configuring Loopback{} on {device} with rollback tracking",
            loopback.id
        );
        let text = self.send("PATCH", &url, &loopback_payload(loopback))?;
        let id = parse_body(&url, &text)?.as_ref().and_then(rollback_id);
        if id.is_none() {
            log::warn!("Loopback{} configured but no rollback id in response", loopback.id);
        }
        Ok(id)
    }

    fn delete_loopback(&self, device: &str, id: &str) -> Result<()> {
        let url = format!("{}/Loopback={id}", self.interface_url(device));
        log::info!("Deleting Loopback{id} from {device}");
        self.delete(&url)
    }

    fn delete_loopback_description(&self, device: &str, id: &str) -> Result<()> {
        let url = format!("{}/Loopback={id}/description", self.interface_url(device));
        log::info!("Removing description of Loopback{id} on {device}");
        match self.delete(&url) {
            Err(e) if e.category() == ErrorCategory::NotFound => {
                log::debug!("Loopback{id} on {device} has no description");
                Ok(())
            }
            other => other,
        }
    }

    fn rollback(&self, target: RollbackTarget) -> Result<()> {
        let url = format!(
            "{}/data/tailf-rollback:rollback-files/apply-rollback-file",
            self.base_url
        );
        let input = match target {
            RollbackTarget::Relative(id) => json!({ "input": { "id": id } }),
            RollbackTarget::Fixed(number) => json!({ "input": { "fixed-number": number } }),
        };
        log::warn!("Applying {target}");
        self.send("POST", &url, &input)?;
        Ok(())
    }

    fn rollback_files(&self) -> Result<Vec<RollbackFile>> {
        let url = format!("{}/data/tailf-rollback:rollback-files", self.base_url);
        let result: RollbackFiles =
            serde_json::from_value(self.get_json(&url)?).map_err(|e| Error::InvalidResponse {
                url,
                message: e.to_string(),
            })?;
        Ok(result
            .container
            .map(|c| c.file.into_iter().map(Into::into).collect())
            .unwrap_or_default())
    }
}

// =============================================================================
// NSO response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(rename = "tailf-ncs:device", default)]
    devices: Vec<DeviceEntry>,
}

#[derive(Debug, Deserialize)]
struct DeviceEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RollbackFiles {
    #[serde(rename = "tailf-rollback:rollback-files")]
    container: Option<RollbackFileList>,
}

#[derive(Debug, Deserialize)]
struct RollbackFileList {
    #[serde(default)]
    file: Vec<NsoRollbackFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct NsoRollbackFile {
    id: u32,
    fixed_number: u64,
    creator: Option<String>,
    date: Option<String>,
    via: Option<String>,
    label: Option<String>,
    comment: Option<String>,
}

impl From<NsoRollbackFile> for RollbackFile {
    fn from(f: NsoRollbackFile) -> Self {
        Self {
            id: f.id,
            fixed_number: f.fixed_number,
            creator: f.creator,
            date: f.date,
            via: f.via,
            label: f.label,
            comment: f.comment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::new("10.10.20.49", 8080, "developer", "C1sco12345")
    }

    #[test]
    fn test_base_url() {
        assert_eq!(config().base_url(), "http://10.10.20.49:8080/restconf");
        assert_eq!(
            config().with_https(true).base_url(),
            "https://10.10.20.49:8080/restconf"
        );
    }

    #[test]
    fn test_basic_auth_header() {
        // base64("developer:C1sco12345")
        assert_eq!(
            config().authorization(),
            "Basic ZGV2ZWxvcGVyOkMxc2NvMTIzNDU="
        );
    }

    #[test]
    fn test_urls() {
        let client = NsoClient::new(config());
        assert_eq!(
            client.interface_url("dist-rtr01"),
            "http://10.10.20.49:8080/restconf/data/tailf-ncs:devices/device=dist-rtr01/config/tailf-ned-cisco-ios:interface"
        );
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut client = NsoClient::new(config());
        assert!(!client.is_closed());
        client.close();
        client.close();
        assert!(client.is_closed());

        assert!(matches!(client.devices(), Err(Error::Closed)));
        assert!(!client.health_check());
        assert!(client.device_config("r1").is_none());
        let lb = LoopbackConfig::new(1, "10.0.0.1", "255.255.255.255");
        assert!(matches!(
            client.configure_loopback("r1", &lb),
            Err(Error::Closed)
        ));
    }

    #[test]
    fn test_loopback_payload_shape() {
        let lb = LoopbackConfig::new(100, "10.100.100.1", "255.255.255.255").with_description("Mgmt");
        let payload = loopback_payload(&lb);
        let entry = &payload["tailf-ned-cisco-ios:interface"]["Loopback"][0];
        assert_eq!(entry["name"], 100);
        assert_eq!(entry["description"], "Mgmt");
        assert_eq!(entry["ip"]["address"]["primary"]["mask"], "255.255.255.255");
    }

    #[test]
    fn test_rollback_id_extraction() {
        let body = json!({"tailf-restconf:result": {"rollback": {"id": 10042}}});
        assert_eq!(rollback_id(&body), Some(10042));
        let body = json!({"tailf-restconf:result": {"rollback": {"id": "10043"}}});
        assert_eq!(rollback_id(&body), Some(10043));
        assert_eq!(rollback_id(&json!({})), None);
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body("u", "  ").unwrap(), None);
        assert!(parse_body("u", "{}").unwrap().is_some());
        assert!(matches!(
            parse_body("u", "not json"),
            Err(Error::InvalidResponse { .. })
        ));
    }

    #[test]
    fn test_rollback_files_wire_shape() {
        let files: RollbackFiles = serde_json::from_value(json!({
            "tailf-rollback:rollback-files": {
                "file": [{"id": 0, "fixed-number": 10042, "creator": "developer", "via": "rest"}]
            }
        }))
        .unwrap();
        let file: RollbackFile = files.container.unwrap().file.remove(0).into();
        assert_eq!(file.fixed_number, 10042);
        assert_eq!(file.creator.as_deref(), Some("developer"));
    }
}
