//! Driver configuration file.
//!
//! YAML, looked up through `OVIRT_FLEXDRIVER_CONF` or next to the
//! executable:
//!
//! ```yaml
//! url: https://engine.lab.local/ovirt-engine/api
//! username: admin@internal
//! password: secret
//! insecure: false
//! cafile: /etc/ovirt/ca.pem
//! vmName: worker-1
//! ```

use ovirt_volume::token_store::DEFAULT_TOKEN_PATH;
use ovirt_volume::{ConnectionConfig, ExpiryScheme, OvirtError, OvirtResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "OVIRT_FLEXDRIVER_CONF";
pub const CONFIG_FILE_NAME: &str = "ovirt-flexdriver.conf";

/// Contents of the driver configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default, rename = "cafile")]
    pub ca_file: Option<PathBuf>,
    /// Engine VM this host runs in
    #[serde(default, alias = "ovirtVmName")]
    pub vm_name: String,
    #[serde(default = "default_token_store_path")]
    pub token_store_path: PathBuf,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub expiry_scheme: ExpiryScheme,
}

fn default_token_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_TOKEN_PATH)
}

fn default_timeout_secs() -> u64 {
    30
}

impl DriverConfig {
    pub fn from_yaml(text: &str) -> OvirtResult<Self> {
        let cfg: Self = serde_yaml::from_str(text)
            .map_err(|e| OvirtError::config(format!("Invalid driver config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Host-local callouts search VMs by this name; an empty one matches any VM.
    fn validate(&self) -> OvirtResult<()> {
        if self.vm_name.trim().is_empty() {
            return Err(OvirtError::config("Invalid driver config: vmName is required"));
        }
        Ok(())
    }

    /// Read and parse `path`. Errors name the file.
    pub fn load(path: &Path) -> OvirtResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            OvirtError::config(format!("{e} file is {}", path.display()))
        })?;
        Self::from_yaml(&text).map_err(|e| {
            OvirtError::config(format!("{} file is {}", e.message, path.display()))
        })
    }

    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            insecure: self.insecure,
            ca_file: self.ca_file.clone(),
            timeout_secs: self.timeout_secs,
            expiry_scheme: self.expiry_scheme,
            ..Default::default()
        }
    }
}

/// `ovirt-flexdriver.conf` in the directory of the running executable.
pub fn default_config_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}
