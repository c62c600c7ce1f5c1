use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use arxlink_common::types::{RequiredAccessory, Resolution};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/arxlink/config.toml";
pub const CONFIG_ENV: &str = "ARXLINK_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AccessoryIdConfig {
    pub vendor_id: String,
    pub product_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessoryConfig {
    pub vendor_id: String,
    pub product_id: String,
    pub resolution: Resolution,
    /// Further devices that must be present before the service starts.
    pub extra_required: Vec<AccessoryIdConfig>,
}

impl Default for AccessoryConfig {
    fn default() -> Self {
        Self {
            vendor_id: "1d6b".into(),
            product_id: "0104".into(),
            resolution: Resolution::Hd720,
            extra_required: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub command: String,
    pub args: Vec<String>,
    pub permission_denied_exit_code: i32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            command: "arxlink-capture".into(),
            args: Vec::new(),
            permission_denied_exit_code: 13,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    pub action_id: String,
    /// Privileged helper run with the headset's usbfs node once polkit
    /// authorizes, e.g. a setfacl wrapper. Without it the node must already
    /// be opened up by a udev rule.
    pub grant_command: Option<String>,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            action_id: "org.arxlink.device-access".into(),
            grant_command: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    pub url: String,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8080/rtc".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub accessory: AccessoryConfig,
    pub service: ServiceConfig,
    pub permission: PermissionConfig,
    pub signaling: SignalingConfig,
}

impl HostConfig {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// `$ARXLINK_CONFIG`, then the system path, then built-in defaults.
    pub fn load() -> Self {
        let path = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        match Self::read(path) {
            Ok(cfg) => {
                debug!(path = %path.display(), "config loaded");
                cfg
            }
            Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config unusable, using defaults");
                Self::default()
            }
        }
    }

    /// The headset first, then any extra required devices.
    pub fn required_accessories(&self) -> Vec<RequiredAccessory> {
        std::iter::once(RequiredAccessory::new(
            self.accessory.vendor_id.as_str(),
            self.accessory.product_id.as_str(),
        ))
        .chain(
            self.accessory
                .extra_required
                .iter()
                .map(|d| RequiredAccessory::new(d.vendor_id.as_str(), d.product_id.as_str())),
        )
        .collect()
    }
}
