//! Settings as supplied by the host's preference store.
//!
//! The host keeps these as loose strings (the timeout included), so every
//! field has a default and the conversion to an [`EndpointConfig`] is where
//! validation happens.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::digest::ClientNonce;
use crate::endpoint::{EndpointConfig, DEFAULT_GET_CONFIG_PATH, DEFAULT_SET_CONFIG_PATH, DEFAULT_TIMEOUT_SECS};
use crate::error::EndpointError;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraSettings {
    pub username: String,
    pub password: String,
    /// `host` or `host:port`.
    pub ip_address: String,
    pub get_config_path: String,
    pub set_config_path: String,
    pub timeout_seconds: String,
    pub client_nonce: ClientNonce,
    /// Home network name; background refreshes only run while connected to
    /// a network whose name starts with it. Empty disables them.
    pub wifi_name: String,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            username: "ipc".to_string(),
            password: "pass".to_string(),
            ip_address: "192.168.1.100".to_string(),
            get_config_path: DEFAULT_GET_CONFIG_PATH.to_string(),
            set_config_path: DEFAULT_SET_CONFIG_PATH.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS.to_string(),
            client_nonce: ClientNonce::default(),
            wifi_name: String::new(),
        }
    }
}

impl CameraSettings {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Combined endpoint string, `http://user:password@ip`.
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}@{}", self.username, self.password, self.ip_address.trim())
    }

    /// Timeout in whole seconds. Unparseable or zero values fall back to
    /// the default.
    pub fn timeout_secs(&self) -> u64 {
        match self.timeout_seconds.trim().parse::<u64>() {
            Ok(secs) if secs >= 1 => secs,
            _ => {
                log::warn!(
                    "invalid timeout {:?}, using {DEFAULT_TIMEOUT_SECS}s",
                    self.timeout_seconds
                );
                DEFAULT_TIMEOUT_SECS
            }
        }
    }

    /// Whether `current_ssid` is the configured home network. The platform
    /// may report the name wrapped in double quotes; the comparison is a
    /// case-insensitive prefix match.
    pub fn is_home_network(&self, current_ssid: &str) -> bool {
        let target = self.wifi_name.trim();
        if target.is_empty() {
            return false;
        }
        let ssid = current_ssid.trim();
        let ssid = ssid
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(ssid);
        ssid.get(..target.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(target))
    }

    pub fn to_config(&self) -> Result<EndpointConfig, EndpointError> {
        EndpointConfig::parse(&self.endpoint())?
            .with_paths(&self.get_config_path, &self.set_config_path)
            .with_timeout_secs(self.timeout_secs())
            .map(|config| config.with_client_nonce(self.client_nonce))
    }
}

impl fmt::Debug for CameraSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraSettings")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("ip_address", &self.ip_address)
            .field("get_config_path", &self.get_config_path)
            .field("set_config_path", &self.set_config_path)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("client_nonce", &self.client_nonce)
            .field("wifi_name", &self.wifi_name)
            .finish()
    }
}
