//! Bridge configuration

use crate::errors::ConfigError;
use crate::screen::ScreenRule;
use crate::types::{Law, LinkRole};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment prefix for overrides, e.g. `GSM_BRIDGE__LINKS__0__PORT__BLOCKED`
pub const ENV_PREFIX: &str = "GSM_BRIDGE";

/// Complete bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// MNCC links, one connection manager each
    pub links: Vec<LinkConfig>,
}

/// One MNCC link towards a GSM stack instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Link name used in logs and voice socket names
    pub name: String,
    /// Network (BSC) or mobile-station side
    pub role: LinkRole,
    /// Well-known MNCC socket of the GSM stack
    pub socket_path: PathBuf,
    /// Constant reconnect delay in seconds
    pub retry_interval_secs: u64,
    /// Directory holding the voice channel sockets
    pub voice_socket_dir: PathBuf,
    /// Number of voice channels in the pool
    pub voice_channels: usize,
    /// Port settings applied to every call on this link
    pub port: PortSettings,
}

/// Per-port call handling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortSettings {
    /// Interface name reported in identities
    pub interface: String,
    /// Port number reported in identities
    pub port_number: u32,
    /// Administratively blocked
    pub blocked: bool,
    /// Local tone generation, connects the voice path early on the called side
    pub tones: bool,
    /// Bridge the voice path on remote proceeding/alerting
    pub early_b: bool,
    /// Line encoding of the voice transport
    pub law: Law,
    /// Dial string prefix marking emergency calls
    pub emergency_prefix: String,
    /// Outbound identity screening
    pub screen_out: Vec<ScreenRule>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            links: vec![LinkConfig::default()],
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            name: "ms".to_string(),
            role: LinkRole::MobileStation,
            socket_path: PathBuf::from("/tmp/ms_mncc"),
            retry_interval_secs: 5,
            voice_socket_dir: PathBuf::from("/tmp/gsm-bridge"),
            voice_channels: 30,
            port: PortSettings::default(),
        }
    }
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            interface: "gsm".to_string(),
            port_number: 0,
            blocked: false,
            tones: false,
            early_b: false,
            law: Law::Alaw,
            emergency_prefix: "emerg".to_string(),
            screen_out: Vec::new(),
        }
    }
}

impl LinkConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

impl BridgeConfig {
    /// Load configuration from a file, with environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;
        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse configuration from a TOML document
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.links.is_empty() {
            return Err(ConfigError::Invalid("no links configured".to_string()));
        }
        for (i, link) in self.links.iter().enumerate() {
            if link.voice_channels == 0 {
                return Err(ConfigError::Invalid(format!(
                    "link {} has no voice channels",
                    link.name
                )));
            }
            if link.retry_interval_secs == 0 {
                return Err(ConfigError::Invalid(format!(
                    "link {} has zero retry interval",
                    link.name
                )));
            }
            if self.links[..i].iter().any(|other| other.name == link.name) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate link name {}",
                    link.name
                )));
            }
        }
        Ok(())
    }
}
