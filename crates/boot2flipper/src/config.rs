//! Device configuration: network setup, partition scheme, and SD-backed payload paths.
//!
//! Grounded in the original firmware's `config/config.c` / `config/config.h`, with the
//! DHCP-vs-static distinction folded into a tagged `Option<StaticIpConfig>` rather than a
//! separate `dhcp: bool` plus four always-present strings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How the synthesised disk is partitioned. Mirrors [`hadris_part::PartitionScheme`]; kept as
/// a separate, serde-derivable type so the lower partition-table layer stays free of a serde
/// dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionSchemeConfig {
    MbrOnly,
    #[default]
    GptOnly,
}

impl From<PartitionSchemeConfig> for hadris_part::PartitionScheme {
    fn from(value: PartitionSchemeConfig) -> Self {
        match value {
            PartitionSchemeConfig::MbrOnly => hadris_part::PartitionScheme::MbrOnly,
            PartitionSchemeConfig::GptOnly => hadris_part::PartitionScheme::GptOnly,
        }
    }
}

/// Static IPv4 network parameters. Presence of this struct on a [`DeviceConfig`] (instead of a
/// `dhcp: bool`) is what selects static-IP script generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticIpConfig {
    pub ip_addr: String,
    pub subnet_mask: String,
    pub gateway: String,
    pub dns: String,
}

impl Default for StaticIpConfig {
    fn default() -> Self {
        Self {
            ip_addr: "192.168.1.10".into(),
            subnet_mask: "255.255.255.0".into(),
            gateway: "192.168.1.1".into(),
            dns: "8.8.8.8".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// `None` means DHCP; `Some` selects static IP configuration with these parameters.
    #[serde(default)]
    pub static_ip: Option<StaticIpConfig>,
    /// Network interface name (e.g. "net0", "net1"); `None`, empty, or `"auto"` all mean
    /// auto-detect. See [`DeviceConfig::resolved_interface`].
    #[serde(default)]
    pub network_interface: Option<String>,
    #[serde(default = "default_chainload_url")]
    pub chainload_url: String,
    #[serde(default = "default_true")]
    pub chainload_enabled: bool,
    #[serde(default)]
    pub partition_scheme: PartitionSchemeConfig,
    /// Path (on the host filesystem building the image) to the UEFI/BIOS loader binary served
    /// as an external file. `None` omits the loader from the generated disk.
    #[serde(default)]
    pub loader_path: Option<PathBuf>,
    /// Extra files to copy onto the virtual disk, as `(disk_path, host_path)` pairs; disk paths
    /// may contain `/` to place the file under a synthesised subdirectory.
    #[serde(default)]
    pub extra_files: Vec<(String, PathBuf)>,
}

fn default_chainload_url() -> String {
    "http://boot.ipxe.org/demo/boot.php".into()
}

fn default_true() -> bool {
    true
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            static_ip: None,
            network_interface: Some("auto".into()),
            chainload_url: default_chainload_url(),
            chainload_enabled: true,
            partition_scheme: PartitionSchemeConfig::default(),
            loader_path: None,
            extra_files: Vec::new(),
        }
    }
}

impl DeviceConfig {
    /// The network interface to use in a generated script: the configured name unless it is
    /// absent, empty, or the literal `"auto"`, in which case `"net0"`.
    ///
    /// The original firmware's static-IP script generator reads `has_interface` before it is
    /// ever assigned, an undefined-behaviour bug this crate does not reproduce; this method is
    /// the single, well-defined resolution rule used by both DHCP and static-IP scripts.
    pub fn resolved_interface(&self) -> &str {
        match self.network_interface.as_deref() {
            None | Some("") | Some("auto") => "net0",
            Some(name) => name,
        }
    }

    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&text).map_err(ConfigError::Parse)
    }

    pub fn save(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, text).map_err(ConfigError::Io)
    }

    /// Loads from `path`, falling back to [`DeviceConfig::default`] (with a warning) if the
    /// file is missing or malformed, per the error-handling design's config-load disposition.
    pub fn load_or_default(path: &std::path::Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(%err, path = %path.display(), "using default device configuration");
                Self::default()
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[source] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[source] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_interface_resolves_to_net0() {
        let config = DeviceConfig::default();
        assert_eq!(config.resolved_interface(), "net0");
    }

    #[test]
    fn empty_string_interface_resolves_to_net0() {
        let mut config = DeviceConfig::default();
        config.network_interface = Some(String::new());
        assert_eq!(config.resolved_interface(), "net0");
    }

    #[test]
    fn explicit_interface_is_kept() {
        let mut config = DeviceConfig::default();
        config.network_interface = Some("net1".into());
        assert_eq!(config.resolved_interface(), "net1");
    }

    #[test]
    fn round_trips_through_toml() {
        let mut config = DeviceConfig::default();
        config.static_ip = Some(StaticIpConfig::default());
        config.extra_files.push(("BOOTX64.EFI".into(), "/tmp/loader.efi".into()));

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: DeviceConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let config = DeviceConfig::load_or_default(std::path::Path::new("/nonexistent/b2f.toml"));
        assert_eq!(config, DeviceConfig::default());
    }
}
