//! Shared configuration for the MAAS network tools.
//!
//! One TOML file plus `MAAS_`-prefixed environment overrides, translated
//! into the `maas_core` runtime types. The CLI layers its own flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use maas_core::{BootConfig, CoreConfig, HostMapAgentConfig, TlsVerification};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub allocation: Allocation,

    #[serde(default)]
    pub dhcp: Dhcp,

    #[serde(default)]
    pub boot: Boot,

    #[serde(default)]
    pub inventory: InventorySection,
}

/// Output preferences.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Allocation {
    #[serde(default = "default_max_pick_attempts")]
    pub max_pick_attempts: u32,
}

impl Default for Allocation {
    fn default() -> Self {
        Self {
            max_pick_attempts: default_max_pick_attempts(),
        }
    }
}

fn default_max_pick_attempts() -> u32 {
    maas_core::config::DEFAULT_MAX_PICK_ATTEMPTS
}

/// The DHCP agent receiving host maps. Without `agent_url` host-map
/// calls are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Dhcp {
    /// Agent base URL (e.g., "https://rack01:5248").
    pub agent_url: Option<String>,

    #[serde(default = "default_agent_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub insecure: bool,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,
}

impl Default for Dhcp {
    fn default() -> Self {
        Self {
            agent_url: None,
            timeout: default_agent_timeout(),
            insecure: false,
            ca_cert: None,
        }
    }
}

fn default_agent_timeout() -> u64 {
    30
}

/// Where the ARM64 GRUB package is downloaded from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Boot {
    #[serde(default = "default_ports_archive")]
    pub ports_archive: String,

    #[serde(default = "default_release")]
    pub release: String,

    #[serde(default = "default_package")]
    pub package: String,

    #[serde(default = "default_component")]
    pub component: String,

    #[serde(default = "default_arch")]
    pub arch: String,

    #[serde(default = "default_boot_timeout")]
    pub timeout: u64,
}

impl Default for Boot {
    fn default() -> Self {
        Self {
            ports_archive: default_ports_archive(),
            release: default_release(),
            package: default_package(),
            component: default_component(),
            arch: default_arch(),
            timeout: default_boot_timeout(),
        }
    }
}

fn default_ports_archive() -> String {
    maas_core::config::DEFAULT_PORTS_ARCHIVE.into()
}
fn default_release() -> String {
    maas_core::config::DEFAULT_RELEASE.into()
}
fn default_package() -> String {
    maas_core::config::DEFAULT_BOOT_PACKAGE.into()
}
fn default_component() -> String {
    maas_core::config::DEFAULT_COMPONENT.into()
}
fn default_arch() -> String {
    maas_core::config::DEFAULT_ARCH.into()
}
fn default_boot_timeout() -> u64 {
    120
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct InventorySection {
    /// Inventory JSON file used when `--inventory` is not given.
    pub path: Option<PathBuf>,
}

// ── Translation to runtime config ───────────────────────────────────

impl Config {
    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            max_pick_attempts: self.allocation.max_pick_attempts.max(1),
        }
    }

    /// `None` when no agent is configured.
    pub fn host_map_agent(&self) -> Result<Option<HostMapAgentConfig>, ConfigError> {
        let Some(raw) = self.dhcp.agent_url.as_deref() else {
            return Ok(None);
        };
        let url = parse_url("dhcp.agent_url", raw)?;

        let tls = if self.dhcp.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.dhcp.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        Ok(Some(HostMapAgentConfig {
            url,
            tls,
            timeout: Duration::from_secs(self.dhcp.timeout),
        }))
    }

    pub fn boot_config(&self) -> Result<BootConfig, ConfigError> {
        let boot = &self.boot;
        Ok(BootConfig {
            ports_archive: parse_url("boot.ports_archive", &boot.ports_archive)?,
            release: boot.release.clone(),
            package: boot.package.clone(),
            component: boot.component.clone(),
            arch: boot.arch.clone(),
            timeout: Duration::from_secs(boot.timeout),
        })
    }

    /// The configured inventory file, or `inventory.json` in the platform
    /// data directory.
    pub fn inventory_path(&self) -> PathBuf {
        self.inventory.path.clone().unwrap_or_else(default_inventory_path)
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|e| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "maas", "maas-netctl")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

pub fn default_inventory_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".local/share").join("inventory.json"),
        |dirs| dirs.data_dir().join("inventory.json"),
    )
}

fn dirs_fallback(base: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(base);
    p.push("maas-netctl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` (missing files are fine) + environment.
///
/// Environment keys nest on a double underscore, e.g.
/// `MAAS_DHCP__AGENT_URL` or `MAAS_ALLOCATION__MAX_PICK_ATTEMPTS`.
/// Single-segment `MAAS_*` variables belong to the CLI and are ignored.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(
            Env::prefixed("MAAS_")
                .filter(|key| key.as_str().contains("__"))
                .split("__"),
        );

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it can't be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
