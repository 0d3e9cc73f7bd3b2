// ── Runtime configuration ──
//
// These types describe how the engine allocates and where the bootloader
// comes from. They never touch disk: maas-config loads the user's file and
// translates it into these, and tests build them directly.

use std::time::Duration;

use url::Url;

/// Default number of attempts at picking a free address before giving up.
pub const DEFAULT_MAX_PICK_ATTEMPTS: u32 = 5;

/// Tuning for the link engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// Attempts at picking a free address when a picked address collides
    /// with one allocated concurrently.
    pub max_pick_attempts: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_pick_attempts: DEFAULT_MAX_PICK_ATTEMPTS,
        }
    }
}

/// TLS verification strategy for outbound clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed agents in a lab).
    DangerAcceptInvalid,
}

impl TlsVerification {
    pub fn to_tls_mode(&self) -> maas_api::TlsMode {
        match self {
            Self::SystemDefaults => maas_api::TlsMode::System,
            Self::CustomCa(path) => maas_api::TlsMode::CustomCa(path.clone()),
            Self::DangerAcceptInvalid => maas_api::TlsMode::DangerAcceptInvalid,
        }
    }
}

/// Where host maps are pushed. Absent means the deployment runs no
/// managed DHCP and host-map calls become no-ops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMapAgentConfig {
    pub url: Url,
    pub tls: TlsVerification,
    pub timeout: Duration,
}

impl HostMapAgentConfig {
    pub fn transport(&self) -> maas_api::TransportConfig {
        maas_api::TransportConfig {
            tls: self.tls.to_tls_mode(),
            timeout: self.timeout,
        }
    }

    /// Build the HTTP client for this agent.
    pub fn connect(&self) -> Result<maas_api::DhcpAgentClient, crate::CoreError> {
        Ok(maas_api::DhcpAgentClient::new(
            self.url.clone(),
            &self.transport(),
        )?)
    }
}

pub const DEFAULT_PORTS_ARCHIVE: &str = "http://ports.ubuntu.com/ubuntu-ports";
pub const DEFAULT_RELEASE: &str = "noble";
pub const DEFAULT_BOOT_PACKAGE: &str = "grub-efi-arm64-bin";
pub const DEFAULT_COMPONENT: &str = "main";
pub const DEFAULT_ARCH: &str = "arm64";

/// Where the UEFI ARM64 bootloader package is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootConfig {
    pub ports_archive: Url,
    pub release: String,
    pub package: String,
    pub component: String,
    pub arch: String,
    pub timeout: Duration,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            // Constant, known to parse.
            ports_archive: Url::parse(DEFAULT_PORTS_ARCHIVE)
                .unwrap_or_else(|_| unreachable!("default archive URL is valid")),
            release: DEFAULT_RELEASE.into(),
            package: DEFAULT_BOOT_PACKAGE.into(),
            component: DEFAULT_COMPONENT.into(),
            arch: DEFAULT_ARCH.into(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl BootConfig {
    pub fn ports_archive_url(&self) -> &Url {
        &self.ports_archive
    }

    /// Archive client for this config's release, with strict TLS.
    pub fn archive_client(&self) -> Result<maas_api::ArchiveClient, crate::CoreError> {
        let transport = maas_api::TransportConfig {
            tls: maas_api::TlsMode::System,
            timeout: self.timeout,
        };
        Ok(maas_api::ArchiveClient::new(self.release.clone(), &transport)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_defaults_point_at_ports_archive() {
        let config = BootConfig::default();
        assert_eq!(
            config.ports_archive_url().as_str(),
            "http://ports.ubuntu.com/ubuntu-ports"
        );
        assert_eq!(config.package, "grub-efi-arm64-bin");
    }

    #[test]
    fn core_defaults_to_five_attempts() {
        assert_eq!(CoreConfig::default().max_pick_attempts, 5);
    }
}
