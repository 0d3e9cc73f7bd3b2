// ── UEFI ARM64 boot method ──
//
// ARM64 machines netboot a GRUB image built from the archive's
// `grub-efi-arm64-bin` package. The image embeds a small pre-loader
// configuration that chains to the per-machine GRUB config served over
// TFTP.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info};

use super::install::{CommandRunner, PackageSource, install_bootloader};
use super::{BootError, BootMethod, BootReader, KernelParameters};
use crate::config::BootConfig;

pub const CONFIG_FILE_ARM64: &str = "
# MAAS GRUB2 pre-loader configuration file

# Load based on MAC address first.
configfile (pxe)/grub/grub.cfg-${net_default_mac}

# Failed to load based on MAC address.
# Load arm64 by default, UEFI only supported by 64-bit
configfile (pxe)/grub/grub.cfg-default-arm64
";

/// GRUB modules compiled into the image.
pub const GRUB_MODULES: &[&str] = &[
    "part_gpt",
    "part_msdos",
    "ls",
    "tftp",
    "search",
    "search_fs_file",
    "search_fs_uuid",
    "search_label",
    "efinet",
    "normal",
    "configfile",
    "linux",
];

const NAME: &str = "uefi_arm64";
const BOOTLOADER_PATH: &str = "grubaa64.efi";
const ARCH_OCTET: &str = "00:0B";

pub struct UefiArm64BootMethod<S, R> {
    config: BootConfig,
    source: S,
    runner: R,
}

impl<S: PackageSource, R: CommandRunner> UefiArm64BootMethod<S, R> {
    pub fn new(config: BootConfig, source: S, runner: R) -> Self {
        Self {
            config,
            source,
            runner,
        }
    }

    pub fn config(&self) -> &BootConfig {
        &self.config
    }

    fn install_error(reason: impl Into<String>) -> BootError {
        BootError::BootMethodInstall {
            method: NAME,
            reason: reason.into(),
        }
    }

    async fn install(&self, dest: &Path) -> Result<PathBuf, BootError> {
        let config = &self.config;
        let archive = config.ports_archive_url();
        let Some((data, filename)) = self
            .source
            .get_updates_package(&config.package, archive, &config.component, &config.arch)
            .await?
        else {
            return Err(Self::install_error(format!(
                "Failed to get {} package from {archive}",
                config.package
            )));
        };
        let filename = Path::new(&filename)
            .file_name()
            .ok_or_else(|| Self::install_error(format!("bad package file name {filename:?}")))?
            .to_owned();

        // Dropped (and removed) on every return path.
        let tmp = tempfile::Builder::new()
            .prefix("maas-uefi-arm64-")
            .tempdir()
            .map_err(BootError::io("cannot create staging directory"))?;
        let root = tmp.path();
        debug!(staging = %root.display(), bytes = data.len(), "staging bootloader package");

        let package_path = root.join(&filename);
        tokio::fs::write(&package_path, &data)
            .await
            .map_err(BootError::io(format!("cannot write {}", package_path.display())))?;
        self.runner
            .run("dpkg", &[
                "-x".into(),
                package_path.into_os_string(),
                root.as_os_str().to_owned(),
            ])
            .await?;

        let config_path = root.join("grub.cfg");
        tokio::fs::write(&config_path, CONFIG_FILE_ARM64)
            .await
            .map_err(BootError::io(format!("cannot write {}", config_path.display())))?;

        let image = root.join(BOOTLOADER_PATH);
        let mut args: Vec<OsString> = vec![
            "-o".into(),
            image.clone().into_os_string(),
            "-O".into(),
            "arm64-efi".into(),
            "-d".into(),
            root.join("usr/lib/grub/arm64-efi").into_os_string(),
            "-c".into(),
            config_path.into_os_string(),
        ];
        args.extend(GRUB_MODULES.iter().map(OsString::from));
        self.runner.run("grub-mkimage", &args).await?;

        let target = dest.join(BOOTLOADER_PATH);
        install_bootloader(&image, &target).await?;
        info!(target = %target.display(), "uefi_arm64 bootloader ready");
        Ok(target)
    }
}

impl<S: PackageSource, R: CommandRunner> BootMethod for UefiArm64BootMethod<S, R> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn bootloader_path(&self) -> &'static str {
        BOOTLOADER_PATH
    }

    fn arch_octet(&self) -> &'static str {
        ARCH_OCTET
    }

    /// GRUB fetches everything itself; nothing is rendered here.
    fn match_path(&self, _path: &str) -> Option<IndexMap<String, String>> {
        None
    }

    fn get_reader(&self, _params: &KernelParameters) -> Option<BootReader> {
        None
    }

    async fn install_bootloader(&self, dest: &Path) -> Result<PathBuf, BootError> {
        self.install(dest).await
    }
}
