// ── Boot methods ──
//
// A boot method knows how to serve one firmware family over the network
// and how to install the bootloader image that family loads first.

mod install;
mod uefi_arm64;

pub use install::{CommandRunner, PackageSource, SystemRunner, install_bootloader};
pub use uefi_arm64::{CONFIG_FILE_ARM64, GRUB_MODULES, UefiArm64BootMethod};

use std::future::Future;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootError {
    /// Installation could not proceed. Nothing was installed.
    #[error("Failed to install {method} bootloader: {reason}")]
    BootMethodInstall { method: &'static str, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` failed ({status}): {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Archive error: {0}")]
    Archive(#[from] maas_api::Error),
}

impl BootError {
    pub(crate) fn io(context: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
        let context = context.into();
        move |source| Self::Io { context, source }
    }
}

/// Parameters of a netboot request, as rendered into kernel options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KernelParameters {
    pub arch: String,
    pub subarch: String,
    pub osystem: String,
    pub release: String,
    pub purpose: String,
}

/// Bytes served for a matched boot path.
pub type BootReader = Vec<u8>;

pub trait BootMethod: Send + Sync {
    fn name(&self) -> &'static str;

    /// Bootloader file name, relative to the TFTP root.
    fn bootloader_path(&self) -> &'static str;

    /// DHCP client architecture option (option 93) this method answers.
    fn arch_octet(&self) -> &'static str;

    /// Recognize a TFTP path that this method serves itself.
    fn match_path(&self, path: &str) -> Option<IndexMap<String, String>>;

    /// Render the file for a matched path.
    fn get_reader(&self, params: &KernelParameters) -> Option<BootReader>;

    /// Install the bootloader into `dest`. Returns the installed path.
    fn install_bootloader(
        &self,
        dest: &Path,
    ) -> impl Future<Output = Result<PathBuf, BootError>> + Send;
}
