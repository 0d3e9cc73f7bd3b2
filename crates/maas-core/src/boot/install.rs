// ── Bootloader installation plumbing ──

use std::ffi::OsString;
use std::future::Future;
use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

use super::BootError;

/// Runs the external tools used to unpack and build bootloaders.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &str,
        args: &[OsString],
    ) -> impl Future<Output = Result<(), BootError>> + Send;
}

/// Spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[OsString]) -> Result<(), BootError> {
        debug!(program, ?args, "running");
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(BootError::io(format!("cannot run {program}")))?;
        if output.status.success() {
            return Ok(());
        }
        Err(BootError::Command {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Where bootloader packages come from.
pub trait PackageSource: Send + Sync {
    /// Fetch `package` from the `-updates` pocket of `archive`. `None`
    /// when the archive does not carry it.
    fn get_updates_package(
        &self,
        package: &str,
        archive: &Url,
        component: &str,
        arch: &str,
    ) -> impl Future<Output = Result<Option<(Vec<u8>, String)>, BootError>> + Send;
}

impl PackageSource for maas_api::ArchiveClient {
    async fn get_updates_package(
        &self,
        package: &str,
        archive: &Url,
        component: &str,
        arch: &str,
    ) -> Result<Option<(Vec<u8>, String)>, BootError> {
        Ok(maas_api::ArchiveClient::get_updates_package(self, package, archive, component, arch).await?)
    }
}

/// Install `src` as `dest`: copy to a sibling temporary file, then rename
/// over `dest`. Returns `false` when `dest` already has the same content.
pub async fn install_bootloader(src: &Path, dest: &Path) -> Result<bool, BootError> {
    let data = tokio::fs::read(src)
        .await
        .map_err(BootError::io(format!("cannot read {}", src.display())))?;

    if let Ok(existing) = tokio::fs::read(dest).await {
        if existing == data {
            debug!(dest = %dest.display(), "bootloader unchanged");
            return Ok(false);
        }
    }

    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(BootError::io(format!("cannot create {}", parent.display())))?;

    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staged = parent.join(format!(".{file_name}.{}.tmp", std::process::id()));
    tokio::fs::write(&staged, &data)
        .await
        .map_err(BootError::io(format!("cannot write {}", staged.display())))?;
    if let Err(e) = tokio::fs::rename(&staged, dest).await {
        let _ = tokio::fs::remove_file(&staged).await;
        return Err(BootError::Io {
            context: format!("cannot install {}", dest.display()),
            source: e,
        });
    }
    info!(dest = %dest.display(), bytes = data.len(), "bootloader installed");
    Ok(true)
}
