//! Bootloader command handlers.

use serde::Serialize;

use maas_config::Config;
use maas_core::{BootConfig, BootMethod, SystemRunner, UefiArm64BootMethod};

use crate::cli::{BootArgs, BootCommand, GlobalOpts};
use crate::error::CliError;
use crate::output::{self, Painter};

#[derive(Serialize)]
struct BootInfo<'a> {
    method: &'static str,
    bootloader: &'static str,
    arch_octet: &'static str,
    archive: &'a str,
    release: &'a str,
    package: &'a str,
    component: &'a str,
    arch: &'a str,
}

fn detail(info: &BootInfo<'_>) -> String {
    [
        format!("Method:     {}", info.method),
        format!("Bootloader: {}", info.bootloader),
        format!("Arch octet: {}", info.arch_octet),
        format!("Archive:    {}", info.archive),
        format!("Release:    {}-updates", info.release),
        format!("Package:    {} ({}/{})", info.package, info.component, info.arch),
    ]
    .join("\n")
}

#[derive(Serialize)]
struct Installed {
    method: &'static str,
    path: String,
}

pub async fn handle(args: BootArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let boot: BootConfig = cfg.boot_config()?;
    let archive = boot.archive_client()?;
    let method = UefiArm64BootMethod::new(boot, archive, SystemRunner);

    match args.command {
        BootCommand::Info => {
            let config = method.config();
            let info = BootInfo {
                method: method.name(),
                bootloader: method.bootloader_path(),
                arch_octet: method.arch_octet(),
                archive: config.ports_archive_url().as_str(),
                release: &config.release,
                package: &config.package,
                component: &config.component,
                arch: &config.arch,
            };
            let out = output::render_single(global.output, &info, detail, |i| {
                i.bootloader.to_string()
            })?;
            output::print_output(&out, global.quiet);
        }

        BootCommand::InstallBootloader { dest } => {
            tracing::info!(dest = %dest.display(), method = method.name(), "installing bootloader");
            let path = method.install_bootloader(&dest).await?;
            let installed = Installed {
                method: method.name(),
                path: path.display().to_string(),
            };
            let painter = Painter::new(global.color);
            let out = output::render_single(
                global.output,
                &installed,
                |i| format!("{} installed {}", painter.good("✓"), i.path),
                |i| i.path.clone(),
            )?;
            output::print_output(&out, global.quiet);
        }
    }
    Ok(())
}
