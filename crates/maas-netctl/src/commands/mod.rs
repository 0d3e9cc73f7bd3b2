//! Command dispatch: bridges CLI args -> link engine -> output formatting.

pub mod boot;
pub mod config_cmd;
pub mod interfaces;
pub mod links;
pub mod reconcile;
pub mod subnets;
pub mod util;

use std::path::PathBuf;

use maas_config::Config;
use maas_core::{AgentHostMaps, Inventory, NetworkService};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output::Painter;

/// Everything an inventory-bound command needs.
pub struct Context {
    pub service: NetworkService<AgentHostMaps>,
    pub inventory_path: PathBuf,
    pub painter: Painter,
}

impl Context {
    /// Load the inventory and connect the DHCP agent, if one is configured.
    pub fn open(cfg: &Config, global: &GlobalOpts) -> Result<Self, CliError> {
        let inventory_path = crate::config::inventory_path(global, cfg);
        let inventory = Inventory::load(&inventory_path)?;

        let agent = cfg
            .host_map_agent()?
            .map(|agent| agent.connect())
            .transpose()?;
        if agent.is_none() {
            tracing::debug!("no DHCP agent configured, host maps stay local");
        }

        Ok(Self {
            service: NetworkService::new(inventory, &cfg.core_config(), agent),
            inventory_path,
            painter: Painter::new(global.color),
        })
    }

    /// Write the committed state back to the inventory file.
    pub async fn save(&self) -> Result<(), CliError> {
        self.service.snapshot().await.save(&self.inventory_path)?;
        tracing::debug!(path = %self.inventory_path.display(), "inventory saved");
        Ok(())
    }
}

/// Dispatch an inventory-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Interfaces(args) => interfaces::handle(ctx, args, global).await,
        Command::Subnets(args) => subnets::handle(ctx, args, global).await,
        Command::Link(args) => links::link(ctx, args, global).await,
        Command::Unlink(args) => links::unlink(ctx, args, global).await,
        Command::SetDefaultGateway(args) => links::set_default_gateway(ctx, args, global).await,
        Command::GatewayChoices(args) => links::gateway_choices(ctx, &args.interface, global).await,
        Command::ClaimAuto(args) => links::claim_auto(ctx, &args.interface, global).await,
        Command::ReleaseAuto(args) => links::release_auto(ctx, &args.interface, global).await,
        Command::Reconcile => reconcile::handle(ctx, global).await,
        // Handled before an inventory is opened
        Command::Boot(_) | Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
