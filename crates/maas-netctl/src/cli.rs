//! Clap derive structures for the `maas-netctl` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// maas-netctl -- link interfaces to subnets and manage boot loaders
#[derive(Debug, Parser)]
#[command(
    name = "maas-netctl",
    version,
    about = "Manage MAAS interface links, default gateways and bootloaders",
    long_about = "Allocates addresses for machine interfaces against a JSON inventory.\n\n\
        Links follow the MAAS modes (AUTO, DHCP, STATIC, LINK_UP). Managed subnets\n\
        get their host maps pushed to the configured DHCP agent.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Inventory JSON file (overrides [inventory] path in config)
    #[arg(long, short = 'i', env = "MAAS_INVENTORY", global = true)]
    pub inventory: Option<PathBuf>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "MAAS_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MAAS_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

impl OutputFormat {
    /// Formats meant for machines rather than people.
    pub fn is_structured(self) -> bool {
        matches!(self, Self::Json | Self::JsonCompact | Self::Yaml)
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect node interfaces and their links
    #[command(alias = "if", alias = "iface")]
    Interfaces(InterfacesArgs),

    /// Inspect subnets and their address ranges
    #[command(alias = "sn")]
    Subnets(SubnetsArgs),

    /// Link an interface to a subnet
    Link(LinkArgs),

    /// Remove a link from an interface
    Unlink(UnlinkArgs),

    /// Set the node's default gateway from an interface's links
    #[command(alias = "gw")]
    SetDefaultGateway(SetGatewayArgs),

    /// List links usable as a default gateway, by address family
    GatewayChoices(InterfaceArg),

    /// Claim addresses for the interface's AUTO links
    ClaimAuto(InterfaceArg),

    /// Release the addresses held by the interface's AUTO links
    ReleaseAuto(InterfaceArg),

    /// Replay host-map changes that could not be pushed to the DHCP agent
    Reconcile,

    /// Bootloader operations
    Boot(BootArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InterfaceArg {
    /// Interface id or name
    pub interface: String,
}

// ── Interfaces ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct InterfacesArgs {
    #[command(subcommand)]
    pub command: InterfacesCommand,
}

#[derive(Debug, Subcommand)]
pub enum InterfacesCommand {
    /// List interfaces
    #[command(alias = "ls")]
    List {
        /// Only interfaces of this node (hostname or id)
        #[arg(long, short = 'n')]
        node: Option<String>,
    },

    /// Show an interface
    Get {
        /// Interface id or name
        interface: String,
    },

    /// List the links of an interface
    Links {
        /// Interface id or name
        interface: String,
    },
}

// ── Subnets ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SubnetsArgs {
    #[command(subcommand)]
    pub command: SubnetsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SubnetsCommand {
    /// List subnets
    #[command(alias = "ls")]
    List,

    /// Show a subnet with its ranges and allocated addresses
    Get {
        /// Subnet id, name or CIDR
        subnet: String,
    },
}

// ── Links ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LinkArgs {
    /// Interface id or name
    pub interface: String,

    /// Link mode: auto, dhcp, static or link_up
    #[arg(long, short = 'm')]
    pub mode: Option<String>,

    /// Subnet id, name or CIDR
    #[arg(long, short = 's')]
    pub subnet: Option<String>,

    /// Address for STATIC links (picked from the subnet when omitted)
    #[arg(long, alias = "ip")]
    pub ip_address: Option<String>,

    /// Also make this link the node's default gateway
    #[arg(long)]
    pub default_gateway: bool,
}

#[derive(Debug, Args)]
pub struct UnlinkArgs {
    /// Interface id or name
    pub interface: String,

    /// Link id to remove
    #[arg(long)]
    pub id: Option<u64>,
}

#[derive(Debug, Args)]
pub struct SetGatewayArgs {
    /// Interface id or name
    pub interface: String,

    /// Link to use; may be omitted when each family has one candidate
    #[arg(long)]
    pub link_id: Option<u64>,
}

// ── Boot ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BootArgs {
    #[command(subcommand)]
    pub command: BootCommand,
}

#[derive(Debug, Subcommand)]
pub enum BootCommand {
    /// Build grubaa64.efi from the ports archive and install it
    InstallBootloader {
        /// Destination directory (the TFTP root)
        #[arg(long, short = 'd')]
        dest: PathBuf,
    },

    /// Show the UEFI ARM64 boot method and where it is fetched from
    Info,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file with every default spelled out
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
