//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError`, `BootError` and `ConfigError` into user-facing errors
//! with actionable help text.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use maas_config::ConfigError;
use maas_core::{BootError, CoreError, FieldErrors};

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const BOOT: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Validation ───────────────────────────────────────────────────

    /// The link engine refused the request; `details` lists every field.
    #[error("Request rejected")]
    #[diagnostic(code(maas::rejected), help("{details}"))]
    Rejected { errors: FieldErrors, details: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(maas::validation))]
    Validation { field: String, reason: String },

    // ── Inventory ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(maas::not_found),
        help("Run: maas-netctl {list_command} to see what exists")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' is already taken")]
    #[diagnostic(code(maas::conflict), help("Retry: another link claimed it concurrently."))]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    #[error("Inventory file not found: {}", .path.display())]
    #[diagnostic(
        code(maas::no_inventory),
        help(
            "Pass --inventory <FILE>, set MAAS_INVENTORY, or set [inventory] path\n\
             in the config file (see: maas-netctl config path)."
        )
    )]
    NoInventory { path: PathBuf },

    #[error("Inventory problem: {message}")]
    #[diagnostic(code(maas::inventory))]
    Inventory { message: String },

    // ── Collaborators ────────────────────────────────────────────────

    #[error("Could not connect to {service}: {reason}")]
    #[diagnostic(
        code(maas::connection_failed),
        help(
            "Check [dhcp] agent_url in the config file. Host-map changes that\n\
             failed are kept and can be replayed with: maas-netctl reconcile"
        )
    )]
    ConnectionFailed { service: String, reason: String },

    #[error("{service} timed out after {seconds}s")]
    #[diagnostic(code(maas::timeout), help("Increase the timeout in the config file."))]
    Timeout { service: String, seconds: u64 },

    #[error("{service} error: {message}")]
    #[diagnostic(code(maas::api_error))]
    ApiError { service: String, message: String },

    // ── Boot ─────────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(maas::boot),
        help("Installing needs `dpkg` and `grub-mkimage` on PATH and access to the ports archive.")
    )]
    Boot(#[from] BootError),

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(maas::config))]
    Config(Box<ConfigError>),

    #[error("Config file already exists at {}", .path.display())]
    #[diagnostic(code(maas::config_exists), help("Use --force to overwrite it."))]
    ConfigExists { path: PathBuf },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Cannot render output: {0}")]
    #[diagnostic(code(maas::render))]
    Render(String),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Rejected { .. } | Self::Validation { .. } => exit_code::USAGE,
            Self::NotFound { .. } | Self::NoInventory { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Boot(_) => exit_code::BOOT,
            _ => exit_code::GENERAL,
        }
    }

    pub fn rejected(errors: FieldErrors) -> Self {
        let details = errors
            .iter()
            .flat_map(|(field, messages)| messages.iter().map(move |m| format!("{field}: {m}")))
            .collect::<Vec<_>>()
            .join("\n");
        Self::Rejected { errors, details }
    }

    /// The field errors of a rejected request.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Rejected { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Invalid(errors) => CliError::rejected(errors),

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                resource_type: entity_type.into(),
                identifier,
                list_command: match entity_type {
                    "subnet" => "subnets list",
                    "link" => "interfaces links <INTERFACE>",
                    _ => "interfaces list",
                }
                .into(),
            },

            CoreError::AddressConflict { subnet, ip } => CliError::Conflict {
                resource_type: "address".into(),
                identifier: format!("{ip} on {subnet}"),
            },

            CoreError::InventoryIo { path, source }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                CliError::NoInventory { path }
            }

            err @ (CoreError::InventoryIo { .. }
            | CoreError::InventoryFormat { .. }
            | CoreError::InvalidSubnet { .. }
            | CoreError::Inconsistent { .. }) => CliError::Inventory {
                message: err.to_string(),
            },

            CoreError::ConnectionFailed { service, reason } => {
                CliError::ConnectionFailed { service, reason }
            }

            CoreError::Timeout {
                service,
                timeout_secs,
            } => CliError::Timeout {
                service,
                seconds: timeout_secs,
            },

            CoreError::Rejected { service, message } => CliError::ApiError { service, message },

            CoreError::Internal(message) => CliError::ApiError {
                service: "maas-netctl".into(),
                message,
            },
        }
    }
}
