// ── Core error types ──
//
// User-facing errors from maas-core. Validation failures travel as a
// `FieldErrors` mapping so callers can render them per form field; the
// `From<maas_api::Error>` impl translates transport-layer errors from the
// DHCP agent and the archive into domain-appropriate variants.

use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::link::FieldErrors;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Validation ───────────────────────────────────────────────────
    /// One or more request fields failed validation.
    #[error("Validation failed: {0}")]
    Invalid(FieldErrors),

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// `(subnet, ip)` is already held by another link.
    #[error("Address {ip} is already allocated on subnet {subnet}")]
    AddressConflict { subnet: String, ip: IpAddr },

    #[error("Invalid subnet {subnet}: {reason}")]
    InvalidSubnet { subnet: String, reason: String },

    #[error("Inconsistent inventory: {message}")]
    Inconsistent { message: String },

    // ── Inventory persistence ────────────────────────────────────────
    #[error("Cannot access inventory {path}: {source}")]
    InventoryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed inventory {path}: {source}")]
    InventoryFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    // ── Collaborator errors (wrapped, not exposed raw) ───────────────
    #[error("Cannot reach {service}: {reason}")]
    ConnectionFailed { service: String, reason: String },

    #[error("{service} timed out after {timeout_secs}s")]
    Timeout { service: String, timeout_secs: u64 },

    #[error("{service} rejected the request: {message}")]
    Rejected { service: String, message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity_type: &'static str, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            identifier: identifier.to_string(),
        }
    }

    /// The field errors carried by a validation failure, if any.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Invalid(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<FieldErrors> for CoreError {
    fn from(errors: FieldErrors) -> Self {
        Self::Invalid(errors)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<maas_api::Error> for CoreError {
    fn from(err: maas_api::Error) -> Self {
        match err {
            maas_api::Error::Transport(ref e) => {
                let service = e
                    .url()
                    .and_then(|u| u.host_str().map(str::to_owned))
                    .unwrap_or_else(|| "<unknown>".into());
                if e.is_timeout() {
                    CoreError::Timeout {
                        service,
                        timeout_secs: 0,
                    }
                } else {
                    CoreError::ConnectionFailed {
                        service,
                        reason: e.to_string(),
                    }
                }
            }
            maas_api::Error::Agent { message } => CoreError::Rejected {
                service: "DHCP agent".into(),
                message,
            },
            maas_api::Error::AgentStatus { status } => CoreError::Rejected {
                service: "DHCP agent".into(),
                message: format!("HTTP {status}"),
            },
            other => CoreError::Internal(other.to_string()),
        }
    }
}
