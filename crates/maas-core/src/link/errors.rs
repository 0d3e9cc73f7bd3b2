// ── Link validation errors ──
//
// Every way a link, unlink or gateway request can be refused. Each variant
// renders the exact message shown to the user and knows which request
// field it belongs to; `FieldErrors` gathers them in the order they were
// found.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{IpRange, LinkId, LinkMode};

/// Field key used for errors that concern the request as a whole.
pub const NON_FIELD: &str = "__all__";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    // ── Input ────────────────────────────────────────────────────────
    #[error("This field is required.")]
    Required { field: &'static str },

    #[error("Select a valid choice. {value} is not one of the available choices.")]
    InvalidChoice { field: &'static str, value: String },

    #[error("Select a valid choice. That choice is not one of the available choices.")]
    SubnetNotOnVlan,

    #[error("Enter a valid IPv4 or IPv6 address.")]
    InvalidIpAddress,

    // ── Interface state ──────────────────────────────────────────────
    /// The interface is a member of a bond or bridge (`kind` names which).
    #[error("Cannot link interface({interface}) when interface is in a {kind}({parent}).")]
    InterfaceInBond {
        interface: String,
        kind: &'static str,
        parent: String,
    },

    #[error("{}", already_dhcp(.subnet.as_deref()))]
    AlreadyDhcp { subnet: Option<String> },

    #[error("Cannot configure interface to link up (with no IP address) while other links are already configured.")]
    OtherLinksExist,

    // ── Addressing ───────────────────────────────────────────────────
    #[error("IP address is not in the given subnet '{subnet}'.")]
    AddressNotInSubnet { subnet: String },

    #[error("IP address is inside a managed dynamic range {range}.")]
    AddressInDynamicRange { range: IpRange },

    #[error("IP address is already in use.")]
    AddressInUse,

    #[error("No more IPs available in subnet '{subnet}'.")]
    RangeExhausted { subnet: String },

    // ── Gateways ─────────────────────────────────────────────────────
    #[error("Cannot use in mode '{mode}'.")]
    InvalidModeForGateway { mode: LinkMode },

    #[error("Cannot set as default gateway because subnet {subnet} doesn't provide a gateway IP address.")]
    RequiredGateway { subnet: String },

    #[error("Subnet is required when default_gateway is True.")]
    SubnetRequiredForGateway,

    #[error("This interface has no usable gateways.")]
    NoUsableGateways,

    #[error("This field is required; Interface has more than one usable {families} gateways.")]
    AmbiguousGateway { families: String },

    // ── Unlink ───────────────────────────────────────────────────────
    #[error("'{id}' is not a valid id. It should be one of: {}.", join_ids(.valid))]
    UnknownLinkId { id: LinkId, valid: Vec<LinkId> },
}

fn already_dhcp(subnet: Option<&str>) -> String {
    match subnet {
        Some(subnet) => format!("Interface is already set to DHCP from '{subnet}'."),
        None => "Interface is already set to DHCP.".to_string(),
    }
}

fn join_ids(ids: &[LinkId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl LinkError {
    /// The request field this error is reported against.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field } | Self::InvalidChoice { field, .. } => *field,
            Self::InterfaceInBond { kind, .. } => *kind,
            Self::AlreadyDhcp { .. } | Self::OtherLinksExist => "mode",
            Self::SubnetNotOnVlan => "subnet",
            Self::InvalidIpAddress
            | Self::AddressNotInSubnet { .. }
            | Self::AddressInDynamicRange { .. }
            | Self::AddressInUse
            | Self::RangeExhausted { .. } => "ip_address",
            Self::InvalidModeForGateway { .. }
            | Self::RequiredGateway { .. }
            | Self::SubnetRequiredForGateway => "default_gateway",
            Self::NoUsableGateways => NON_FIELD,
            Self::AmbiguousGateway { .. } => "link_id",
            Self::UnknownLinkId { .. } => "id",
        }
    }
}

// ── FieldErrors ─────────────────────────────────────────────────────

/// Validation messages keyed by request field, in the order they were
/// recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(IndexMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: &LinkError) {
        self.add(error.field(), error.to_string());
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<LinkError> for FieldErrors {
    fn from(error: LinkError) -> Self {
        let mut errors = Self::new();
        errors.push(&error);
        errors
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, messages)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {}", messages.join(" "))?;
        }
        Ok(())
    }
}
