// ── Address link domain types ──
//
// An AddressLink is one row of an interface's IP configuration. Its
// allocation type records how the address is (or will be) obtained; the
// user-facing link mode is derived from the allocation type and whether a
// concrete address is present.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::{InterfaceId, LinkId, SubnetId};

/// How the address of a link is allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocType {
    /// Address picked from the subnet when the node is deployed.
    Auto,
    /// Address fixed by the user (or picked once at link time).
    Sticky,
    /// Address obtained by the interface from a DHCP server.
    Dhcp,
    /// Address observed on the wire, typically handed out by DHCP.
    Discovered,
}

/// User-facing link mode accepted by the link operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LinkMode {
    Auto,
    Dhcp,
    Static,
    LinkUp,
}

/// The canonical AddressLink type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressLink {
    pub id: LinkId,
    pub interface: InterfaceId,
    pub alloc_type: AllocType,
    #[serde(default)]
    pub subnet: Option<SubnetId>,
    #[serde(default)]
    pub ip: Option<IpAddr>,
    pub created: DateTime<Utc>,
}

impl AddressLink {
    /// The mode this link was configured with, or `None` for observed
    /// (DISCOVERED) addresses which are not configuration.
    pub fn mode(&self) -> Option<LinkMode> {
        match (self.alloc_type, self.ip) {
            (AllocType::Auto, _) => Some(LinkMode::Auto),
            (AllocType::Dhcp, _) => Some(LinkMode::Dhcp),
            (AllocType::Sticky, Some(_)) => Some(LinkMode::Static),
            (AllocType::Sticky, None) => Some(LinkMode::LinkUp),
            (AllocType::Discovered, _) => None,
        }
    }

    pub fn is_link_up(&self) -> bool {
        self.mode() == Some(LinkMode::LinkUp)
    }
}
