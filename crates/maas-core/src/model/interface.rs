// ── Interface domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::{InterfaceId, MacAddress, NodeId, VlanId};

/// The kind of a network interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum InterfaceKind {
    Physical,
    Bond,
    Bridge,
    Vlan,
}

impl InterfaceKind {
    /// Bonds and bridges absorb their parents: a parent of either can no
    /// longer carry its own IP configuration.
    pub fn aggregates_parents(self) -> bool {
        matches!(self, Self::Bond | Self::Bridge)
    }
}

/// The canonical Interface type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    pub id: InterfaceId,
    pub node: NodeId,
    pub name: String,
    pub mac: MacAddress,
    pub kind: InterfaceKind,
    /// Interfaces this one is built on (bond/bridge members, VLAN parent).
    #[serde(default)]
    pub parents: Vec<InterfaceId>,
    pub vlan: VlanId,
}
