// Shared fixtures for unit tests.

#![allow(clippy::unwrap_used)]

use std::net::IpAddr;

use crate::model::{
    Interface, InterfaceId, InterfaceKind, IpRange, MacAddress, NodeId, Subnet, SubnetId,
    SubnetManagement, VlanId,
};
use crate::store::Inventory;

pub(crate) fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// One node with two physical NICs on one VLAN carrying a managed
/// 10.0.0.0/24 (gateway .1, dynamic .100-.199, static .200-.250).
pub(crate) struct Fixture {
    pub inventory: Inventory,
    pub node: NodeId,
    pub vlan: VlanId,
    pub subnet: SubnetId,
    pub eth0: InterfaceId,
    pub eth1: InterfaceId,
}

impl Fixture {
    pub fn managed_v4() -> Self {
        let mut inventory = Inventory::default();
        let node = inventory.add_node("node01");
        let vlan = inventory.add_vlan(0, "untagged");
        let mut fixture = Self {
            inventory,
            node,
            vlan,
            subnet: SubnetId(0),
            eth0: InterfaceId(0),
            eth1: InterfaceId(0),
        };
        fixture.subnet = fixture.add_subnet(
            "lab",
            "10.0.0.0/24",
            Some("10.0.0.1"),
            managed(("10.0.0.100", "10.0.0.199"), ("10.0.0.200", "10.0.0.250")),
        );
        fixture.eth0 = fixture.add_physical("eth0", "52:54:00:00:00:01");
        fixture.eth1 = fixture.add_physical("eth1", "52:54:00:00:00:02");
        fixture
    }

    pub fn add_subnet(
        &mut self,
        name: &str,
        cidr: &str,
        gateway: Option<&str>,
        management: SubnetManagement,
    ) -> SubnetId {
        self.inventory
            .add_subnet(Subnet {
                id: SubnetId(0),
                name: name.into(),
                cidr: cidr.parse().unwrap(),
                gateway_ip: gateway.map(ip),
                vlan: self.vlan,
                management,
            })
            .unwrap()
    }

    pub fn add_physical(&mut self, name: &str, mac: &str) -> InterfaceId {
        self.add_interface(InterfaceKind::Physical, name, mac, &[])
    }

    pub fn add_aggregate(
        &mut self,
        kind: InterfaceKind,
        name: &str,
        parents: &[InterfaceId],
    ) -> InterfaceId {
        self.add_interface(kind, name, "52:54:00:00:00:ff", parents)
    }

    fn add_interface(
        &mut self,
        kind: InterfaceKind,
        name: &str,
        mac: &str,
        parents: &[InterfaceId],
    ) -> InterfaceId {
        self.inventory
            .add_interface(Interface {
                id: InterfaceId(0),
                node: self.node,
                name: name.into(),
                mac: MacAddress::new(mac),
                kind,
                parents: parents.to_vec(),
                vlan: self.vlan,
            })
            .unwrap()
    }
}

pub(crate) fn managed(dynamic: (&str, &str), fixed: (&str, &str)) -> SubnetManagement {
    SubnetManagement::Dhcp {
        dynamic_range: IpRange::new(ip(dynamic.0), ip(dynamic.1)).unwrap(),
        static_range: IpRange::new(ip(fixed.0), ip(fixed.1)).unwrap(),
    }
}
