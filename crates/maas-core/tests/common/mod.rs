#![allow(clippy::unwrap_used, dead_code)]

use std::net::IpAddr;

use maas_core::{
    CoreConfig, CoreError, Interface, InterfaceId, InterfaceKind, Inventory, IpRange, MacAddress,
    NetworkService, NodeId, RecordingHostMaps, Subnet, SubnetId, SubnetManagement, VlanId,
};

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

/// A node with two NICs on one VLAN and a spread of subnets:
///
/// | field       | cidr            | gateway  | management                         |
/// |-------------|-----------------|----------|------------------------------------|
/// | `managed`   | 10.0.0.0/24     | .1       | dynamic .100-.199, static .200-.250 |
/// | `unmanaged` | 192.168.1.0/24  | .1       | none                               |
/// | `v6`        | fd00::/64       | fd00::1  | none                               |
/// | `no_gw`     | 172.16.0.0/24   | none     | none                               |
/// | `elsewhere` | 10.9.0.0/24     | .1       | none, on another VLAN              |
pub struct Lab {
    pub inventory: Inventory,
    pub node: NodeId,
    pub vlan: VlanId,
    pub eth0: InterfaceId,
    pub eth1: InterfaceId,
    pub managed: SubnetId,
    pub unmanaged: SubnetId,
    pub v6: SubnetId,
    pub no_gw: SubnetId,
    pub elsewhere: SubnetId,
}

pub fn managed_ranges(dynamic: (&str, &str), fixed: (&str, &str)) -> SubnetManagement {
    SubnetManagement::Dhcp {
        dynamic_range: IpRange::new(ip(dynamic.0), ip(dynamic.1)).unwrap(),
        static_range: IpRange::new(ip(fixed.0), ip(fixed.1)).unwrap(),
    }
}

impl Lab {
    pub fn new() -> Self {
        let mut inventory = Inventory::default();
        let node = inventory.add_node("node01");
        let vlan = inventory.add_vlan(0, "untagged");
        let other_vlan = inventory.add_vlan(10, "storage");

        let mut subnet = |name: &str, cidr: &str, gw: Option<&str>, vlan, management| {
            inventory
                .add_subnet(Subnet {
                    id: SubnetId(0),
                    name: name.into(),
                    cidr: cidr.parse().unwrap(),
                    gateway_ip: gw.map(ip),
                    vlan,
                    management,
                })
                .unwrap()
        };
        let managed = subnet(
            "lab-managed",
            "10.0.0.0/24",
            Some("10.0.0.1"),
            vlan,
            managed_ranges(("10.0.0.100", "10.0.0.199"), ("10.0.0.200", "10.0.0.250")),
        );
        let unmanaged = subnet(
            "lab-unmanaged",
            "192.168.1.0/24",
            Some("192.168.1.1"),
            vlan,
            SubnetManagement::Unmanaged,
        );
        let v6 = subnet("lab-v6", "fd00::/64", Some("fd00::1"), vlan, SubnetManagement::Unmanaged);
        let no_gw = subnet("lab-nogw", "172.16.0.0/24", None, vlan, SubnetManagement::Unmanaged);
        let elsewhere = subnet(
            "elsewhere",
            "10.9.0.0/24",
            Some("10.9.0.1"),
            other_vlan,
            SubnetManagement::Unmanaged,
        );

        let mut lab = Self {
            inventory,
            node,
            vlan,
            eth0: InterfaceId(0),
            eth1: InterfaceId(0),
            managed,
            unmanaged,
            v6,
            no_gw,
            elsewhere,
        };
        lab.eth0 = lab.add_interface(InterfaceKind::Physical, "eth0", "52:54:00:12:34:01", &[]);
        lab.eth1 = lab.add_interface(InterfaceKind::Physical, "eth1", "52:54:00:12:34:02", &[]);
        lab
    }

    pub fn add_interface(
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

    pub fn add_subnet(&mut self, name: &str, cidr: &str, gateway: Option<&str>, management: SubnetManagement) -> SubnetId {
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

    pub fn service(self) -> NetworkService<RecordingHostMaps> {
        NetworkService::new(self.inventory, &CoreConfig::default(), RecordingHostMaps::new())
    }
}

/// The field-error JSON of a validation failure, keys in reported order.
pub fn errors_json(result: Result<impl std::fmt::Debug, CoreError>) -> String {
    let err = result.unwrap_err();
    let errors = err
        .field_errors()
        .unwrap_or_else(|| panic!("expected validation failure, got {err}"));
    serde_json::to_string(errors).unwrap()
}
