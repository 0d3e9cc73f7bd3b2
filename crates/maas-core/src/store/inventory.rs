// ── Inventory ──
//
// The complete persisted state of the engine: nodes, VLANs, subnets,
// interfaces and address links. It is plain data with read-side queries;
// all mutation of links and gateways goes through a `Transaction`.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::net::IpAddr;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;
use crate::hostmap::HostMapAction;
use crate::model::{
    AddressFamily, AddressLink, AllocType, Interface, InterfaceId, LinkId, Node, NodeId, Subnet, SubnetId, Vlan,
    VlanId,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub vlans: Vec<Vlan>,
    #[serde(default)]
    pub subnets: Vec<Subnet>,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
    #[serde(default)]
    pub links: Vec<AddressLink>,
    /// Highest link id ever handed out, so deleted ids are never reused.
    #[serde(default)]
    pub last_link_id: u64,
    /// Host-map changes that could not be pushed yet, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_host_maps: Vec<HostMapAction>,
}

impl Inventory {
    // ── Persistence ──────────────────────────────────────────────────

    /// Load and check an inventory file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = fs::read_to_string(path).map_err(|source| CoreError::InventoryIo {
            path: path.to_path_buf(),
            source,
        })?;
        let inventory: Self =
            serde_json::from_str(&raw).map_err(|source| CoreError::InventoryFormat {
                path: path.to_path_buf(),
                source,
            })?;
        inventory.check()?;
        debug!(
            path = %path.display(),
            interfaces = inventory.interfaces.len(),
            links = inventory.links.len(),
            "inventory loaded"
        );
        Ok(inventory)
    }

    /// Write the inventory next to `path` and rename it into place.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let io_err = |source| CoreError::InventoryIo {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(io_err)?;

        let body = serde_json::to_string_pretty(self).map_err(|source| {
            CoreError::InventoryFormat {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let mut staged = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        staged.write_all(body.as_bytes()).map_err(io_err)?;
        staged.write_all(b"\n").map_err(io_err)?;
        staged
            .persist(path)
            .map_err(|e| io_err(e.error))?;
        debug!(path = %path.display(), "inventory saved");
        Ok(())
    }

    // ── Consistency ──────────────────────────────────────────────────

    /// Verify references between entities and the link invariants.
    pub fn check(&self) -> Result<(), CoreError> {
        let inconsistent = |message: String| Err(CoreError::Inconsistent { message });

        for subnet in &self.subnets {
            if self.vlan(subnet.vlan).is_none() {
                return inconsistent(format!("subnet {} references unknown VLAN {}", subnet.id, subnet.vlan));
            }
            subnet.check_ranges().map_err(|reason| CoreError::InvalidSubnet {
                subnet: subnet.name.clone(),
                reason,
            })?;
        }

        for iface in &self.interfaces {
            if self.node(iface.node).is_none() {
                return inconsistent(format!("interface {} references unknown node {}", iface.id, iface.node));
            }
            if self.vlan(iface.vlan).is_none() {
                return inconsistent(format!("interface {} references unknown VLAN {}", iface.id, iface.vlan));
            }
            if let Some(parent) = iface.parents.iter().find(|p| self.interface(**p).is_none()) {
                return inconsistent(format!("interface {} references unknown parent {parent}", iface.id));
            }
        }

        let mut held: HashSet<(SubnetId, IpAddr)> = HashSet::new();
        let mut dhcp: HashSet<InterfaceId> = HashSet::new();
        for link in &self.links {
            if self.interface(link.interface).is_none() {
                return inconsistent(format!("link {} references unknown interface {}", link.id, link.interface));
            }
            if let Some(subnet) = link.subnet {
                let Some(found) = self.subnet(subnet) else {
                    return inconsistent(format!("link {} references unknown subnet {subnet}", link.id));
                };
                if let Some(ip) = link.ip {
                    if !found.cidr.contains(ip) {
                        return inconsistent(format!("link {} address {ip} is outside {}", link.id, found.cidr));
                    }
                    if !held.insert((subnet, ip)) {
                        return inconsistent(format!("address {ip} is held twice on subnet {subnet}"));
                    }
                }
            } else if matches!(link.alloc_type, AllocType::Auto)
                || (link.alloc_type == AllocType::Sticky && link.ip.is_some())
            {
                return inconsistent(format!("link {} needs a subnet", link.id));
            }
            if link.alloc_type == AllocType::Dhcp && !dhcp.insert(link.interface) {
                return inconsistent(format!("interface {} has more than one DHCP link", link.interface));
            }
        }

        for node in &self.nodes {
            for family in [AddressFamily::Ipv4, AddressFamily::Ipv6] {
                let Some(link) = node.gateway_link(family) else {
                    continue;
                };
                let Some(found) = self.link(link) else {
                    return inconsistent(format!("node {} gateway references unknown link {link}", node.id));
                };
                if self.interface(found.interface).is_none_or(|i| i.node != node.id) {
                    return inconsistent(format!("node {} {family} gateway link {link} belongs to another node", node.id));
                }
                match found.subnet.and_then(|s| self.subnet(s)) {
                    None => {
                        return inconsistent(format!("node {} {family} gateway link {link} has no subnet", node.id));
                    }
                    Some(subnet) if subnet.family() != family => {
                        return inconsistent(format!(
                            "node {} {family} gateway link {link} is on {} subnet {}",
                            node.id,
                            subnet.family(),
                            subnet.cidr
                        ));
                    }
                    Some(subnet) if subnet.gateway_ip.is_none() => {
                        return inconsistent(format!(
                            "node {} {family} gateway link {link} is on subnet {} which has no gateway",
                            node.id, subnet.cidr
                        ));
                    }
                    Some(_) => {}
                }
            }
        }
        Ok(())
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn vlan(&self, id: VlanId) -> Option<&Vlan> {
        self.vlans.iter().find(|v| v.id == id)
    }

    pub fn subnet(&self, id: SubnetId) -> Option<&Subnet> {
        self.subnets.iter().find(|s| s.id == id)
    }

    pub fn interface(&self, id: InterfaceId) -> Option<&Interface> {
        self.interfaces.iter().find(|i| i.id == id)
    }

    pub fn link(&self, id: LinkId) -> Option<&AddressLink> {
        self.links.iter().find(|l| l.id == id)
    }

    pub fn require_interface(&self, id: InterfaceId) -> Result<&Interface, CoreError> {
        self.interface(id)
            .ok_or_else(|| CoreError::not_found("interface", id))
    }

    pub fn require_subnet(&self, id: SubnetId) -> Result<&Subnet, CoreError> {
        self.subnet(id).ok_or_else(|| CoreError::not_found("subnet", id))
    }

    pub fn require_node(&self, id: NodeId) -> Result<&Node, CoreError> {
        self.node(id).ok_or_else(|| CoreError::not_found("node", id))
    }

    /// Find an interface by numeric id or by name.
    pub fn find_interface(&self, key: &str) -> Option<&Interface> {
        match key.parse::<InterfaceId>() {
            Ok(id) => self.interface(id),
            Err(_) => self.interfaces.iter().find(|i| i.name == key),
        }
    }

    /// Find a subnet by numeric id, name or CIDR.
    pub fn find_subnet(&self, key: &str) -> Option<&Subnet> {
        match key.parse::<SubnetId>() {
            Ok(id) => self.subnet(id),
            Err(_) => self
                .subnets
                .iter()
                .find(|s| s.name == key || s.cidr.to_string() == key),
        }
    }

    /// Links on an interface, in id order.
    pub fn links_on(&self, interface: InterfaceId) -> Vec<&AddressLink> {
        let mut links: Vec<_> = self
            .links
            .iter()
            .filter(|l| l.interface == interface)
            .collect();
        links.sort_by_key(|l| l.id);
        links
    }

    /// Subnets attached to a VLAN, in id order.
    pub fn subnets_on_vlan(&self, vlan: VlanId) -> Vec<&Subnet> {
        let mut subnets: Vec<_> = self.subnets.iter().filter(|s| s.vlan == vlan).collect();
        subnets.sort_by_key(|s| s.id);
        subnets
    }

    /// Interfaces built directly on top of `interface`.
    pub fn children_of(&self, interface: InterfaceId) -> impl Iterator<Item = &Interface> {
        self.interfaces
            .iter()
            .filter(move |i| i.parents.contains(&interface))
    }

    /// Addresses held by any link on `subnet`.
    pub fn allocated_ips(&self, subnet: SubnetId) -> HashSet<IpAddr> {
        self.links
            .iter()
            .filter(|l| l.subnet == Some(subnet))
            .filter_map(|l| l.ip)
            .collect()
    }

    /// The link holding `ip` on `subnet`, if any.
    pub fn link_holding(&self, subnet: SubnetId, ip: IpAddr) -> Option<&AddressLink> {
        self.links
            .iter()
            .find(|l| l.subnet == Some(subnet) && l.ip == Some(ip))
    }

    // ── Seeding ──────────────────────────────────────────────────────
    //
    // Adding topology is outside the link engine proper; these helpers
    // exist for fixtures and for hand-assembled inventories.

    pub fn add_node(&mut self, hostname: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.iter().map(|n| n.id.get()).max().unwrap_or(0) + 1);
        self.nodes.push(Node {
            id,
            hostname: hostname.into(),
            gateway_link_ipv4: None,
            gateway_link_ipv6: None,
        });
        id
    }

    pub fn add_vlan(&mut self, vid: u16, name: impl Into<String>) -> VlanId {
        let id = VlanId(self.vlans.iter().map(|v| v.id.get()).max().unwrap_or(0) + 1);
        self.vlans.push(Vlan {
            id,
            vid,
            name: name.into(),
        });
        id
    }

    /// Add a subnet, assigning it the next free id. Ranges are checked.
    pub fn add_subnet(&mut self, mut subnet: Subnet) -> Result<SubnetId, CoreError> {
        subnet.id = SubnetId(self.subnets.iter().map(|s| s.id.get()).max().unwrap_or(0) + 1);
        if self.vlan(subnet.vlan).is_none() {
            return Err(CoreError::not_found("VLAN", subnet.vlan));
        }
        subnet.check_ranges().map_err(|reason| CoreError::InvalidSubnet {
            subnet: subnet.name.clone(),
            reason,
        })?;
        let id = subnet.id;
        self.subnets.push(subnet);
        Ok(id)
    }

    /// Add an interface, assigning it the next free id.
    pub fn add_interface(&mut self, mut interface: Interface) -> Result<InterfaceId, CoreError> {
        interface.id = InterfaceId(self.interfaces.iter().map(|i| i.id.get()).max().unwrap_or(0) + 1);
        self.require_node(interface.node)?;
        if let Some(parent) = interface.parents.iter().find(|p| self.interface(**p).is_none()) {
            return Err(CoreError::not_found("interface", parent));
        }
        let id = interface.id;
        self.interfaces.push(interface);
        Ok(id)
    }

    /// Record an address observed on `interface` (a DISCOVERED link).
    pub fn add_discovered(
        &mut self,
        interface: InterfaceId,
        subnet: SubnetId,
        ip: IpAddr,
    ) -> Result<LinkId, CoreError> {
        self.require_interface(interface)?;
        let found = self.require_subnet(subnet)?;
        if !found.cidr.contains(ip) {
            return Err(CoreError::InvalidSubnet {
                subnet: found.name.clone(),
                reason: format!("{ip} is outside {}", found.cidr),
            });
        }
        if self.link_holding(subnet, ip).is_some() {
            return Err(CoreError::AddressConflict {
                subnet: found.name.clone(),
                ip,
            });
        }
        let id = self.allocate_link_id();
        self.links.push(AddressLink {
            id,
            interface,
            alloc_type: AllocType::Discovered,
            subnet: Some(subnet),
            ip: Some(ip),
            created: Utc::now(),
        });
        Ok(id)
    }

    pub(crate) fn allocate_link_id(&mut self) -> LinkId {
        let highest = self
            .links
            .iter()
            .map(|l| l.id.get())
            .max()
            .unwrap_or(0)
            .max(self.last_link_id);
        self.last_link_id = highest + 1;
        LinkId(self.last_link_id)
    }
}
