// ── Link registry ──
//
// Per-interface view over the address links in an inventory: which links
// are configured, which one is DHCP, whether the interface is in link-up
// state, and which aggregate (bond or bridge) has absorbed it.

use std::net::IpAddr;

use crate::model::{AddressLink, AllocType, Interface, InterfaceId, LinkId, SubnetId};
use crate::store::Inventory;

#[derive(Debug, Clone, Copy)]
pub struct LinkRegistry<'a> {
    inventory: &'a Inventory,
    interface: &'a Interface,
}

impl<'a> LinkRegistry<'a> {
    pub fn new(inventory: &'a Inventory, interface: &'a Interface) -> Self {
        Self {
            inventory,
            interface,
        }
    }

    pub fn interface(&self) -> &'a Interface {
        self.interface
    }

    /// Every link on the interface, observed ones included, in id order.
    pub fn all(&self) -> Vec<&'a AddressLink> {
        self.inventory.links_on(self.interface.id)
    }

    /// Links that are configuration (everything but DISCOVERED).
    pub fn configured(&self) -> Vec<&'a AddressLink> {
        self.all()
            .into_iter()
            .filter(|l| l.alloc_type != AllocType::Discovered)
            .collect()
    }

    pub fn configured_ids(&self) -> Vec<LinkId> {
        self.configured().iter().map(|l| l.id).collect()
    }

    pub fn find_configured(&self, id: LinkId) -> Option<&'a AddressLink> {
        self.configured().into_iter().find(|l| l.id == id)
    }

    pub fn has_configured_links(&self) -> bool {
        self.all()
            .iter()
            .any(|l| l.alloc_type != AllocType::Discovered)
    }

    pub fn dhcp_link(&self) -> Option<&'a AddressLink> {
        self.all()
            .into_iter()
            .find(|l| l.alloc_type == AllocType::Dhcp)
    }

    pub fn link_up_link(&self) -> Option<&'a AddressLink> {
        self.all().into_iter().find(|l| l.is_link_up())
    }

    /// AUTO links, optionally filtered on whether they hold an address.
    pub fn auto_links(&self, with_ip: bool) -> Vec<&'a AddressLink> {
        self.all()
            .into_iter()
            .filter(|l| l.alloc_type == AllocType::Auto && l.ip.is_some() == with_ip)
            .collect()
    }

    /// Addresses observed on the interface within `subnet`.
    pub fn discovered_on(&self, subnet: SubnetId) -> Vec<IpAddr> {
        self.all()
            .into_iter()
            .filter(|l| l.alloc_type == AllocType::Discovered && l.subnet == Some(subnet))
            .filter_map(|l| l.ip)
            .collect()
    }

    /// The bond or bridge this interface is a member of, if any.
    pub fn aggregate(&self) -> Option<&'a Interface> {
        self.inventory
            .children_of(self.interface.id)
            .find(|child| child.kind.aggregates_parents())
    }

    pub fn interface_id(&self) -> InterfaceId {
        self.interface.id
    }
}
