// ── Transaction ──
//
// Typed write access to a working copy of the inventory. Reads go through
// `Deref<Target = Inventory>`; every write keeps the link invariants that
// the store guarantees: `(subnet, ip)` is unique and node gateway
// references never outlive their link.

use std::net::IpAddr;
use std::ops::Deref;

use chrono::Utc;
use tracing::debug;

use super::inventory::Inventory;
use crate::error::CoreError;
use crate::hostmap::HostMapAction;
use crate::model::{AddressFamily, AddressLink, AllocType, InterfaceId, LinkId, NodeId, SubnetId};

pub struct Transaction<'a> {
    inventory: &'a mut Inventory,
}

impl Deref for Transaction<'_> {
    type Target = Inventory;

    fn deref(&self) -> &Inventory {
        self.inventory
    }
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(inventory: &'a mut Inventory) -> Self {
        Self { inventory }
    }

    fn conflict(&self, subnet: SubnetId, ip: IpAddr) -> Result<(), CoreError> {
        if self.inventory.link_holding(subnet, ip).is_some() {
            let subnet = self
                .inventory
                .subnet(subnet)
                .map_or_else(|| subnet.to_string(), |s| s.name.clone());
            return Err(CoreError::AddressConflict { subnet, ip });
        }
        Ok(())
    }

    /// Create a link. Fails with `AddressConflict` when `(subnet, ip)` is
    /// already held.
    pub fn insert_link(
        &mut self,
        interface: InterfaceId,
        alloc_type: AllocType,
        subnet: Option<SubnetId>,
        ip: Option<IpAddr>,
    ) -> Result<AddressLink, CoreError> {
        self.inventory.require_interface(interface)?;
        if let Some(subnet) = subnet {
            self.inventory.require_subnet(subnet)?;
            if let Some(ip) = ip {
                self.conflict(subnet, ip)?;
            }
        }
        let link = AddressLink {
            id: self.inventory.allocate_link_id(),
            interface,
            alloc_type,
            subnet,
            ip,
            created: Utc::now(),
        };
        debug!(link = %link.id, %interface, ?alloc_type, ?ip, "link inserted");
        self.inventory.links.push(link.clone());
        Ok(link)
    }

    /// Give an existing link a concrete address.
    pub fn assign_ip(&mut self, link: LinkId, ip: IpAddr) -> Result<AddressLink, CoreError> {
        let subnet = self
            .inventory
            .link(link)
            .ok_or_else(|| CoreError::not_found("link", link))?
            .subnet
            .ok_or_else(|| CoreError::Internal(format!("link {link} has no subnet")))?;
        self.conflict(subnet, ip)?;
        let stored = self.link_mut(link)?;
        stored.ip = Some(ip);
        debug!(%link, %ip, "address assigned");
        Ok(stored.clone())
    }

    /// Drop the concrete address of a link. Returns the address it held.
    pub fn clear_ip(&mut self, link: LinkId) -> Result<Option<IpAddr>, CoreError> {
        Ok(self.link_mut(link)?.ip.take())
    }

    /// Delete a link and clear any node gateway reference to it.
    pub fn delete_link(&mut self, link: LinkId) -> Result<AddressLink, CoreError> {
        let index = self
            .inventory
            .links
            .iter()
            .position(|l| l.id == link)
            .ok_or_else(|| CoreError::not_found("link", link))?;
        let removed = self.inventory.links.remove(index);
        for node in &mut self.inventory.nodes {
            if node.forget_link(link) {
                debug!(node = %node.id, %link, "gateway reference cleared");
            }
        }
        debug!(%link, "link deleted");
        Ok(removed)
    }

    /// Point a node's gateway for `family` at `link` (or nowhere).
    pub fn set_gateway(
        &mut self,
        node: NodeId,
        family: AddressFamily,
        link: Option<LinkId>,
    ) -> Result<(), CoreError> {
        if let Some(link) = link {
            if self.inventory.link(link).is_none() {
                return Err(CoreError::not_found("link", link));
            }
        }
        let stored = self
            .inventory
            .nodes
            .iter_mut()
            .find(|n| n.id == node)
            .ok_or_else(|| CoreError::not_found("node", node))?;
        stored.set_gateway_link(family, link);
        debug!(%node, %family, ?link, "gateway updated");
        Ok(())
    }

    // ── Pending host maps ────────────────────────────────────────────

    /// Drop queued host-map changes for the addresses `actions` touch; the
    /// newer actions supersede them.
    pub fn supersede_host_maps(&mut self, actions: &[HostMapAction]) {
        let before = self.inventory.pending_host_maps.len();
        self.inventory.pending_host_maps.retain(|queued| {
            let queued = queued.host_map();
            !actions.iter().any(|a| {
                let map = a.host_map();
                map.subnet == queued.subnet && map.ip == queued.ip
            })
        });
        let dropped = before - self.inventory.pending_host_maps.len();
        if dropped > 0 {
            debug!(dropped, "superseded queued host maps");
        }
    }

    /// Queue host-map changes that could not be pushed. A change that a
    /// commit since made stale is dropped instead, as is one already queued.
    /// Returns how many were queued.
    pub fn queue_host_maps(&mut self, actions: impl IntoIterator<Item = HostMapAction>) -> usize {
        let mut queued = 0;
        for action in actions {
            if !action.is_current(self.inventory) {
                debug!(ip = %action.host_map().ip, "stale host map dropped");
                continue;
            }
            if !self.inventory.pending_host_maps.contains(&action) {
                self.inventory.pending_host_maps.push(action);
                queued += 1;
            }
        }
        queued
    }

    /// Drain the queue, keeping only changes committed state still calls for.
    pub fn take_pending_host_maps(&mut self) -> Vec<HostMapAction> {
        let pending = std::mem::take(&mut self.inventory.pending_host_maps);
        pending
            .into_iter()
            .filter(|action| action.is_current(self.inventory))
            .collect()
    }

    fn link_mut(&mut self, link: LinkId) -> Result<&mut AddressLink, CoreError> {
        self.inventory
            .links
            .iter_mut()
            .find(|l| l.id == link)
            .ok_or_else(|| CoreError::not_found("link", link))
    }
}
