// ── Interface link state machine ──
//
// Validates and applies link, unlink and default-gateway requests against
// a store transaction. Validation collects every problem into a
// `FieldErrors` map before anything is written; application mutates the
// transaction and returns the host-map changes the caller must push once
// the transaction has committed.

mod errors;
mod request;

pub use errors::{FieldErrors, LinkError, NON_FIELD};
pub use request::{LinkRequest, SetGatewayRequest, UnlinkRequest};

use std::net::IpAddr;

use tracing::{debug, info};

use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::gateway::{GatewayAssignment, GatewaySelector};
use crate::hostmap::{HostMap, HostMapAction};
use crate::model::{
    AddressLink, AllocType, Interface, InterfaceId, InterfaceKind, LinkMode, SubnetId,
};
use crate::pool::AddressPool;
use crate::registry::LinkRegistry;
use crate::store::{Inventory, Transaction};

/// Result of a state-machine operation plus the host-map changes it implies.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<T> {
    pub value: T,
    pub host_maps: Vec<HostMapAction>,
}

/// A link request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ValidLink {
    mode: LinkMode,
    subnet: Option<SubnetId>,
    ip: Option<IpAddr>,
    default_gateway: bool,
}

#[derive(Debug, Clone)]
pub struct LinkStateMachine {
    max_pick_attempts: u32,
}

impl LinkStateMachine {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            max_pick_attempts: config.max_pick_attempts.max(1),
        }
    }

    // ── Link ─────────────────────────────────────────────────────────

    pub fn link(
        &self,
        txn: &mut Transaction<'_>,
        interface: InterfaceId,
        request: &LinkRequest,
    ) -> Result<Applied<AddressLink>, CoreError> {
        let iface = txn.require_interface(interface)?.clone();
        let valid = validate_link(txn, &iface, request)?;

        // A link-up link only stands in for "no configuration"; any new link
        // replaces it.
        let link_up: Vec<_> = LinkRegistry::new(txn, &iface)
            .all()
            .iter()
            .filter(|l| l.is_link_up())
            .map(|l| l.id)
            .collect();
        for id in link_up {
            txn.delete_link(id)?;
        }

        let link = match valid.mode {
            LinkMode::Dhcp => txn.insert_link(iface.id, AllocType::Dhcp, valid.subnet, None)?,
            LinkMode::Auto => txn.insert_link(iface.id, AllocType::Auto, valid.subnet, None)?,
            LinkMode::LinkUp => {
                txn.insert_link(iface.id, AllocType::Sticky, valid.subnet, None)?
            }
            LinkMode::Static => {
                let subnet = valid
                    .subnet
                    .ok_or_else(|| CoreError::Internal("validated static link without subnet".into()))?;
                match valid.ip {
                    Some(ip) => {
                        txn.insert_link(iface.id, AllocType::Sticky, Some(subnet), Some(ip))?
                    }
                    None => self.pick_with_retry(txn, subnet, |txn, ip| {
                        txn.insert_link(iface.id, AllocType::Sticky, Some(subnet), Some(ip))
                    })?,
                }
            }
        };

        if valid.default_gateway {
            if let Some(subnet) = link.subnet.and_then(|s| txn.subnet(s)) {
                let family = subnet.family();
                txn.set_gateway(iface.node, family, Some(link.id))?;
            }
        }

        let host_maps = host_maps_for(txn, &iface, &link)
            .into_iter()
            .map(HostMapAction::Add)
            .collect();
        info!(
            interface = %iface.name,
            link = %link.id,
            mode = %valid.mode,
            ip = ?link.ip,
            "interface linked"
        );
        Ok(Applied {
            value: link,
            host_maps,
        })
    }

    // ── Unlink ───────────────────────────────────────────────────────

    pub fn unlink(
        &self,
        txn: &mut Transaction<'_>,
        interface: InterfaceId,
        request: &UnlinkRequest,
    ) -> Result<Applied<AddressLink>, CoreError> {
        let iface = txn.require_interface(interface)?.clone();
        let Some(id) = request.id else {
            return Err(FieldErrors::from(LinkError::Required { field: "id" }).into());
        };

        let (link, maps) = {
            let registry = LinkRegistry::new(txn, &iface);
            let Some(link) = registry.find_configured(id).cloned() else {
                return Err(FieldErrors::from(LinkError::UnknownLinkId {
                    id,
                    valid: registry.configured_ids(),
                })
                .into());
            };
            let maps = host_maps_for(txn, &iface, &link);
            (link, maps)
        };

        txn.delete_link(id)?;
        info!(interface = %iface.name, link = %id, "interface unlinked");
        Ok(Applied {
            value: link,
            host_maps: maps.into_iter().map(HostMapAction::Remove).collect(),
        })
    }

    // ── Default gateway ──────────────────────────────────────────────

    pub fn set_default_gateway(
        &self,
        txn: &mut Transaction<'_>,
        interface: InterfaceId,
        request: &SetGatewayRequest,
    ) -> Result<GatewayAssignment, CoreError> {
        let iface = txn.require_interface(interface)?.clone();
        let assignment = {
            let registry = LinkRegistry::new(txn, &iface);
            let selector = GatewaySelector::new(txn);
            let candidates = selector.candidates(&registry);
            selector.select(&candidates, request.link_id)?
        };
        for (family, link) in &assignment {
            txn.set_gateway(iface.node, *family, Some(*link))?;
            info!(node = %iface.node, %family, %link, "default gateway set");
        }
        Ok(assignment)
    }

    // ── AUTO address lifecycle ───────────────────────────────────────

    /// Give every AUTO link on the interface a concrete address.
    pub fn claim_auto_ips(
        &self,
        txn: &mut Transaction<'_>,
        interface: InterfaceId,
    ) -> Result<Applied<Vec<AddressLink>>, CoreError> {
        let iface = txn.require_interface(interface)?.clone();
        let pending: Vec<(_, _)> = LinkRegistry::new(txn, &iface)
            .auto_links(false)
            .iter()
            .filter_map(|l| l.subnet.map(|s| (l.id, s)))
            .collect();

        let mut claimed = Vec::with_capacity(pending.len());
        let mut host_maps = Vec::new();
        for (id, subnet) in pending {
            let link = self.pick_with_retry(txn, subnet, |txn, ip| txn.assign_ip(id, ip))?;
            host_maps.extend(host_maps_for(txn, &iface, &link).into_iter().map(HostMapAction::Add));
            debug!(link = %link.id, ip = ?link.ip, "auto address claimed");
            claimed.push(link);
        }
        Ok(Applied {
            value: claimed,
            host_maps,
        })
    }

    /// Return every claimed AUTO address on the interface to its pool.
    pub fn release_auto_ips(
        &self,
        txn: &mut Transaction<'_>,
        interface: InterfaceId,
    ) -> Result<Applied<Vec<AddressLink>>, CoreError> {
        let iface = txn.require_interface(interface)?.clone();
        let held: Vec<AddressLink> = LinkRegistry::new(txn, &iface)
            .auto_links(true)
            .into_iter()
            .cloned()
            .collect();

        let mut host_maps = Vec::new();
        let mut released = Vec::with_capacity(held.len());
        for mut link in held {
            host_maps.extend(host_maps_for(txn, &iface, &link).into_iter().map(HostMapAction::Remove));
            txn.clear_ip(link.id)?;
            debug!(link = %link.id, ip = ?link.ip, "auto address released");
            link.ip = None;
            released.push(link);
        }
        Ok(Applied {
            value: released,
            host_maps,
        })
    }

    /// Pick the lowest free address on `subnet` and hand it to `commit`,
    /// retrying with that address excluded when it turns out to be held.
    /// Under the store lock the first pick is normally free; the retry
    /// covers a `commit` that takes addresses of its own before inserting.
    fn pick_with_retry<F>(
        &self,
        txn: &mut Transaction<'_>,
        subnet: SubnetId,
        mut commit: F,
    ) -> Result<AddressLink, CoreError>
    where
        F: FnMut(&mut Transaction<'_>, IpAddr) -> Result<AddressLink, CoreError>,
    {
        let subnet = txn.require_subnet(subnet)?.clone();
        let pool = AddressPool::new(&subnet);
        let mut excluded = txn.allocated_ips(subnet.id);

        for attempt in 1..=self.max_pick_attempts {
            let ip = pool
                .pick_free(pool.range_for(), &excluded)
                .map_err(FieldErrors::from)?;
            match commit(&mut *txn, ip) {
                Err(CoreError::AddressConflict { .. }) => {
                    debug!(attempt, %ip, subnet = %subnet.name, "picked address is held, retrying");
                    excluded.insert(ip);
                }
                other => return other,
            }
        }
        Err(FieldErrors::from(LinkError::RangeExhausted {
            subnet: subnet.name.clone(),
        })
        .into())
    }
}

// ── Validation ──────────────────────────────────────────────────────

fn validate_link(
    inventory: &Inventory,
    iface: &Interface,
    request: &LinkRequest,
) -> Result<ValidLink, CoreError> {
    let registry = LinkRegistry::new(inventory, iface);
    let mut errors = FieldErrors::new();

    let mode = match request.mode.as_deref().map(str::trim) {
        None | Some("") => {
            errors.push(&LinkError::Required { field: "mode" });
            None
        }
        Some(raw) => raw.parse::<LinkMode>().map_or_else(
            |_| {
                errors.push(&LinkError::InvalidChoice {
                    field: "mode",
                    value: raw.to_string(),
                });
                None
            },
            Some,
        ),
    };

    let subnet = request.subnet.and_then(|id| {
        let found = inventory.subnet(id).filter(|s| s.vlan == iface.vlan);
        if found.is_none() {
            errors.push(&LinkError::SubnetNotOnVlan);
        }
        found
    });

    let ip = match request.ip_address.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match raw.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                errors.push(&LinkError::InvalidIpAddress);
                None
            }
        },
    };

    if let Some(aggregate) = registry.aggregate() {
        errors.push(&LinkError::InterfaceInBond {
            interface: iface.name.clone(),
            kind: if aggregate.kind == InterfaceKind::Bridge {
                "bridge"
            } else {
                "bond"
            },
            parent: aggregate.name.clone(),
        });
    }

    let Some(mode) = mode else {
        return Err(errors.into());
    };

    match mode {
        LinkMode::Dhcp => {
            if request.default_gateway {
                errors.push(&LinkError::InvalidModeForGateway { mode });
            }
            if let Some(existing) = registry.dhcp_link() {
                errors.push(&LinkError::AlreadyDhcp {
                    subnet: existing
                        .subnet
                        .and_then(|s| inventory.subnet(s))
                        .map(|s| s.name.clone()),
                });
            }
        }
        LinkMode::LinkUp => {
            if request.default_gateway {
                errors.push(&LinkError::InvalidModeForGateway { mode });
            }
            // Observed addresses do not count; only configuration blocks link-up.
            if registry.has_configured_links() {
                errors.push(&LinkError::OtherLinksExist);
            }
        }
        LinkMode::Static | LinkMode::Auto => {
            if request.default_gateway {
                match (request.subnet, subnet) {
                    (None, _) => errors.push(&LinkError::SubnetRequiredForGateway),
                    (Some(_), Some(s)) if s.gateway_ip.is_none() => {
                        errors.push(&LinkError::RequiredGateway {
                            subnet: s.name.clone(),
                        });
                    }
                    _ => {}
                }
            }
            if request.subnet.is_none() {
                errors.push(&LinkError::Required { field: "subnet" });
            }
            if let (LinkMode::Static, Some(subnet), Some(ip)) = (mode, subnet, ip) {
                let pool = AddressPool::new(subnet);
                if !pool.is_in_cidr(ip) {
                    errors.push(&LinkError::AddressNotInSubnet {
                        subnet: subnet.name.clone(),
                    });
                } else if let Some(range) =
                    subnet.dynamic_range().filter(|r| r.contains(ip))
                {
                    errors.push(&LinkError::AddressInDynamicRange { range });
                } else if inventory.link_holding(subnet.id, ip).is_some() {
                    errors.push(&LinkError::AddressInUse);
                }
            }
        }
    }

    errors.into_result()?;
    Ok(ValidLink {
        mode,
        subnet: subnet.map(|s| s.id),
        ip,
        default_gateway: request.default_gateway,
    })
}

/// Whether some configured link in `inventory` still stands for `map`.
pub(crate) fn stands_for(inventory: &Inventory, map: &HostMap) -> bool {
    inventory
        .interfaces
        .iter()
        .filter(|iface| iface.mac == map.mac)
        .any(|iface| {
            LinkRegistry::new(inventory, iface)
                .configured()
                .into_iter()
                .any(|link| host_maps_for(inventory, iface, link).contains(map))
        })
}

/// Host maps an address link stands for on a managed subnet. A DHCP link
/// has no address of its own; it stands for the addresses observed on the
/// interface in the same subnet.
fn host_maps_for(inventory: &Inventory, iface: &Interface, link: &AddressLink) -> Vec<HostMap> {
    let Some(subnet) = link.subnet.and_then(|s| inventory.subnet(s)) else {
        return Vec::new();
    };
    if !subnet.is_managed() {
        return Vec::new();
    }
    match link.alloc_type {
        AllocType::Dhcp => LinkRegistry::new(inventory, iface)
            .discovered_on(subnet.id)
            .into_iter()
            .map(|ip| HostMap::new(iface, subnet, ip))
            .collect(),
        AllocType::Auto | AllocType::Sticky => link
            .ip
            .map(|ip| HostMap::new(iface, subnet, ip))
            .into_iter()
            .collect(),
        AllocType::Discovered => Vec::new(),
    }
}
