// ── Gateway selection ──
//
// A node's default IPv4 and IPv6 gateways are links on its interfaces.
// A link is usable as a gateway when its subnet advertises a gateway IP
// and it actually carries (or will carry) an address: AUTO, DHCP and
// STICKY links with an address qualify; link-up and observed links do not.

use serde::Serialize;

use crate::link::{FieldErrors, LinkError};
use crate::model::{AddressFamily, AddressLink, AllocType, LinkId};
use crate::registry::LinkRegistry;
use crate::store::Inventory;

/// Usable gateway links of one interface, partitioned by family.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GatewayCandidates {
    pub ipv4: Vec<LinkId>,
    pub ipv6: Vec<LinkId>,
}

impl GatewayCandidates {
    pub fn family(&self, family: AddressFamily) -> &[LinkId] {
        match family {
            AddressFamily::Ipv4 => &self.ipv4,
            AddressFamily::Ipv6 => &self.ipv6,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ipv4.is_empty() && self.ipv6.is_empty()
    }

    /// All candidate ids, IPv4 first.
    pub fn all(&self) -> Vec<LinkId> {
        self.ipv4.iter().chain(&self.ipv6).copied().collect()
    }

    pub fn family_of(&self, link: LinkId) -> Option<AddressFamily> {
        [AddressFamily::Ipv4, AddressFamily::Ipv6]
            .into_iter()
            .find(|f| self.family(*f).contains(&link))
    }
}

/// Family-to-link assignments to apply to the owning node.
pub type GatewayAssignment = Vec<(AddressFamily, LinkId)>;

pub struct GatewaySelector<'a> {
    inventory: &'a Inventory,
}

impl<'a> GatewaySelector<'a> {
    pub fn new(inventory: &'a Inventory) -> Self {
        Self { inventory }
    }

    /// The gateway family `link` would serve, if it can serve one.
    pub fn usable_family(&self, link: &AddressLink) -> Option<AddressFamily> {
        let usable_type = match link.alloc_type {
            AllocType::Auto | AllocType::Dhcp => true,
            AllocType::Sticky => link.ip.is_some(),
            AllocType::Discovered => false,
        };
        if !usable_type {
            return None;
        }
        let subnet = self.inventory.subnet(link.subnet?)?;
        subnet.gateway_ip.map(|_| subnet.family())
    }

    pub fn candidates(&self, registry: &LinkRegistry<'_>) -> GatewayCandidates {
        let mut candidates = GatewayCandidates::default();
        for link in registry.configured() {
            match self.usable_family(link) {
                Some(AddressFamily::Ipv4) => candidates.ipv4.push(link.id),
                Some(AddressFamily::Ipv6) => candidates.ipv6.push(link.id),
                None => {}
            }
        }
        candidates
    }

    /// Decide which links become the node's gateways.
    ///
    /// With `link_id`, that link's family is set and the other family is
    /// filled in only when it has exactly one candidate. Without it, every
    /// family must be unambiguous.
    pub fn select(
        &self,
        candidates: &GatewayCandidates,
        link_id: Option<LinkId>,
    ) -> Result<GatewayAssignment, FieldErrors> {
        if candidates.is_empty() {
            return Err(LinkError::NoUsableGateways.into());
        }

        let single = |family: AddressFamily| match candidates.family(family) {
            [only] => Some((family, *only)),
            _ => None,
        };

        if let Some(link_id) = link_id {
            let Some(family) = candidates.family_of(link_id) else {
                return Err(LinkError::InvalidChoice {
                    field: "link_id",
                    value: link_id.to_string(),
                }
                .into());
            };
            let other = match family {
                AddressFamily::Ipv4 => AddressFamily::Ipv6,
                AddressFamily::Ipv6 => AddressFamily::Ipv4,
            };
            let mut assignment = vec![(family, link_id)];
            assignment.extend(single(other));
            assignment.sort_by_key(|(f, _)| *f);
            return Ok(assignment);
        }

        let ambiguous: Vec<String> = [AddressFamily::Ipv4, AddressFamily::Ipv6]
            .into_iter()
            .filter(|f| candidates.family(*f).len() > 1)
            .map(|f| f.to_string())
            .collect();
        if !ambiguous.is_empty() {
            return Err(LinkError::AmbiguousGateway {
                families: ambiguous.join(" and "),
            }
            .into());
        }

        Ok([AddressFamily::Ipv4, AddressFamily::Ipv6]
            .into_iter()
            .filter_map(single)
            .collect())
    }
}
