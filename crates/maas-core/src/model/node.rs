// ── Node domain type ──

use serde::{Deserialize, Serialize};

use super::ids::{LinkId, NodeId};
use super::subnet::AddressFamily;

/// A machine owning interfaces. Gateway references point at links on one
/// of its interfaces and are cleared when the link goes away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub hostname: String,
    #[serde(default)]
    pub gateway_link_ipv4: Option<LinkId>,
    #[serde(default)]
    pub gateway_link_ipv6: Option<LinkId>,
}

impl Node {
    pub fn gateway_link(&self, family: AddressFamily) -> Option<LinkId> {
        match family {
            AddressFamily::Ipv4 => self.gateway_link_ipv4,
            AddressFamily::Ipv6 => self.gateway_link_ipv6,
        }
    }

    pub fn set_gateway_link(&mut self, family: AddressFamily, link: Option<LinkId>) {
        match family {
            AddressFamily::Ipv4 => self.gateway_link_ipv4 = link,
            AddressFamily::Ipv6 => self.gateway_link_ipv6 = link,
        }
    }

    /// Drop any gateway reference to `link`. Returns true if one was cleared.
    pub fn forget_link(&mut self, link: LinkId) -> bool {
        let mut cleared = false;
        for family in [AddressFamily::Ipv4, AddressFamily::Ipv6] {
            if self.gateway_link(family) == Some(link) {
                self.set_gateway_link(family, None);
                cleared = true;
            }
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forget_link_clears_matching_family_only() {
        let mut node = Node {
            id: NodeId(1),
            hostname: "node01".into(),
            gateway_link_ipv4: Some(LinkId(3)),
            gateway_link_ipv6: Some(LinkId(4)),
        };
        assert!(node.forget_link(LinkId(3)));
        assert_eq!(node.gateway_link_ipv4, None);
        assert_eq!(node.gateway_link_ipv6, Some(LinkId(4)));
        assert!(!node.forget_link(LinkId(3)));
    }
}
