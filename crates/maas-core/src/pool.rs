// ── Address pool ──
//
// Range queries and deterministic free-address picking for one subnet.
// Picking scans upward from the bottom of the range and skips the network
// and broadcast addresses, the gateway, the managed dynamic range and
// anything already allocated. The scan jumps over the dynamic range, so
// its cost is bounded by the number of allocated addresses, not by the
// size of the range.

use std::collections::HashSet;
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use strum::Display;

use crate::link::LinkError;
use crate::model::subnet::{ip_to_u128, u128_to_ip};
use crate::model::{AddressFamily, Subnet};

/// Which part of a subnet an address is picked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PickRange {
    /// The managed static range.
    Static,
    /// The whole CIDR.
    Cidr,
}

/// Read-only view of a subnet's address space.
#[derive(Debug, Clone, Copy)]
pub struct AddressPool<'a> {
    subnet: &'a Subnet,
}

impl<'a> AddressPool<'a> {
    pub fn new(subnet: &'a Subnet) -> Self {
        Self { subnet }
    }

    pub fn subnet(&self) -> &'a Subnet {
        self.subnet
    }

    pub fn is_in_dynamic_range(&self, ip: IpAddr) -> bool {
        self.subnet.dynamic_range().is_some_and(|r| r.contains(ip))
    }

    pub fn is_in_static_range(&self, ip: IpAddr) -> bool {
        self.subnet.static_range().is_some_and(|r| r.contains(ip))
    }

    pub fn is_in_cidr(&self, ip: IpAddr) -> bool {
        self.subnet.cidr.contains(ip)
    }

    /// Managed subnets hand out static addresses from their static range;
    /// unmanaged ones from anywhere in the CIDR.
    pub fn range_for(&self) -> PickRange {
        if self.subnet.is_managed() {
            PickRange::Static
        } else {
            PickRange::Cidr
        }
    }

    /// Addresses that are never handed out in a CIDR scan.
    fn reserved(&self, raw: u128) -> bool {
        let cidr = self.subnet.cidr;
        let network = ip_to_u128(cidr.network());
        match cidr {
            IpNetwork::V4(v4) if v4.prefix() < 31 => {
                raw == network || raw == ip_to_u128(cidr.broadcast())
            }
            IpNetwork::V4(_) => false,
            IpNetwork::V6(_) => raw == network,
        }
    }

    fn bounds(&self, range: PickRange) -> (u128, u128) {
        let cidr = self.subnet.cidr;
        let whole = (ip_to_u128(cidr.network()), ip_to_u128(cidr.broadcast()));
        match (range, self.subnet.static_range()) {
            (PickRange::Static, Some(fixed)) => (ip_to_u128(fixed.low()), ip_to_u128(fixed.high())),
            _ => whole,
        }
    }

    /// Lowest free address in `range`, skipping `allocated`.
    pub fn pick_free(
        &self,
        range: PickRange,
        allocated: &HashSet<IpAddr>,
    ) -> Result<IpAddr, LinkError> {
        let family: AddressFamily = self.subnet.family();
        let gateway = self.subnet.gateway_ip.map(ip_to_u128);
        let dynamic = self
            .subnet
            .dynamic_range()
            .map(|r| (ip_to_u128(r.low()), ip_to_u128(r.high())));
        let (low, high) = self.bounds(range);

        let mut cursor = low;
        while cursor <= high {
            if let Some((dyn_low, dyn_high)) = dynamic {
                if (dyn_low..=dyn_high).contains(&cursor) {
                    match dyn_high.checked_add(1) {
                        Some(next) => {
                            cursor = next;
                            continue;
                        }
                        None => break,
                    }
                }
            }
            if !self.reserved(cursor) && gateway != Some(cursor) {
                if let Some(ip) = u128_to_ip(family, cursor) {
                    if !allocated.contains(&ip) {
                        return Ok(ip);
                    }
                }
            }
            match cursor.checked_add(1) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        Err(LinkError::RangeExhausted {
            subnet: self.subnet.name.clone(),
        })
    }
}
