// ── Subnet domain types ──

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::ids::{SubnetId, VlanId};

/// IP address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum AddressFamily {
    #[strum(serialize = "IPv4")]
    Ipv4,
    #[strum(serialize = "IPv6")]
    Ipv6,
}

impl AddressFamily {
    pub fn of(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::Ipv4,
            IpAddr::V6(_) => Self::Ipv6,
        }
    }
}

/// Convert an address to its integer form, used for range arithmetic.
pub(crate) fn ip_to_u128(ip: IpAddr) -> u128 {
    match ip {
        IpAddr::V4(v4) => u128::from(u32::from(v4)),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

pub(crate) fn u128_to_ip(family: AddressFamily, raw: u128) -> Option<IpAddr> {
    match family {
        AddressFamily::Ipv4 => u32::try_from(raw).ok().map(|n| IpAddr::V4(Ipv4Addr::from(n))),
        AddressFamily::Ipv6 => Some(IpAddr::V6(Ipv6Addr::from(raw))),
    }
}

// ── IpRange ─────────────────────────────────────────────────────────

/// An inclusive range of addresses of a single family.
///
/// `low` is guaranteed to be no greater than `high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawIpRange")]
pub struct IpRange {
    low: IpAddr,
    high: IpAddr,
}

#[derive(Deserialize)]
struct RawIpRange {
    low: IpAddr,
    high: IpAddr,
}

impl TryFrom<RawIpRange> for IpRange {
    type Error = String;

    fn try_from(raw: RawIpRange) -> Result<Self, Self::Error> {
        IpRange::new(raw.low, raw.high)
    }
}

impl IpRange {
    pub fn new(low: IpAddr, high: IpAddr) -> Result<Self, String> {
        if AddressFamily::of(low) != AddressFamily::of(high) {
            return Err("IP address ranges cannot mix IPv4 and IPv6".to_string());
        }
        if ip_to_u128(low) > ip_to_u128(high) {
            return Err(format!("IP address range {low} to {high} is decreasing"));
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> IpAddr {
        self.low
    }

    pub fn high(&self) -> IpAddr {
        self.high
    }

    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(self.low)
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        AddressFamily::of(ip) == self.family()
            && (ip_to_u128(self.low)..=ip_to_u128(self.high)).contains(&ip_to_u128(ip))
    }

    pub fn overlaps(&self, other: &IpRange) -> bool {
        self.family() == other.family()
            && ip_to_u128(self.low) <= ip_to_u128(other.high)
            && ip_to_u128(other.low) <= ip_to_u128(self.high)
    }

    /// True when both ends of the range fall inside `network`.
    pub fn is_within(&self, network: &IpNetwork) -> bool {
        network.contains(self.low) && network.contains(self.high)
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.low, self.high)
    }
}

// ── Management ──────────────────────────────────────────────────────

/// How a subnet's addresses are administered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SubnetManagement {
    /// Nobody hands out addresses on this subnet; any free address may be used.
    #[default]
    Unmanaged,
    /// A DHCP server is managed for this subnet. Host maps apply.
    Dhcp {
        dynamic_range: IpRange,
        static_range: IpRange,
    },
}

// ── Vlan ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vlan {
    pub id: VlanId,
    pub vid: u16,
    #[serde(default)]
    pub name: String,
}

// ── Subnet ──────────────────────────────────────────────────────────

/// The canonical Subnet type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    pub id: SubnetId,
    pub name: String,
    pub cidr: IpNetwork,
    #[serde(default)]
    pub gateway_ip: Option<IpAddr>,
    pub vlan: VlanId,
    #[serde(default)]
    pub management: SubnetManagement,
}

impl Subnet {
    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(self.cidr.ip())
    }

    pub fn is_managed(&self) -> bool {
        matches!(self.management, SubnetManagement::Dhcp { .. })
    }

    pub fn dynamic_range(&self) -> Option<IpRange> {
        match self.management {
            SubnetManagement::Dhcp { dynamic_range, .. } => Some(dynamic_range),
            SubnetManagement::Unmanaged => None,
        }
    }

    pub fn static_range(&self) -> Option<IpRange> {
        match self.management {
            SubnetManagement::Dhcp { static_range, .. } => Some(static_range),
            SubnetManagement::Unmanaged => None,
        }
    }

    /// Check the structural invariants of a managed subnet: both ranges lie
    /// inside the CIDR, have its family, and do not overlap.
    pub fn check_ranges(&self) -> Result<(), String> {
        if let Some(gateway) = self.gateway_ip {
            if !self.cidr.contains(gateway) {
                return Err(format!("gateway {gateway} is outside {}", self.cidr));
            }
        }
        let SubnetManagement::Dhcp {
            dynamic_range,
            static_range,
        } = self.management
        else {
            return Ok(());
        };
        for (label, range) in [("dynamic", dynamic_range), ("static", static_range)] {
            if !range.is_within(&self.cidr) {
                return Err(format!("{label} range {range} is outside {}", self.cidr));
            }
        }
        if dynamic_range.overlaps(&static_range) {
            return Err(format!(
                "dynamic range {dynamic_range} overlaps static range {static_range}"
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn managed(cidr: &str, dynamic: (&str, &str), fixed: (&str, &str)) -> Subnet {
        Subnet {
            id: SubnetId(1),
            name: "lab".into(),
            cidr: cidr.parse().unwrap(),
            gateway_ip: None,
            vlan: VlanId(1),
            management: SubnetManagement::Dhcp {
                dynamic_range: IpRange::new(ip(dynamic.0), ip(dynamic.1)).unwrap(),
                static_range: IpRange::new(ip(fixed.0), ip(fixed.1)).unwrap(),
            },
        }
    }

    #[test]
    fn range_rejects_mixed_families() {
        assert!(IpRange::new(ip("10.0.0.1"), ip("::1")).is_err());
    }

    #[test]
    fn range_rejects_decreasing_bounds() {
        assert!(IpRange::new(ip("10.0.0.9"), ip("10.0.0.1")).is_err());
    }

    #[test]
    fn range_contains_is_inclusive() {
        let range = IpRange::new(ip("10.0.0.10"), ip("10.0.0.20")).unwrap();
        assert!(range.contains(ip("10.0.0.10")));
        assert!(range.contains(ip("10.0.0.20")));
        assert!(!range.contains(ip("10.0.0.21")));
        assert!(!range.contains(ip("::a")));
    }

    #[test]
    fn range_display_names_both_bounds() {
        let range = IpRange::new(ip("10.0.0.10"), ip("10.0.0.20")).unwrap();
        assert_eq!(range.to_string(), "10.0.0.10 to 10.0.0.20");
    }

    #[test]
    fn range_deserialization_validates() {
        let bad = r#"{"low": "10.0.0.9", "high": "10.0.0.1"}"#;
        assert!(serde_json::from_str::<IpRange>(bad).is_err());
    }

    #[test]
    fn check_ranges_accepts_disjoint_ranges() {
        let subnet = managed(
            "10.0.0.0/24",
            ("10.0.0.100", "10.0.0.199"),
            ("10.0.0.200", "10.0.0.250"),
        );
        assert!(subnet.check_ranges().is_ok());
        assert!(subnet.is_managed());
    }

    #[test]
    fn check_ranges_rejects_overlap() {
        let subnet = managed(
            "10.0.0.0/24",
            ("10.0.0.100", "10.0.0.210"),
            ("10.0.0.200", "10.0.0.250"),
        );
        assert!(subnet.check_ranges().unwrap_err().contains("overlaps"));
    }

    #[test]
    fn check_ranges_rejects_range_outside_cidr() {
        let subnet = managed(
            "10.0.0.0/24",
            ("10.0.1.100", "10.0.1.199"),
            ("10.0.0.200", "10.0.0.250"),
        );
        assert!(subnet.check_ranges().unwrap_err().contains("outside"));
    }

    #[test]
    fn family_follows_cidr() {
        let subnet = managed("fd00::/64", ("fd00::100", "fd00::1ff"), ("fd00::200", "fd00::2ff"));
        assert_eq!(subnet.family(), AddressFamily::Ipv6);
    }
}
