// ── Unified domain model ──
//
// Canonical representation of the entities the link engine reasons
// about. The store holds them; every other module borrows them.

pub mod ids;

pub mod interface;
pub mod link;
pub mod node;
pub mod subnet;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use maas_core::model::*` gives you everything.

pub use ids::{InterfaceId, LinkId, MacAddress, NodeId, SubnetId, VlanId};
pub use interface::{Interface, InterfaceKind};
pub use link::{AddressLink, AllocType, LinkMode};
pub use node::Node;
pub use subnet::{AddressFamily, IpRange, Subnet, SubnetManagement, Vlan};
