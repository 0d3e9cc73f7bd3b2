// maas-core: Interface link allocation engine between the inventory and
// its consumers (CLI), plus the UEFI ARM64 bootloader installer.

pub mod boot;
pub mod config;
pub mod error;
pub mod gateway;
pub mod hostmap;
pub mod link;
pub mod model;
pub mod pool;
pub mod registry;
pub mod service;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use boot::{BootError, BootMethod, SystemRunner, UefiArm64BootMethod};
pub use config::{BootConfig, CoreConfig, HostMapAgentConfig, TlsVerification};
pub use error::CoreError;
pub use gateway::{GatewayAssignment, GatewayCandidates, GatewaySelector};
pub use hostmap::{
    AgentHostMaps, HostMap, HostMapAction, HostMapFailure, HostMapSync, NoopHostMaps,
    RecordingHostMaps,
};
pub use link::{
    FieldErrors, LinkError, LinkRequest, LinkStateMachine, SetGatewayRequest, UnlinkRequest,
};
pub use pool::{AddressPool, PickRange};
pub use registry::LinkRegistry;
pub use service::{LinkOutcome, NetworkService, Outcome, ReconcileReport};
pub use store::{Inventory, NetworkStore, Transaction};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AddressFamily, AddressLink, AllocType, Interface, InterfaceId, InterfaceKind, IpRange, LinkId,
    LinkMode, MacAddress, Node, NodeId, Subnet, SubnetId, SubnetManagement, Vlan, VlanId,
};
