// ── Host-map synchronization ──
//
// For subnets whose DHCP is managed, every address bound to an interface
// must be mirrored as a static host mapping on the DHCP server. The link
// engine computes the mappings to add or retract inside its transaction;
// a `HostMapSync` implementation applies them after commit.

use std::future::Future;
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Interface, MacAddress, Subnet, SubnetId};
use crate::store::Inventory;

/// A static IP-to-MAC binding on a managed subnet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostMap {
    pub interface: String,
    pub mac: MacAddress,
    pub ip: IpAddr,
    pub subnet: SubnetId,
    pub cidr: IpNetwork,
}

impl HostMap {
    pub fn new(interface: &Interface, subnet: &Subnet, ip: IpAddr) -> Self {
        Self {
            interface: interface.name.clone(),
            mac: interface.mac.clone(),
            ip,
            subnet: subnet.id,
            cidr: subnet.cidr,
        }
    }

    pub fn to_entry(&self) -> maas_api::HostMapEntry {
        maas_api::HostMapEntry {
            subnet_id: self.subnet.get(),
            cidr: self.cidr.to_string(),
            ip: self.ip,
            mac: self.mac.to_string(),
            hostname: self.interface.clone(),
        }
    }
}

/// A pending change to a DHCP server's host maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HostMapAction {
    Add(HostMap),
    Remove(HostMap),
}

impl HostMapAction {
    pub fn host_map(&self) -> &HostMap {
        match self {
            Self::Add(map) | Self::Remove(map) => map,
        }
    }

    /// Whether `inventory` still calls for this change: an add while some
    /// link stands for the map, a remove while none does.
    pub fn is_current(&self, inventory: &Inventory) -> bool {
        let wanted = crate::link::stands_for(inventory, self.host_map());
        match self {
            Self::Add(_) => wanted,
            Self::Remove(_) => !wanted,
        }
    }

    /// Apply this action through `sync`.
    pub async fn apply<S: HostMapSync>(&self, sync: &S) -> Result<(), CoreError> {
        match self {
            Self::Add(map) => sync.add(map).await,
            Self::Remove(map) => sync.remove(map).await,
        }
    }
}

/// A failed host-map call, reported alongside the committed result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostMapFailure {
    pub action: HostMapAction,
    pub error: String,
}

// ── Sync contract ───────────────────────────────────────────────────

/// Pushes host maps to whatever serves DHCP for managed subnets.
pub trait HostMapSync: Send + Sync {
    fn add(&self, map: &HostMap) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn remove(&self, map: &HostMap) -> impl Future<Output = Result<(), CoreError>> + Send;
}

impl HostMapSync for maas_api::DhcpAgentClient {
    async fn add(&self, map: &HostMap) -> Result<(), CoreError> {
        self.add_host_map(&map.to_entry()).await?;
        Ok(())
    }

    async fn remove(&self, map: &HostMap) -> Result<(), CoreError> {
        self.remove_host_map(&map.to_entry()).await?;
        Ok(())
    }
}

/// Host maps as deployed: pushed to the agent when one is configured.
pub type AgentHostMaps = Option<maas_api::DhcpAgentClient>;

/// `None` means no agent is configured: calls succeed without effect.
impl<T: HostMapSync> HostMapSync for Option<T> {
    async fn add(&self, map: &HostMap) -> Result<(), CoreError> {
        match self {
            Some(inner) => inner.add(map).await,
            None => Ok(()),
        }
    }

    async fn remove(&self, map: &HostMap) -> Result<(), CoreError> {
        match self {
            Some(inner) => inner.remove(map).await,
            None => Ok(()),
        }
    }
}

/// For deployments without managed DHCP.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHostMaps;

impl HostMapSync for NoopHostMaps {
    async fn add(&self, map: &HostMap) -> Result<(), CoreError> {
        debug!(ip = %map.ip, "host map add skipped: no agent");
        Ok(())
    }

    async fn remove(&self, map: &HostMap) -> Result<(), CoreError> {
        debug!(ip = %map.ip, "host map remove skipped: no agent");
        Ok(())
    }
}

/// Records every call. Can be switched into failing mode.
#[derive(Debug, Default)]
pub struct RecordingHostMaps {
    calls: Mutex<Vec<HostMapAction>>,
    failure: Mutex<Option<String>>,
}

impl RecordingHostMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent calls fail with `message` (still recording them).
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(message.into());
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn calls(&self) -> Vec<HostMapAction> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, action: HostMapAction) -> Result<(), CoreError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action);
        match self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            Some(message) => Err(CoreError::Rejected {
                service: "DHCP agent".into(),
                message,
            }),
            None => Ok(()),
        }
    }
}

impl HostMapSync for RecordingHostMaps {
    async fn add(&self, map: &HostMap) -> Result<(), CoreError> {
        self.record(HostMapAction::Add(map.clone()))
    }

    async fn remove(&self, map: &HostMap) -> Result<(), CoreError> {
        self.record(HostMapAction::Remove(map.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    fn sample() -> HostMap {
        let fixture = Fixture::managed_v4();
        let iface = fixture.inventory.interface(fixture.eth0).unwrap();
        let subnet = fixture.inventory.subnet(fixture.subnet).unwrap();
        HostMap::new(iface, subnet, "10.0.0.200".parse().unwrap())
    }

    #[test]
    fn entry_carries_subnet_and_mac() {
        let entry = sample().to_entry();
        assert_eq!(entry.cidr, "10.0.0.0/24");
        assert_eq!(entry.mac, "52:54:00:00:00:01");
        assert_eq!(entry.hostname, "eth0");
    }

    #[tokio::test]
    async fn none_is_a_noop() {
        let sync: Option<RecordingHostMaps> = None;
        assert!(sync.add(&sample()).await.is_ok());
    }

    #[tokio::test]
    async fn recording_fails_on_demand() {
        let sync = RecordingHostMaps::new();
        sync.fail_with("agent down");
        assert!(HostMapAction::Add(sample()).apply(&sync).await.is_err());
        sync.recover();
        assert!(HostMapAction::Remove(sample()).apply(&sync).await.is_ok());
        assert_eq!(sync.calls().len(), 2);
    }
}
