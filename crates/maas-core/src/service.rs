// ── Network service ──
//
// The entry point for consumers. Runs every link-engine operation inside
// one store transaction, then pushes the resulting host-map changes to
// the DHCP collaborator. Host-map failures never roll back a committed
// change: they are logged, reported in the outcome and queued in the
// inventory until `reconcile_host_maps()` replays them.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::gateway::{GatewayAssignment, GatewayCandidates, GatewaySelector};
use crate::hostmap::{HostMapAction, HostMapFailure, HostMapSync};
use crate::link::{Applied, LinkRequest, LinkStateMachine, SetGatewayRequest, UnlinkRequest};
use crate::model::{AddressLink, InterfaceId};
use crate::registry::LinkRegistry;
use crate::store::{Inventory, NetworkStore};

/// A committed result and the host-map calls that failed after commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub value: T,
    pub host_map_failures: Vec<HostMapFailure>,
}

impl<T> Outcome<T> {
    pub fn is_clean(&self) -> bool {
        self.host_map_failures.is_empty()
    }
}

pub type LinkOutcome = Outcome<AddressLink>;

/// What a reconciliation pass achieved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub replayed: usize,
    pub still_failing: Vec<HostMapFailure>,
}

/// Cheaply cloneable via `Arc<ServiceInner>`.
pub struct NetworkService<H> {
    inner: Arc<ServiceInner<H>>,
}

impl<H> Clone for NetworkService<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ServiceInner<H> {
    store: NetworkStore,
    machine: LinkStateMachine,
    host_maps: H,
}

impl<H: HostMapSync> NetworkService<H> {
    pub fn new(inventory: Inventory, config: &CoreConfig, host_maps: H) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                store: NetworkStore::new(inventory),
                machine: LinkStateMachine::new(config),
                host_maps,
            }),
        }
    }

    pub fn store(&self) -> &NetworkStore {
        &self.inner.store
    }

    pub fn host_maps(&self) -> &H {
        &self.inner.host_maps
    }

    pub async fn snapshot(&self) -> Inventory {
        self.inner.store.snapshot().await
    }

    // ── Operations ───────────────────────────────────────────────────

    pub async fn link(
        &self,
        interface: InterfaceId,
        request: &LinkRequest,
    ) -> Result<LinkOutcome, CoreError> {
        let applied = self
            .commit(|machine, txn| machine.link(txn, interface, request))
            .await?;
        self.finish(applied).await
    }

    pub async fn unlink(
        &self,
        interface: InterfaceId,
        request: &UnlinkRequest,
    ) -> Result<LinkOutcome, CoreError> {
        let applied = self
            .commit(|machine, txn| machine.unlink(txn, interface, request))
            .await?;
        self.finish(applied).await
    }

    pub async fn set_default_gateway(
        &self,
        interface: InterfaceId,
        request: &SetGatewayRequest,
    ) -> Result<GatewayAssignment, CoreError> {
        let machine = &self.inner.machine;
        self.inner
            .store
            .transaction(|txn| machine.set_default_gateway(txn, interface, request))
            .await
    }

    /// Links the interface could use as a default gateway.
    pub async fn gateway_choices(
        &self,
        interface: InterfaceId,
    ) -> Result<GatewayCandidates, CoreError> {
        self.inner
            .store
            .read(|inv| -> Result<GatewayCandidates, CoreError> {
                let iface = inv.require_interface(interface)?;
                let registry = LinkRegistry::new(inv, iface);
                Ok(GatewaySelector::new(inv).candidates(&registry))
            })
            .await
    }

    pub async fn claim_auto_ips(
        &self,
        interface: InterfaceId,
    ) -> Result<Outcome<Vec<AddressLink>>, CoreError> {
        let applied = self
            .commit(|machine, txn| machine.claim_auto_ips(txn, interface))
            .await?;
        self.finish(applied).await
    }

    pub async fn release_auto_ips(
        &self,
        interface: InterfaceId,
    ) -> Result<Outcome<Vec<AddressLink>>, CoreError> {
        let applied = self
            .commit(|machine, txn| machine.release_auto_ips(txn, interface))
            .await?;
        self.finish(applied).await
    }

    /// Replay queued host-map changes. Changes that committed state no
    /// longer calls for are dropped; calls that fail again are re-queued.
    pub async fn reconcile_host_maps(&self) -> Result<ReconcileReport, CoreError> {
        let pending = self
            .inner
            .store
            .transaction(|txn| Ok(txn.take_pending_host_maps()))
            .await?;
        if pending.is_empty() {
            return Ok(ReconcileReport::default());
        }

        let total = pending.len();
        let still_failing = self.push(&pending).await;
        self.requeue(&still_failing).await?;
        let report = ReconcileReport {
            replayed: total - still_failing.len(),
            still_failing,
        };
        info!(
            replayed = report.replayed,
            failing = report.still_failing.len(),
            "host maps reconciled"
        );
        Ok(report)
    }

    pub async fn pending_host_maps(&self) -> Vec<HostMapAction> {
        self.inner
            .store
            .read(|inv| inv.pending_host_maps.clone())
            .await
    }

    // ── Plumbing ─────────────────────────────────────────────────────

    /// Run a state-machine operation in a transaction. Queued host-map
    /// changes for the addresses it touches are superseded in the same
    /// commit.
    async fn commit<T, F>(&self, op: F) -> Result<Applied<T>, CoreError>
    where
        F: FnOnce(
            &LinkStateMachine,
            &mut crate::store::Transaction<'_>,
        ) -> Result<Applied<T>, CoreError>,
    {
        let machine = &self.inner.machine;
        self.inner
            .store
            .transaction(|txn| {
                let applied = op(machine, txn)?;
                txn.supersede_host_maps(&applied.host_maps);
                Ok(applied)
            })
            .await
    }

    async fn finish<T>(&self, applied: Applied<T>) -> Result<Outcome<T>, CoreError> {
        let failures = self.push(&applied.host_maps).await;
        self.requeue(&failures).await?;
        Ok(Outcome {
            value: applied.value,
            host_map_failures: failures,
        })
    }

    async fn push(&self, actions: &[HostMapAction]) -> Vec<HostMapFailure> {
        let mut failures = Vec::new();
        for action in actions {
            if let Err(e) = action.apply(&self.inner.host_maps).await {
                let map = action.host_map();
                warn!(
                    ip = %map.ip,
                    mac = %map.mac,
                    subnet = %map.subnet,
                    error = %e,
                    "host map sync failed, queued for reconciliation"
                );
                failures.push(HostMapFailure {
                    action: action.clone(),
                    error: e.to_string(),
                });
            }
        }
        failures
    }

    /// Queue failed calls in a fresh transaction. A newer commit may have
    /// made some of them stale by now; the queue drops those.
    async fn requeue(&self, failures: &[HostMapFailure]) -> Result<(), CoreError> {
        if failures.is_empty() {
            return Ok(());
        }
        let actions: Vec<_> = failures.iter().map(|f| f.action.clone()).collect();
        self.inner
            .store
            .transaction(|txn| {
                txn.queue_host_maps(actions);
                Ok(())
            })
            .await
    }
}
