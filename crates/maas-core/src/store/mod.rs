// ── Network store ──
//
// Owns the inventory behind an async mutex. Every mutation runs as a
// transaction over a working copy: the closure either returns `Ok`, and
// the copy replaces the committed state, or `Err`, and the copy is
// dropped. Committed changes bump a version counter that subscribers can
// watch.

mod inventory;
mod transaction;

pub use inventory::Inventory;
pub use transaction::Transaction;

use tokio::sync::{Mutex, watch};
use tracing::trace;

use crate::error::CoreError;

pub struct NetworkStore {
    inventory: Mutex<Inventory>,
    version: watch::Sender<u64>,
}

impl NetworkStore {
    pub fn new(inventory: Inventory) -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            inventory: Mutex::new(inventory),
            version,
        }
    }

    /// Run `f` against a working copy; commit it only if `f` succeeds.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, CoreError>,
    {
        let mut committed = self.inventory.lock().await;
        let mut working = committed.clone();
        let value = f(&mut Transaction::new(&mut working))?;
        *committed = working;
        drop(committed);
        self.version.send_modify(|v| *v += 1);
        trace!(version = *self.version.borrow(), "transaction committed");
        Ok(value)
    }

    /// A copy of the committed state.
    pub async fn snapshot(&self) -> Inventory {
        self.inventory.lock().await.clone()
    }

    /// Read the committed state without copying it.
    pub async fn read<T>(&self, f: impl FnOnce(&Inventory) -> T) -> T {
        f(&*self.inventory.lock().await)
    }

    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// Subscribe to commit notifications.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn into_inventory(self) -> Inventory {
        self.inventory.into_inner()
    }
}
