//! Single source of truth for the package -> record mapping.
//!
//! The registry owns the published snapshot and the in-flight set; every
//! mutation funnels through it. Checksums are computed at most once per
//! package no matter how many concurrent requests ask for one: the decision
//! to start a computation and the reservation of its in-flight slot happen
//! under one lock, and a finished digest is merged into the snapshot before
//! the slot is released.
//!
//! Enumeration and hashing run on blocking workers off the caller's task;
//! consumers only ever read published snapshots. A computation is never
//! cancelled when its requester stops watching; the result lands in the
//! shared snapshot for whoever looks next.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::task;

use crate::checksum::{Hasher, Sha256Hasher};
use crate::error::{Error, Result};
use crate::inventory::{InventorySource, PackageMeta};
use crate::model::{AppRecord, Snapshot};
use crate::state::{InventoryState, StateChannel, StateSubscription};

impl From<PackageMeta> for AppRecord {
    fn from(meta: PackageMeta) -> Self {
        // The install path stays behind the inventory source; records carry
        // only what a consumer may render.
        AppRecord {
            package_id: meta.package_id,
            display_name: meta.display_name,
            version_name: meta.version_name,
            checksum: None,
        }
    }
}

/// Cheaply clonable handle to the shared registry state.
pub struct PackageRegistry<S, H = Sha256Hasher> {
    inner: Arc<Inner<S, H>>,
}

impl<S, H> Clone for PackageRegistry<S, H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S, H> {
    source: S,
    hasher: H,
    channel: StateChannel,
    in_flight: Mutex<HashSet<String>>,
}

impl<S: InventorySource + 'static> PackageRegistry<S, Sha256Hasher> {
    pub fn new(source: S) -> Self {
        Self::with_hasher(source, Sha256Hasher)
    }
}

impl<S, H> PackageRegistry<S, H>
where
    S: InventorySource + 'static,
    H: Hasher + 'static,
{
    pub fn with_hasher(source: S, hasher: H) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                hasher,
                channel: StateChannel::new(),
                in_flight: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Latest published state.
    pub fn current(&self) -> InventoryState {
        self.inner.channel.current()
    }

    /// Subscribe to the current state and every subsequent update.
    pub fn subscribe(&self) -> StateSubscription {
        self.inner.channel.subscribe()
    }

    /// Enumerate the inventory and publish a fresh snapshot with no
    /// checksums. On enumeration failure, publishes `LoadFailed` so consumers
    /// can offer a retry, and returns the error; calling again retries.
    pub async fn load_all(&self) -> Result<()> {
        let inner = Arc::clone(&self.inner);
        let listed = task::spawn_blocking(move || inner.source.list_installed_packages())
            .await
            .map_err(|e| Error::Task(format!("enumeration worker: {e}")))?;

        match listed {
            Ok(metas) => {
                let snapshot = Snapshot::from_records(metas.into_iter().map(AppRecord::from));
                tracing::info!(packages = snapshot.len(), "inventory loaded");
                self.inner.channel.publish(InventoryState::Ready(snapshot));
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "inventory enumeration failed");
                self.inner
                    .channel
                    .publish(InventoryState::LoadFailed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Request a checksum for one package, fire-and-forget; the result is
    /// observable only through published snapshots.
    ///
    /// No-op when the package is unknown, its checksum is already recorded,
    /// or a computation for it is already in flight. The whole decision is
    /// made under the in-flight lock, so concurrent calls for the same
    /// package trigger exactly one computation.
    pub fn ensure_checksum(&self, package_id: &str) {
        let id = package_id.to_owned();
        {
            let mut in_flight = self.inner.in_flight.lock().unwrap();
            let state = self.inner.channel.current();
            let record = match state.snapshot().and_then(|s| s.get(&id)) {
                Some(record) => record,
                None => {
                    tracing::debug!(package = %id, "checksum requested for unknown package");
                    return;
                }
            };
            if record.checksum.is_some() {
                return;
            }
            if !in_flight.insert(id.clone()) {
                tracing::debug!(package = %id, "checksum computation already in flight");
                return;
            }
        }

        let inner = Arc::clone(&self.inner);
        task::spawn(async move {
            inner.compute_checksum(id).await;
        });
    }
}

impl<S, H> Inner<S, H>
where
    S: InventorySource + 'static,
    H: Hasher + 'static,
{
    async fn compute_checksum(self: Arc<Self>, package_id: String) {
        match self.resolve_and_digest(&package_id).await {
            Ok(digest) => {
                let merged = self.channel.modify(|state| match state {
                    InventoryState::Ready(snapshot) => {
                        // Vanished on reload, or already set: keep the
                        // published state as is.
                        let wanted = matches!(
                            snapshot.get(&package_id),
                            Some(record) if record.checksum.is_none()
                        );
                        if wanted {
                            *snapshot = snapshot.with_checksum(&package_id, &digest);
                        }
                        wanted
                    }
                    _ => false,
                });
                if merged {
                    tracing::debug!(package = %package_id, "checksum recorded");
                } else {
                    tracing::debug!(package = %package_id, "checksum discarded, record gone or already set");
                }
            }
            Err(e) => {
                // Per-package failures stay silent toward consumers: the
                // record keeps no checksum and a later request may try again.
                tracing::warn!(package = %package_id, error = %e, "checksum computation failed");
            }
        }
        self.in_flight.lock().unwrap().remove(&package_id);
    }

    async fn resolve_and_digest(self: &Arc<Self>, package_id: &str) -> Result<String> {
        let inner = Arc::clone(self);
        let id = package_id.to_owned();
        let path = task::spawn_blocking(move || inner.source.resolve_install_path(&id))
            .await
            .map_err(|e| Error::Task(format!("resolve worker: {e}")))??;

        tracing::debug!(package = %package_id, path = %path.display(), "hashing installer");
        let inner = Arc::clone(self);
        let digest = task::spawn_blocking(move || inner.hasher.digest(&path))
            .await
            .map_err(|e| Error::Task(format!("hash worker: {e}")))??;
        Ok(digest)
    }
}
