//! Package records and immutable snapshots of the inventory.
//!
//! A `Snapshot` is the unit the registry publishes: a point-in-time map from
//! package id to record behind an `Arc`, so handing it to any number of
//! subscribers is a pointer copy. Mutation is copy-on-write and produces a
//! new `Snapshot`; nothing a subscriber holds ever changes underneath it.

use std::collections::HashMap;
use std::sync::Arc;

/// Metadata for one installed package.
///
/// The installer path is deliberately not stored here; it is resolved through
/// the inventory source at the moment a checksum is computed, so a stale path
/// can never leak into published state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRecord {
    /// Unique package identifier (e.g. `org.example.editor`).
    pub package_id: String,
    /// Human-readable name for display.
    pub display_name: String,
    /// Version string as reported by the platform.
    pub version_name: String,
    /// Lowercase hex SHA-256 of the installer file, once computed.
    /// Write-once: goes `None -> Some` and never changes afterwards.
    pub checksum: Option<String>,
}

/// Immutable point-in-time view of the inventory, keyed by package id.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    records: Arc<HashMap<String, AppRecord>>,
}

impl Snapshot {
    /// Build a snapshot from records. On duplicate package ids the last
    /// record wins, matching map-insert semantics.
    pub fn from_records(records: impl IntoIterator<Item = AppRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.package_id.clone(), r))
            .collect();
        Self {
            records: Arc::new(records),
        }
    }

    pub fn get(&self, package_id: &str) -> Option<&AppRecord> {
        self.records.get(package_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AppRecord> {
        self.records.values()
    }

    /// Records ordered by display name (ties broken by package id), the order
    /// a list view wants.
    pub fn sorted_by_name(&self) -> Vec<&AppRecord> {
        let mut records: Vec<&AppRecord> = self.records.values().collect();
        records.sort_by(|a, b| {
            (a.display_name.as_str(), a.package_id.as_str())
                .cmp(&(b.display_name.as_str(), b.package_id.as_str()))
        });
        records
    }

    /// Copy-on-write merge of a freshly computed checksum.
    ///
    /// No-op (returns a clone of `self`) when the package is unknown or a
    /// checksum is already recorded: a checksum is written at most once per
    /// record and never overwritten.
    pub fn with_checksum(&self, package_id: &str, digest: &str) -> Snapshot {
        match self.records.get(package_id) {
            Some(record) if record.checksum.is_none() => {
                let mut records: HashMap<String, AppRecord> = (*self.records).clone();
                if let Some(record) = records.get_mut(package_id) {
                    record.checksum = Some(digest.to_owned());
                }
                Snapshot {
                    records: Arc::new(records),
                }
            }
            _ => self.clone(),
        }
    }
}
