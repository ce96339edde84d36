//! Cache snapshot export/import

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CachePayload, Purpose, RuntimeCache};
use crate::entity::EntitySettings;
use crate::error::{Error, Result};
use crate::schema::PropertyDefinitionCollection;
use crate::value::Value;

/// Snapshot format version; bumped on incompatible layout changes
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheSnapshot {
    version: u32,
    entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotEntry {
    subject: String,
    purpose: Purpose,
    payload: SnapshotPayload,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
enum SnapshotPayload {
    Definitions(IndexMap<String, String>),
    Defaults(IndexMap<String, serde_json::Value>),
    Settings(EntitySettings),
}

impl SnapshotPayload {
    fn purpose(&self) -> Purpose {
        match self {
            SnapshotPayload::Definitions(_) => Purpose::Definitions,
            SnapshotPayload::Defaults(_) => Purpose::Defaults,
            SnapshotPayload::Settings(_) => Purpose::Settings,
        }
    }

    fn capture(payload: &CachePayload) -> Option<Self> {
        match payload {
            CachePayload::Definitions(defs) => Some(SnapshotPayload::Definitions(defs.export())),
            CachePayload::Defaults(defaults) => defaults
                .iter()
                .map(|(name, value)| value.to_json().map(|json| (name.clone(), json)))
                .collect::<Option<IndexMap<_, _>>>()
                .map(SnapshotPayload::Defaults),
            CachePayload::Settings(settings) => {
                Some(SnapshotPayload::Settings(settings.as_ref().clone()))
            }
        }
    }

    fn restore(self) -> CachePayload {
        match self {
            SnapshotPayload::Definitions(pairs) => {
                CachePayload::Definitions(Arc::new(PropertyDefinitionCollection::from_pairs(pairs)))
            }
            SnapshotPayload::Defaults(values) => CachePayload::Defaults(Arc::new(
                values
                    .into_iter()
                    .map(|(name, json)| (name, Value::from(json)))
                    .collect(),
            )),
            SnapshotPayload::Settings(settings) => CachePayload::Settings(Arc::new(settings)),
        }
    }
}

impl RuntimeCache {
    /// Serialize every representable entry into an opaque blob
    ///
    /// Defaults holding objects are process-local and left out; they are
    /// recomputed on first use after an import.
    pub fn export(&self) -> Result<Vec<u8>> {
        let mut entries: Vec<SnapshotEntry> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let (subject, purpose) = entry.key();
                match SnapshotPayload::capture(entry.value()) {
                    Some(payload) => Some(SnapshotEntry {
                        subject: subject.clone(),
                        purpose: *purpose,
                        payload,
                    }),
                    None => {
                        debug!("Skipping non-portable cache entry {} ({:?})", subject, purpose);
                        None
                    }
                }
            })
            .collect();
        entries.sort_by(|a, b| (&a.subject, a.purpose).cmp(&(&b.subject, b.purpose)));

        let snapshot = CacheSnapshot {
            version: SNAPSHOT_VERSION,
            entries,
        };
        let blob = serde_json::to_vec(&snapshot)
            .map_err(|e| Error::CacheCorrupt(format!("failed to serialize snapshot: {}", e)))?;
        debug!("Exported {} cache entries", snapshot.entries.len());
        Ok(blob)
    }

    /// Load a blob produced by [`export`](Self::export)
    ///
    /// The whole blob is validated before any entry is stored; a corrupt blob
    /// leaves the cache untouched.
    ///
    /// # Returns
    /// The number of entries imported.
    pub fn import(&self, blob: &[u8]) -> Result<usize> {
        let snapshot: CacheSnapshot = serde_json::from_slice(blob)
            .map_err(|e| Error::CacheCorrupt(e.to_string()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(Error::CacheCorrupt(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        for entry in &snapshot.entries {
            if entry.payload.purpose() != entry.purpose {
                return Err(Error::CacheCorrupt(format!(
                    "entry {} is tagged {:?} but holds {:?} data",
                    entry.subject,
                    entry.purpose,
                    entry.payload.purpose()
                )));
            }
        }

        let count = snapshot.entries.len();
        for entry in snapshot.entries {
            self.set(&entry.subject, entry.payload.restore(), entry.purpose);
        }
        debug!("Imported {} cache entries", count);
        Ok(count)
    }
}
