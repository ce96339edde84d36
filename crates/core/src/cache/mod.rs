//! Runtime metadata cache
//!
//! Process-wide store keyed by `(subject, purpose)` so metadata discovery is
//! paid once per concrete type. Entries are created lazily on first miss,
//! live for the lifetime of the cache and are never evicted.
//!
//! # Concurrency
//!
//! Writers follow read-then-write-if-absent. Two threads missing the same key
//! both derive the payload from the same static metadata; the later insert
//! simply replaces an identical value, so no lock beyond the map's own
//! single-key insert is needed.
//!
//! Payloads are derived under one [`CoreConfig`](crate::config::CoreConfig);
//! marshals with different configs should not share a cache.
//!
//! # Persistence
//!
//! [`RuntimeCache::export`] and [`RuntimeCache::import`] move a snapshot in and
//! out as an opaque blob. A cold cache is always valid; a warm one only saves
//! first-access cost.

mod snapshot;

use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::entity::EntitySettings;
use crate::schema::PropertyDefinitionCollection;
use crate::value::Value;

/// Process-wide default cache
static GLOBAL_CACHE: LazyLock<Arc<RuntimeCache>> = LazyLock::new(|| Arc::new(RuntimeCache::new()));

/// Independent facts cached about one subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    /// The type's [`PropertyDefinitionCollection`]
    Definitions,
    /// The type's marshaled default values
    Defaults,
    /// The type's resolved [`EntitySettings`]
    Settings,
}

/// Cached payload
#[derive(Debug, Clone)]
pub enum CachePayload {
    Definitions(Arc<PropertyDefinitionCollection>),
    Defaults(Arc<IndexMap<String, Value>>),
    Settings(Arc<EntitySettings>),
}

impl CachePayload {
    /// Purpose this payload belongs under
    pub fn purpose(&self) -> Purpose {
        match self {
            CachePayload::Definitions(_) => Purpose::Definitions,
            CachePayload::Defaults(_) => Purpose::Defaults,
            CachePayload::Settings(_) => Purpose::Settings,
        }
    }
}

/// Cache of per-type metadata
#[derive(Debug, Default)]
pub struct RuntimeCache {
    entries: DashMap<(String, Purpose), CachePayload>,
}

impl RuntimeCache {
    /// Create an isolated cache
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default instance
    pub fn global() -> Arc<RuntimeCache> {
        Arc::clone(&GLOBAL_CACHE)
    }

    pub fn has(&self, subject: &str, purpose: Purpose) -> bool {
        self.entries.contains_key(&(subject.to_string(), purpose))
    }

    /// Look up an entry; a miss is `None`, not an error
    pub fn get(&self, subject: &str, purpose: Purpose) -> Option<CachePayload> {
        let hit = self
            .entries
            .get(&(subject.to_string(), purpose))
            .map(|entry| entry.value().clone());
        match &hit {
            Some(_) => trace!("Cache hit for {} ({:?})", subject, purpose),
            None => trace!("Cache miss for {} ({:?})", subject, purpose),
        }
        hit
    }

    /// Store an entry, replacing any previous payload for the key
    pub fn set(&self, subject: &str, payload: CachePayload, purpose: Purpose) {
        debug_assert_eq!(payload.purpose(), purpose, "payload stored under wrong purpose");
        self.entries.insert((subject.to_string(), purpose), payload);
    }

    /// Cached definitions for a type
    pub fn definitions(&self, subject: &str) -> Option<Arc<PropertyDefinitionCollection>> {
        match self.get(subject, Purpose::Definitions)? {
            CachePayload::Definitions(defs) => Some(defs),
            _ => None,
        }
    }

    /// Cached marshaled defaults for a type
    pub fn defaults(&self, subject: &str) -> Option<Arc<IndexMap<String, Value>>> {
        match self.get(subject, Purpose::Defaults)? {
            CachePayload::Defaults(defaults) => Some(defaults),
            _ => None,
        }
    }

    /// Cached resolved settings for a type
    pub fn settings(&self, subject: &str) -> Option<Arc<EntitySettings>> {
        match self.get(subject, Purpose::Settings)? {
            CachePayload::Settings(settings) => Some(settings),
            _ => None,
        }
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    ///
    /// Nothing in the core calls this; it exists for tools and tests that
    /// want a cold start.
    pub fn clear(&self) {
        self.entries.clear();
        debug!("Runtime cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_then_hit() {
        let cache = RuntimeCache::new();
        assert!(!cache.has("Person", Purpose::Definitions));
        assert!(cache.get("Person", Purpose::Definitions).is_none());

        let defs = Arc::new(PropertyDefinitionCollection::from_pairs([("name", "string")]));
        cache.set(
            "Person",
            CachePayload::Definitions(Arc::clone(&defs)),
            Purpose::Definitions,
        );

        assert!(cache.has("Person", Purpose::Definitions));
        assert!(!cache.has("Person", Purpose::Defaults));
        assert!(Arc::ptr_eq(&cache.definitions("Person").unwrap(), &defs));
        assert!(cache.defaults("Person").is_none());
    }

    #[test]
    fn test_purposes_are_segregated() {
        let cache = RuntimeCache::new();
        cache.set(
            "T",
            CachePayload::Definitions(Arc::new(PropertyDefinitionCollection::new())),
            Purpose::Definitions,
        );
        cache.set(
            "T",
            CachePayload::Defaults(Arc::new(IndexMap::new())),
            Purpose::Defaults,
        );
        assert_eq!(cache.len(), 2);
        assert!(cache.definitions("T").is_some());
        assert!(cache.defaults("T").is_some());
    }

    #[test]
    fn test_clear() {
        let cache = RuntimeCache::new();
        cache.set(
            "T",
            CachePayload::Defaults(Arc::new(IndexMap::new())),
            Purpose::Defaults,
        );
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_global_is_shared() {
        assert!(Arc::ptr_eq(&RuntimeCache::global(), &RuntimeCache::global()));
    }
}
