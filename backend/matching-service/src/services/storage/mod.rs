// ============================================
// Storage seams
// ============================================
//
// Zones and user profiles live in an external document store; this service
// only sees them through these traits. Writes are idempotent full-document
// upserts keyed by a stable identifier, so concurrent re-runs of a sync job
// converge to the same final state (last-writer-wins).
//
// The in-memory implementations back unit tests and the standalone job
// runner; production wiring plugs the real store in behind the same traits.

use crate::models::{UserBehaviorProfile, Zone};
use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read-only access to the zone catalog.
#[async_trait]
pub trait ZoneStore: Send + Sync {
    /// Fetch one active zone by its stable id.
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Zone>>;

    /// Fetch the active zones among `ids`, in the order the ids were given.
    async fn find_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Zone>>;

    /// All active zones, optionally restricted to one province.
    async fn find_active(&self, province: Option<&str>) -> StoreResult<Vec<Zone>>;
}

/// Read/write access to persisted user behavior profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Full-document replace keyed by `profile.user_id`.
    async fn upsert(&self, profile: &UserBehaviorProfile) -> StoreResult<()>;

    async fn find_by_user(&self, user_id: &str) -> StoreResult<Option<UserBehaviorProfile>>;
}

/// In-memory zone catalog.
#[derive(Default)]
pub struct InMemoryZoneStore {
    zones: DashMap<String, Zone>,
}

impl InMemoryZoneStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zones(zones: Vec<Zone>) -> Self {
        let store = Self::new();
        for zone in zones {
            store.zones.insert(zone.id.clone(), zone);
        }
        store
    }

    pub fn insert(&self, zone: Zone) {
        self.zones.insert(zone.id.clone(), zone);
    }
}

#[async_trait]
impl ZoneStore for InMemoryZoneStore {
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Zone>> {
        Ok(self
            .zones
            .get(id)
            .map(|entry| entry.value().clone())
            .filter(|zone| zone.is_active))
    }

    async fn find_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Zone>> {
        let mut found = Vec::new();
        for id in ids {
            if let Some(zone) = self.find_by_id(id).await? {
                found.push(zone);
            }
        }
        Ok(found)
    }

    async fn find_active(&self, province: Option<&str>) -> StoreResult<Vec<Zone>> {
        let mut zones: Vec<Zone> = self
            .zones
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|zone| zone.is_active)
            .filter(|zone| province.map_or(true, |p| zone.province == p))
            .collect();
        // DashMap iteration order is arbitrary; keep results stable.
        zones.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(zones)
    }
}

/// In-memory profile store.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: DashMap<String, UserBehaviorProfile>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn upsert(&self, profile: &UserBehaviorProfile) -> StoreResult<()> {
        self.profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }

    async fn find_by_user(&self, user_id: &str) -> StoreResult<Option<UserBehaviorProfile>> {
        Ok(self.profiles.get(user_id).map(|entry| entry.value().clone()))
    }
}
