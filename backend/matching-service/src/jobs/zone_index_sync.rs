// ============================================
// Zone Index Sync Job
// ============================================
//
// Pushes the active zone catalog into the semantic index as `type: "zone"`
// records. Zones carry no precomputed vector; the service embeds the text
// server-side. Run after catalog edits so the matcher's embedding path sees
// fresh data.

use crate::services::embedding::{SemanticIndex, UpsertItem};
use crate::services::storage::ZoneStore;
use crate::models::Zone;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Embedding text length cap; longer zone blurbs are truncated.
const MAX_TEXT_LEN: usize = 500;

#[derive(Debug, Error)]
pub enum ZoneSyncError {
    #[error("zone store error: {0}")]
    Store(String),

    #[error("index upsert failed: {0}")]
    Index(String),
}

#[derive(Debug, Clone, Copy)]
pub struct ZoneSyncReport {
    pub zones: usize,
    pub added: u32,
    pub removed: u32,
    pub total: u32,
}

pub struct ZoneIndexSyncJob {
    zones: Arc<dyn ZoneStore>,
    index: Arc<dyn SemanticIndex>,
}

impl ZoneIndexSyncJob {
    pub fn new(zones: Arc<dyn ZoneStore>, index: Arc<dyn SemanticIndex>) -> Self {
        Self { zones, index }
    }

    pub async fn run(&self) -> Result<ZoneSyncReport, ZoneSyncError> {
        let zones = self
            .zones
            .find_active(None)
            .await
            .map_err(|e| ZoneSyncError::Store(e.to_string()))?;

        info!(zones = zones.len(), "syncing zones to semantic index");

        if zones.is_empty() {
            return Ok(ZoneSyncReport {
                zones: 0,
                added: 0,
                removed: 0,
                total: 0,
            });
        }

        let items: Vec<UpsertItem> = zones.iter().map(zone_item).collect();

        let stats = self
            .index
            .upsert(&items)
            .await
            .map_err(|e| ZoneSyncError::Index(e.to_string()))?;

        info!(
            added = stats.added,
            removed = stats.removed,
            total = stats.total,
            "zone index sync complete"
        );

        Ok(ZoneSyncReport {
            zones: zones.len(),
            added: stats.added,
            removed: stats.removed,
            total: stats.total,
        })
    }
}

fn zone_item(zone: &Zone) -> UpsertItem {
    let parts: Vec<String> = [
        zone.name.clone(),
        zone.desc.clone(),
        zone.tags.join(", "),
        zone.vibe_keywords.join(", "),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect();

    let full_text = parts.join(" - ");
    let text = if full_text.chars().count() > MAX_TEXT_LEN {
        let truncated: String = full_text.chars().take(MAX_TEXT_LEN).collect();
        format!("{}...", truncated)
    } else {
        full_text
    };

    UpsertItem {
        id: zone.id.clone(),
        item_type: "zone".to_string(),
        text,
        vector: None,
        payload: json!({
            "name": zone.name,
            "province": zone.province,
            "tags": zone.tags,
            "rating": zone.rating.unwrap_or(0.0),
        }),
    }
}
