// ============================================
// Profile Sync Job
// ============================================
//
// Batch pipeline for one sync window:
// 1. Aggregate the window's events into per-user profiles
// 2. Per user, sequentially: weighted text -> embed -> index upsert ->
//    profile store upsert
// 3. Count per-user failures; abort the remaining batch past the threshold
//
// Users are processed sequentially on purpose: an external-service outage
// surfaces as a rising failure count instead of a thundering herd.

use crate::config::SyncConfig;
use crate::models::Event;
use crate::services::aggregator::EventAggregator;
use crate::services::embedding::{SemanticIndex, UpsertItem};
use crate::services::storage::ProfileStore;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Dimension the embedding service is expected to produce.
const EXPECTED_VECTOR_DIM: usize = 1024;

/// Outcome of one sync run. Per-user errors are carried here rather than
/// logged-and-dropped, so the caller decides what to do with them.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub duration_ms: u64,
    pub events: usize,
    pub users: usize,
    pub synced: u32,
    pub skipped: u32,
    pub failed: u32,
    pub errors: Vec<String>,
    pub aborted: bool,
}

pub struct ProfileSyncJob {
    aggregator: EventAggregator,
    index: Arc<dyn SemanticIndex>,
    profiles: Arc<dyn ProfileStore>,
    max_failures: u32,
}

impl ProfileSyncJob {
    pub fn new(
        aggregator: EventAggregator,
        index: Arc<dyn SemanticIndex>,
        profiles: Arc<dyn ProfileStore>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            aggregator,
            index,
            profiles,
            max_failures: config.max_failures,
        }
    }

    pub async fn run(&self, events: &[Event], now: DateTime<Utc>) -> SyncReport {
        let started = Instant::now();
        info!(events = events.len(), "profile sync started");

        let mut report = SyncReport {
            events: events.len(),
            ..Default::default()
        };

        if events.is_empty() {
            info!("no events to process");
            return report;
        }

        let profiles = self.aggregator.aggregate(events, now);
        report.users = profiles.len();

        let stats = self.aggregator.summary_stats(&profiles);
        info!(
            users = stats.total_users,
            avg_events = stats.avg_events_per_user,
            avg_confidence = stats.avg_confidence,
            top_vibes = ?stats.top_vibes.iter().take(5).map(|(v, _)| v.as_str()).collect::<Vec<_>>(),
            "aggregation summary"
        );

        // Deterministic processing order
        let mut user_ids: Vec<&String> = profiles.keys().collect();
        user_ids.sort();

        for user_id in user_ids {
            let profile = &profiles[user_id];

            let weighted_text = self.aggregator.build_weighted_text(profile);
            if weighted_text.trim().is_empty() {
                report.skipped += 1;
                continue;
            }

            match self.sync_user(user_id, profile, &weighted_text, now).await {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    report.failed += 1;
                    let message = format!("user {}: {}", user_id, e);
                    warn!(user_id = %user_id, error = %e, "user sync failed");
                    report.errors.push(message);

                    if report.failed > self.max_failures {
                        warn!(
                            failed = report.failed,
                            "too many failures, aborting remaining batch"
                        );
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            synced = report.synced,
            skipped = report.skipped,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "profile sync complete"
        );

        report
    }

    async fn sync_user(
        &self,
        user_id: &str,
        profile: &crate::models::UserBehaviorProfile,
        weighted_text: &str,
        now: DateTime<Utc>,
    ) -> Result<(), String> {
        let embeddings = self
            .index
            .embed(&[weighted_text.to_string()])
            .await
            .map_err(|e| e.to_string())?;

        let vector = embeddings
            .into_iter()
            .next()
            .ok_or_else(|| "embed returned no vector".to_string())?;
        if vector.len() != EXPECTED_VECTOR_DIM {
            return Err(format!(
                "invalid embedding vector (length {}, expected {})",
                vector.len(),
                EXPECTED_VECTOR_DIM
            ));
        }

        let top_vibes = top_keys(&profile.vibe_weights, 5);
        let top_provinces = top_keys(&profile.province_weights, 3);

        self.index
            .upsert(&[UpsertItem {
                id: user_id.to_string(),
                item_type: "user".to_string(),
                text: weighted_text.to_string(),
                vector: Some(vector),
                payload: json!({
                    "vibes": top_vibes,
                    "provinces": top_provinces,
                    "totalWeight": profile.total_weight,
                    "updatedAt": now.to_rfc3339(),
                }),
            }])
            .await
            .map_err(|e| e.to_string())?;

        self.profiles
            .upsert(profile)
            .await
            .map_err(|e| e.to_string())?;

        Ok(())
    }
}

fn top_keys(
    weights: &std::collections::HashMap<String, crate::models::WeightedSignal>,
    limit: usize,
) -> Vec<String> {
    let mut entries: Vec<(&String, f64)> = weights.iter().map(|(k, s)| (k, s.weight)).collect();
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });
    entries.into_iter().take(limit).map(|(k, _)| k.clone()).collect()
}
