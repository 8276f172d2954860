use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use matching_service::jobs::{ProfileSyncJob, ZoneIndexSyncJob};
use matching_service::models::{Event, Zone};
use matching_service::services::{
    EmbeddingClient, EventAggregator, InMemoryProfileStore, InMemoryZoneStore,
};
use matching_service::Config;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    let mode = std::env::args().nth(1).unwrap_or_else(|| "profile-sync".to_string());

    info!(
        service = %config.service.service_name,
        %mode,
        "starting job runner"
    );

    let index = Arc::new(EmbeddingClient::new(&config.embedding));

    match mode.as_str() {
        "profile-sync" => {
            let raw = std::fs::read_to_string(&config.sync.events_path)
                .with_context(|| format!("reading events from {}", config.sync.events_path))?;
            let events: Vec<Event> =
                serde_json::from_str(&raw).context("parsing events file")?;

            // Keep only the trailing sync window
            let now = Utc::now();
            let cutoff = now - Duration::days(config.sync.window_days);
            let window: Vec<Event> = events
                .into_iter()
                .filter(|event| event.timestamp >= cutoff)
                .collect();

            let job = ProfileSyncJob::new(
                EventAggregator::new(config.aggregator.clone()),
                index,
                Arc::new(InMemoryProfileStore::new()),
                &config.sync,
            );

            let report = job.run(&window, now).await;
            info!(
                events = report.events,
                users = report.users,
                synced = report.synced,
                skipped = report.skipped,
                failed = report.failed,
                duration_ms = report.duration_ms,
                "profile sync finished"
            );
            for error in &report.errors {
                warn!(%error, "sync error");
            }
            if report.aborted {
                bail!("profile sync aborted after {} failures", report.failed);
            }
        }
        "zone-sync" => {
            let raw = std::fs::read_to_string(&config.sync.zones_path)
                .with_context(|| format!("reading zones from {}", config.sync.zones_path))?;
            let zones: Vec<Zone> = serde_json::from_str(&raw).context("parsing zones file")?;

            let job = ZoneIndexSyncJob::new(Arc::new(InMemoryZoneStore::with_zones(zones)), index);
            let report = job.run().await?;
            info!(
                zones = report.zones,
                added = report.added,
                removed = report.removed,
                total = report.total,
                "zone sync finished"
            );
        }
        other => bail!("unknown mode: {} (expected profile-sync or zone-sync)", other),
    }

    Ok(())
}
