use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub embedding: EmbeddingConfig,
    pub places: PlacesConfig,
    pub aggregator: AggregatorConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    pub base_url: String,
    /// Deadline for embed/search calls.
    pub timeout_secs: u64,
    /// Deadline for bulk upserts.
    pub bulk_timeout_secs: u64,
    /// Deadline for health probes.
    pub health_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    /// TTL for the in-process result cache; 0 disables caching.
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Time constant of the exponential event decay, in days.
    pub decay_days: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Trailing window of events to aggregate, in days.
    pub window_days: i64,
    /// Per-user failures tolerated before the batch aborts.
    pub max_failures: u32,
    /// JSON file holding the window's events (profile-sync mode).
    pub events_path: String,
    /// JSON file holding the zone catalog (zone-sync mode).
    pub zones_path: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Config {
            service: ServiceConfig {
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "matching-service".to_string()),
            },
            embedding: EmbeddingConfig {
                base_url: env::var("EMBED_SERVICE_URL")
                    .unwrap_or_else(|_| "http://localhost:8088".to_string()),
                timeout_secs: env_parse("EMBED_TIMEOUT_SECS", 10),
                bulk_timeout_secs: env_parse("EMBED_BULK_TIMEOUT_SECS", 30),
                health_timeout_secs: env_parse("EMBED_HEALTH_TIMEOUT_SECS", 3),
            },
            places: PlacesConfig {
                base_url: env::var("PLACE_SERVICE_URL")
                    .unwrap_or_else(|_| "https://api.map4d.vn/sdk".to_string()),
                api_key: env::var("PLACE_API_KEY").unwrap_or_default(),
                timeout_secs: env_parse("PLACE_TIMEOUT_SECS", 10),
                cache_ttl_secs: env_parse("PLACE_CACHE_TTL_SECS", 1800),
            },
            aggregator: AggregatorConfig {
                decay_days: env_parse("TIME_DECAY_DAYS", 30.0),
            },
            sync: SyncConfig {
                window_days: env_parse("SYNC_WINDOW_DAYS", 7),
                max_failures: env_parse("SYNC_MAX_FAILURES", 10),
                events_path: env::var("EVENTS_FILE").unwrap_or_else(|_| "events.json".to_string()),
                zones_path: env::var("ZONES_FILE").unwrap_or_else(|_| "zones.json".to_string()),
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
