use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Raw behavioral event produced by the upstream analytics export.
/// Immutable; consumed once per aggregation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_type: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub vibes: Vec<String>,
    #[serde(default)]
    pub provinces: Vec<String>,
    /// Dwell time in milliseconds, when the client reported one.
    #[serde(default)]
    pub duration_ms: Option<f64>,
    /// Booking amount in VND, present on conversion events.
    #[serde(default)]
    pub total_price: Option<f64>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// Accumulated weight for one vibe/province key inside a profile.
///
/// `weight` is the raw running sum of per-event contributions; it is only
/// rescaled (to 1-5 repetitions) when the profile is rendered to text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedSignal {
    pub weight: f64,
    pub interactions: u32,
    pub last_updated: DateTime<Utc>,
}

/// Coarse travel-style label derived from a profile's vibe keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelStyle {
    Adventurer,
    Relaxer,
    Culture,
    Foodie,
    Explorer,
}

impl TravelStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelStyle::Adventurer => "adventurer",
            TravelStyle::Relaxer => "relaxer",
            TravelStyle::Culture => "culture",
            TravelStyle::Foodie => "foodie",
            TravelStyle::Explorer => "explorer",
        }
    }
}

/// Weighted-interest profile for one user, rebuilt wholesale on every
/// aggregation run (full replace keyed by `user_id`, not incremental merge).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBehaviorProfile {
    pub user_id: String,
    pub vibe_weights: HashMap<String, WeightedSignal>,
    pub province_weights: HashMap<String, WeightedSignal>,
    pub event_counts: HashMap<String, u32>,
    pub total_events: u32,
    pub total_weight: f64,
    pub confidence: f64,
    pub travel_style: TravelStyle,
    pub interaction_texts: Vec<String>,
    pub first_event_at: Option<DateTime<Utc>>,
    pub last_event_at: Option<DateTime<Utc>>,
}

/// Geographic destination unit owned by the external catalog; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    pub province: String,
    pub center: GeoPoint,
    #[serde(default = "default_radius_m")]
    pub radius_m: f64,
    /// Boundary ring as `[lat, lng]` pairs, when the catalog defines one.
    #[serde(default)]
    pub polygon: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub vibe_keywords: Vec<String>,
    #[serde(default)]
    pub avoid_tags: Vec<String>,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_radius_m() -> f64 {
    1500.0
}

fn default_true() -> bool {
    true
}

/// Candidate place returned by the external place-search provider.
/// Never persisted by this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poi {
    pub id: String,
    pub name: String,
    /// Providers occasionally return places without coordinates.
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

/// Structured preference object produced by the upstream extraction step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preference {
    #[serde(default)]
    pub vibes: Vec<String>,
    #[serde(default)]
    pub avoid: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub raw_text: String,
}

/// Strategy the matcher ended up using for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    Embedding,
    Keyword,
    None,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::Embedding => "embedding",
            MatchStrategy::Keyword => "keyword",
            MatchStrategy::None => "none",
        }
    }
}

/// Zone candidate with its per-query score breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredZone {
    #[serde(flatten)]
    pub zone: Zone,
    pub hard_vibe_score: f64,
    pub embed_score: f64,
    pub proximity_score: Option<f64>,
    pub distance_km: Option<f64>,
    pub final_score: f64,
    pub vibe_matches: Vec<String>,
    pub reasons: Vec<String>,
}

/// Place candidate with its relevance score for one category query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredPoi {
    #[serde(flatten)]
    pub poi: Poi,
    pub match_score: f64,
    pub distance_km: f64,
    pub user_distance_km: Option<f64>,
    pub reasons: Vec<String>,
    pub category: String,
}
