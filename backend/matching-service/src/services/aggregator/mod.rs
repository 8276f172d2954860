// ============================================
// Event Aggregator
// ============================================
//
// Turns a window of raw behavioral events into per-user weighted-interest
// profiles:
// 1. Per-event weight: base table * exponential time decay * engagement boosts
// 2. Weight accumulation into sanitized vibe/province maps
// 3. Post-pass: confidence, coarse travel style, text summary for embedding
//
// Profiles are rebuilt wholesale each run; per-user accumulators are local,
// so users may be processed in any order.

use crate::config::AggregatorConfig;
use crate::models::{Event, TravelStyle, UserBehaviorProfile, WeightedSignal};
use crate::utils::sanitize_key;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::{debug, info};

/// Base weight per event type; unknown types fall back to `DEFAULT_WEIGHT`.
static EVENT_WEIGHTS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    HashMap::from([
        // Conversion actions
        ("tour_booking_complete", 5.0),
        ("itinerary_optimize", 3.0),
        // Medium engagement
        ("tour_bookmark", 2.5),
        ("zone_bookmark", 2.0),
        ("blog_read_complete", 1.5),
        // Browsing
        ("tour_click", 0.8),
        ("tour_view", 0.5),
        ("blog_view", 0.3),
        ("zone_view", 0.3),
    ])
});

const DEFAULT_WEIGHT: f64 = 0.5;

/// Vietnamese display labels mapped onto the catalog's English tag set.
static VIBE_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Văn hóa", "culture"),
        ("Lịch sử", "history"),
        ("Mạo hiểm", "adventure"),
        ("Khám phá", "adventure"),
        ("Thiên nhiên", "nature"),
        ("Tự nhiên", "nature"),
        ("Ẩm thực", "food"),
        ("Biển", "beach"),
        ("Bãi biển", "beach"),
        ("Núi", "mountain"),
        ("Thư giãn", "relaxation"),
        ("Nghỉ dưỡng", "relaxation"),
        ("Tâm linh", "temple"),
        ("Chùa", "temple"),
        ("Nhiếp ảnh", "photo"),
        ("Chụp ảnh", "photo"),
        ("Mua sắm", "shopping"),
        ("Chợ", "market"),
        ("Bản địa", "local"),
        ("Cảnh đẹp", "view"),
        ("Hoàng hôn", "sunset"),
        ("Kiến trúc", "architecture"),
        ("Nightlife", "nightlife"),
        ("Hang động", "cave"),
    ])
});

/// Vibe-key substrings that signal each travel style, checked in priority
/// order (first style with the strictly highest count wins).
const STYLE_KEYWORDS: [(TravelStyle, &[&str]); 4] = [
    (
        TravelStyle::Adventurer,
        &["adventure", "hiking", "outdoor", "mountain", "trekking"],
    ),
    (
        TravelStyle::Relaxer,
        &["beach", "relaxation", "spa", "resort", "chill"],
    ),
    (
        TravelStyle::Culture,
        &["history", "museum", "culture", "temple", "architecture"],
    ),
    (
        TravelStyle::Foodie,
        &["food", "local", "cuisine", "street food", "restaurant"],
    ),
];

/// Aggregate report over one run's profiles, for job logging.
#[derive(Debug, Clone)]
pub struct SummaryStats {
    pub total_users: usize,
    pub total_events: u32,
    pub avg_events_per_user: f64,
    pub avg_confidence: f64,
    pub top_vibes: Vec<(String, f64)>,
    pub travel_style_distribution: HashMap<&'static str, u32>,
}

pub struct EventAggregator {
    config: AggregatorConfig,
}

impl EventAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    /// Build one profile per user from the window's events.
    pub fn aggregate(
        &self,
        events: &[Event],
        now: DateTime<Utc>,
    ) -> HashMap<String, UserBehaviorProfile> {
        info!(events = events.len(), "aggregating events");

        let mut profiles: HashMap<String, UserBehaviorProfile> = HashMap::new();

        for event in events {
            if !is_valid_user_id(&event.user_id) {
                continue;
            }

            let profile = profiles
                .entry(event.user_id.clone())
                .or_insert_with(|| empty_profile(&event.user_id));

            let weight = self.event_weight(event, now);

            for vibe in &event.vibes {
                if let Some(key) = map_vibe(vibe) {
                    accumulate(&mut profile.vibe_weights, &key, weight, now);
                }
            }

            for province in &event.provinces {
                if let Some(key) = sanitize_key(province) {
                    accumulate(&mut profile.province_weights, &key, weight, now);
                }
            }

            if let Some(phrase) = interaction_phrase(event) {
                profile.interaction_texts.push(phrase);
            }

            profile.total_events += 1;
            profile.total_weight += weight;
            if let Some(key) = sanitize_key(&event.event_type) {
                *profile.event_counts.entry(key).or_insert(0) += 1;
            }

            match profile.first_event_at {
                Some(first) if event.timestamp >= first => {}
                _ => profile.first_event_at = Some(event.timestamp),
            }
            match profile.last_event_at {
                Some(last) if event.timestamp <= last => {}
                _ => profile.last_event_at = Some(event.timestamp),
            }
        }

        for profile in profiles.values_mut() {
            profile.confidence = confidence(profile.total_weight);
            profile.travel_style = detect_travel_style(profile);
        }

        info!(users = profiles.len(), "aggregation complete");

        profiles
    }

    /// Weighted contribution of a single event.
    fn event_weight(&self, event: &Event, now: DateTime<Utc>) -> f64 {
        let base = EVENT_WEIGHTS
            .get(event.event_type.as_str())
            .copied()
            .unwrap_or(DEFAULT_WEIGHT);

        // Continuous exponential decay with time-constant `decay_days`.
        // Config docs call this a half-life; the as-built curve is e^(-t/τ)
        // with no ln2 factor, and downstream tuning assumes that curve.
        let days_since = (now - event.timestamp).num_milliseconds() as f64 / 86_400_000.0;
        let decay = (-days_since / self.config.decay_days).exp();
        let mut weight = base * decay;

        if let Some(duration_ms) = event.duration_ms {
            if duration_ms > 30_000.0 {
                let boost = (duration_ms / 60_000.0).min(3.0);
                weight *= 1.0 + boost * 0.1;
            }
        }

        if let Some(price) = event.total_price {
            if price > 0.0 {
                let boost = (price / 1_000_000.0).min(2.0);
                weight *= 1.0 + boost * 0.2;
            }
        }

        weight
    }

    /// Compact weighted text handed to the embedding service; the user has no
    /// other representation there.
    pub fn build_weighted_text(&self, profile: &UserBehaviorProfile) -> String {
        let mut vibes: Vec<(&String, f64)> = profile
            .vibe_weights
            .iter()
            .map(|(k, s)| (k, s.weight))
            .collect();
        vibes.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        vibes.truncate(10);

        if vibes.is_empty() {
            if !profile.interaction_texts.is_empty() {
                let fallback: Vec<&str> = profile
                    .interaction_texts
                    .iter()
                    .take(20)
                    .map(|s| s.as_str())
                    .collect();
                debug!(user_id = %profile.user_id, "no vibes, using interaction fallback");
                return fallback.join(" ");
            }
            return String::new();
        }

        // Min-max rescale weights into 1..=5 repetitions
        let min = vibes.iter().map(|(_, w)| *w).fold(f64::INFINITY, f64::min);
        let max = vibes
            .iter()
            .map(|(_, w)| *w)
            .fold(f64::NEG_INFINITY, f64::max);
        let range = if (max - min).abs() < f64::EPSILON {
            1.0
        } else {
            max - min
        };

        let vibe_text = vibes
            .iter()
            .map(|(vibe, weight)| {
                let repeats = (((weight - min) / range) * 4.0 + 1.0).ceil() as usize;
                vec![vibe.as_str(); repeats].join(" ")
            })
            .collect::<Vec<_>>()
            .join(" ");

        let interaction_sample = profile
            .interaction_texts
            .iter()
            .take(5)
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let mut provinces: Vec<(&String, f64)> = profile
            .province_weights
            .iter()
            .map(|(k, s)| (k, s.weight))
            .collect();
        provinces.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(b.0))
        });
        let province_text = provinces
            .iter()
            .take(3)
            .map(|(p, _)| p.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        format!("{} {} {}", vibe_text, interaction_sample, province_text)
            .trim()
            .to_string()
    }

    /// Aggregate report over one run's profiles.
    pub fn summary_stats(&self, profiles: &HashMap<String, UserBehaviorProfile>) -> SummaryStats {
        let total_users = profiles.len();
        let total_events: u32 = profiles.values().map(|p| p.total_events).sum();

        let mut global_vibes: HashMap<String, f64> = HashMap::new();
        let mut style_distribution: HashMap<&'static str, u32> = HashMap::new();
        let mut confidence_sum = 0.0;

        for profile in profiles.values() {
            for (vibe, signal) in &profile.vibe_weights {
                *global_vibes.entry(vibe.clone()).or_insert(0.0) += signal.weight;
            }
            *style_distribution
                .entry(profile.travel_style.as_str())
                .or_insert(0) += 1;
            confidence_sum += profile.confidence;
        }

        let mut top_vibes: Vec<(String, f64)> = global_vibes.into_iter().collect();
        top_vibes.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        top_vibes.truncate(10);

        SummaryStats {
            total_users,
            total_events,
            avg_events_per_user: if total_users > 0 {
                total_events as f64 / total_users as f64
            } else {
                0.0
            },
            avg_confidence: if total_users > 0 {
                confidence_sum / total_users as f64
            } else {
                0.0
            },
            top_vibes,
            travel_style_distribution: style_distribution,
        }
    }
}

fn is_valid_user_id(user_id: &str) -> bool {
    !user_id.is_empty() && user_id != "anonymous" && user_id != "null"
}

fn empty_profile(user_id: &str) -> UserBehaviorProfile {
    UserBehaviorProfile {
        user_id: user_id.to_string(),
        vibe_weights: HashMap::new(),
        province_weights: HashMap::new(),
        event_counts: HashMap::new(),
        total_events: 0,
        total_weight: 0.0,
        confidence: 0.0,
        travel_style: TravelStyle::Explorer,
        interaction_texts: Vec::new(),
        first_event_at: None,
        last_event_at: None,
    }
}

/// Map a raw vibe label to a sanitized accumulator key, or drop it.
fn map_vibe(raw: &str) -> Option<String> {
    if raw.starts_with('$') {
        return None;
    }
    let mapped = VIBE_ALIASES
        .get(raw)
        .map(|alias| alias.to_string())
        .unwrap_or_else(|| raw.to_lowercase());
    sanitize_key(&mapped)
}

fn accumulate(
    weights: &mut HashMap<String, WeightedSignal>,
    key: &str,
    weight: f64,
    now: DateTime<Utc>,
) {
    let signal = weights.entry(key.to_string()).or_insert(WeightedSignal {
        weight: 0.0,
        interactions: 0,
        last_updated: now,
    });
    signal.weight += weight;
    signal.interactions += 1;
    signal.last_updated = now;
}

/// Short human-readable phrase for the profile's text summary.
fn interaction_phrase(event: &Event) -> Option<String> {
    let props = &event.properties;
    match event.event_type.as_str() {
        "tour_view" => props.get("tourName").map(|name| format!("xem tour {}", name)),
        "tour_bookmark" => props.get("tourName").map(|name| format!("lưu tour {}", name)),
        "tour_booking_complete" => {
            props.get("tourName").map(|name| format!("đặt tour {}", name))
        }
        "blog_view" => props.get("title").map(|title| format!("đọc blog {}", title)),
        _ => None,
    }
}

/// 20 accumulated weight units saturate confidence at 1.0.
fn confidence(total_weight: f64) -> f64 {
    (total_weight / 20.0).min(1.0)
}

fn detect_travel_style(profile: &UserBehaviorProfile) -> TravelStyle {
    if profile.vibe_weights.is_empty() {
        return TravelStyle::Explorer;
    }

    let mut best = TravelStyle::Explorer;
    let mut best_count = 0;

    for (style, keywords) in STYLE_KEYWORDS {
        let count = profile
            .vibe_weights
            .keys()
            .filter(|vibe| {
                let lower = vibe.to_lowercase();
                keywords.iter().any(|kw| lower.contains(kw))
            })
            .count();
        // Strict comparison keeps the earlier style on ties
        if count > best_count {
            best_count = count;
            best = style;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn aggregator() -> EventAggregator {
        EventAggregator::new(AggregatorConfig { decay_days: 30.0 })
    }

    fn event(user: &str, event_type: &str, days_ago: i64, now: DateTime<Utc>) -> Event {
        Event {
            event_type: event_type.to_string(),
            user_id: user.to_string(),
            timestamp: now - Duration::days(days_ago),
            vibes: vec!["Biển".to_string()],
            provinces: vec!["Đà Nẵng".to_string()],
            duration_ms: None,
            total_price: None,
            properties: HashMap::new(),
        }
    }

    #[test]
    fn test_booking_plus_stale_view_weights() {
        // One booking today plus one view 60 days old:
        // 5.0 * e^0 + 0.5 * e^-2 ≈ 5.068
        let now = Utc::now();
        let events = vec![
            event("u1", "tour_booking_complete", 0, now),
            event("u1", "tour_view", 60, now),
        ];

        let profiles = aggregator().aggregate(&events, now);
        let profile = &profiles["u1"];

        let expected = 5.0 + 0.5 * (-2.0_f64).exp();
        assert!((profile.total_weight - expected).abs() < 1e-6);
        assert!((profile.confidence - expected / 20.0).abs() < 1e-6);
        assert_eq!(profile.total_events, 2);
    }

    #[test]
    fn test_decay_orders_identical_events() {
        let now = Utc::now();
        let fresh = aggregator().aggregate(&[event("u1", "tour_view", 1, now)], now);
        let stale = aggregator().aggregate(&[event("u1", "tour_view", 45, now)], now);

        assert!(fresh["u1"].total_weight > stale["u1"].total_weight);
    }

    #[test]
    fn test_confidence_saturates_at_twenty() {
        assert_eq!(confidence(0.0), 0.0);
        assert_eq!(confidence(20.0), 1.0);
        assert_eq!(confidence(40.0), 1.0);
        assert!(confidence(10.0) < confidence(15.0));
    }

    #[test]
    fn test_skips_anonymous_users() {
        let now = Utc::now();
        let events = vec![
            event("", "tour_view", 0, now),
            event("anonymous", "tour_view", 0, now),
            event("null", "tour_view", 0, now),
            event("u1", "tour_view", 0, now),
        ];

        let profiles = aggregator().aggregate(&events, now);
        assert_eq!(profiles.len(), 1);
        assert!(profiles.contains_key("u1"));
    }

    #[test]
    fn test_duration_and_price_boosts() {
        let now = Utc::now();
        let mut booked = event("u1", "tour_booking_complete", 0, now);
        booked.duration_ms = Some(120_000.0);
        booked.total_price = Some(2_000_000.0);

        let profiles = aggregator().aggregate(&[booked], now);
        // 5.0 * (1 + 2*0.1) * (1 + 2*0.2) = 8.4
        assert!((profiles["u1"].total_weight - 8.4).abs() < 1e-6);
    }

    #[test]
    fn test_vibe_alias_and_sanitization() {
        let now = Utc::now();
        let mut e = event("u1", "tour_view", 0, now);
        e.vibes = vec![
            "Biển".to_string(),
            "$browser".to_string(),
            "Văn hóa".to_string(),
            "Sống ảo".to_string(),
        ];

        let profiles = aggregator().aggregate(&[e], now);
        let vibes = &profiles["u1"].vibe_weights;
        assert!(vibes.contains_key("beach"));
        assert!(vibes.contains_key("culture"));
        assert!(vibes.contains_key("sống ảo"));
        assert!(!vibes.keys().any(|k| k.contains('$')));
    }

    #[test]
    fn test_travel_style_priority_tie_break() {
        let now = Utc::now();
        let mut e = event("u1", "tour_view", 0, now);
        // One adventurer key and one relaxer key: tie broken toward adventurer
        e.vibes = vec!["Mạo hiểm".to_string(), "Bãi biển".to_string()];

        let profiles = aggregator().aggregate(&[e], now);
        assert_eq!(profiles["u1"].travel_style, TravelStyle::Adventurer);
    }

    #[test]
    fn test_travel_style_explorer_when_no_match() {
        let now = Utc::now();
        let mut e = event("u1", "tour_view", 0, now);
        e.vibes = vec!["Hang động".to_string()];

        let profiles = aggregator().aggregate(&[e], now);
        assert_eq!(profiles["u1"].travel_style, TravelStyle::Explorer);
    }

    #[test]
    fn test_weighted_text_repeats_heavy_vibes() {
        let now = Utc::now();
        let mut heavy = event("u1", "tour_booking_complete", 0, now);
        heavy.vibes = vec!["Biển".to_string()];
        let mut light = event("u1", "tour_view", 0, now);
        light.vibes = vec!["Chùa".to_string()];

        let profiles = aggregator().aggregate(&[heavy, light], now);
        let text = aggregator().build_weighted_text(&profiles["u1"]);

        let beach_count = text.split_whitespace().filter(|w| *w == "beach").count();
        let temple_count = text.split_whitespace().filter(|w| *w == "temple").count();
        assert_eq!(beach_count, 5);
        assert_eq!(temple_count, 1);
        assert!(text.contains("Đà_Nẵng") || text.contains("Đà Nẵng"));
    }

    #[test]
    fn test_weighted_text_interaction_fallback() {
        let now = Utc::now();
        let mut e = event("u1", "tour_view", 0, now);
        e.vibes = vec![];
        e.properties
            .insert("tourName".to_string(), "Hội An về đêm".to_string());

        let profiles = aggregator().aggregate(&[e], now);
        let text = aggregator().build_weighted_text(&profiles["u1"]);
        assert_eq!(text, "xem tour Hội An về đêm");
    }

    #[test]
    fn test_weighted_text_empty_profile() {
        let profile = empty_profile("u1");
        assert_eq!(aggregator().build_weighted_text(&profile), "");
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let now = Utc::now();
        let events = vec![
            event("u1", "tour_booking_complete", 2, now),
            event("u1", "tour_view", 10, now),
            event("u2", "tour_bookmark", 5, now),
        ];

        let first = aggregator().aggregate(&events, now);
        let second = aggregator().aggregate(&events, now);

        assert_eq!(first.len(), second.len());
        for (user, profile) in &first {
            let other = &second[user];
            assert!((profile.total_weight - other.total_weight).abs() < 1e-12);
            assert_eq!(profile.total_events, other.total_events);
            assert_eq!(profile.vibe_weights.len(), other.vibe_weights.len());
        }
    }

    #[test]
    fn test_summary_stats() {
        let now = Utc::now();
        let events = vec![
            event("u1", "tour_booking_complete", 0, now),
            event("u2", "tour_view", 0, now),
        ];

        let agg = aggregator();
        let profiles = agg.aggregate(&events, now);
        let stats = agg.summary_stats(&profiles);

        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_events, 2);
        assert!((stats.avg_events_per_user - 1.0).abs() < 1e-9);
        assert_eq!(stats.top_vibes[0].0, "beach");
    }
}
