// ============================================
// POI Rule Scorer
// ============================================
//
// Relevance of one candidate place for a zone + vibe list, optionally biased
// toward the caller's location. Base 0.5, additive terms, clamped to [0,1].

use super::geo::{haversine_km, user_proximity_bonus};
use crate::models::{GeoPoint, Poi, Zone};
use crate::utils::clamp01;

/// Types that get a fixed popularity nudge.
const POPULAR_TYPES: [&str; 6] = [
    "tourist_attraction",
    "restaurant",
    "cafe",
    "beach",
    "park",
    "museum",
];

/// Distance reported when the POI carries no coordinates.
const UNKNOWN_DISTANCE_KM: f64 = 999.0;

#[derive(Debug, Clone)]
pub struct PoiRuleScore {
    pub match_score: f64,
    pub distance_km: f64,
    pub user_distance_km: Option<f64>,
    pub reasons: Vec<String>,
}

pub fn score_poi(
    poi: &Poi,
    zone: &Zone,
    vibes: &[String],
    user_location: Option<GeoPoint>,
) -> PoiRuleScore {
    let location = match poi.location {
        Some(loc) => loc,
        None => {
            return PoiRuleScore {
                match_score: 0.0,
                distance_km: UNKNOWN_DISTANCE_KM,
                user_distance_km: None,
                reasons: vec!["missing coordinates".to_string()],
            };
        }
    };

    let mut score = 0.5;
    let mut reasons = Vec::new();

    // 1. Distance from zone center; no contribution beyond 5 km
    let distance_km = haversine_km(zone.center, location);
    score += 0.3 * (1.0 - distance_km / 5.0).max(0.0);
    if distance_km < 1.0 {
        reasons.push("very close to zone center".to_string());
    } else if distance_km < 3.0 {
        reasons.push("close to zone center".to_string());
    }

    // 1b. Proximity to the user, when a location was supplied
    let user_distance_km = user_location.map(|user| haversine_km(user, location));
    if let Some(user_km) = user_distance_km {
        let bonus = user_proximity_bonus(user_km);
        if bonus > 0.0 {
            score += bonus;
            reasons.push(format!("close to you ({:.2}km)", user_km));
        }
    }

    // 2. Vibe match: type token 1.0, name 0.5, zone keyword 0.3 per vibe
    let poi_types: Vec<String> = poi.types.iter().map(|t| t.to_lowercase()).collect();
    let poi_name = poi.name.to_lowercase();
    let zone_keywords: Vec<String> = zone
        .vibe_keywords
        .iter()
        .map(|k| k.to_lowercase())
        .collect();

    if !vibes.is_empty() {
        let mut vibe_matches = 0.0;

        for vibe in vibes {
            let vibe_lower = vibe.to_lowercase();
            if vibe_lower.is_empty() {
                continue;
            }

            if poi_types
                .iter()
                .any(|t| t.contains(&vibe_lower) || vibe_lower.contains(t.as_str()))
            {
                vibe_matches += 1.0;
                reasons.push(format!("matches {}", vibe));
            }

            if poi_name.contains(&vibe_lower) {
                vibe_matches += 0.5;
                if !reasons.contains(&format!("matches {}", vibe)) {
                    reasons.push(format!("{} in name", vibe));
                }
            }

            if zone_keywords
                .iter()
                .any(|kw| poi_name.contains(kw.as_str()) || poi_types.iter().any(|t| t.contains(kw.as_str())))
            {
                vibe_matches += 0.3;
            }
        }

        if vibe_matches > 0.0 {
            score += 0.4 * (vibe_matches / vibes.len() as f64).min(1.0);
        }
    }

    // 3. Rating bonus
    if let Some(rating) = poi.rating {
        if rating >= 4.5 {
            score += 0.15;
            reasons.push("excellent rating".to_string());
        } else if rating >= 4.0 {
            score += 0.10;
            reasons.push("high rating".to_string());
        } else if rating >= 3.5 {
            score += 0.05;
            reasons.push("good rating".to_string());
        }
    }

    // 4. Popular-type nudge
    if poi_types
        .iter()
        .any(|t| POPULAR_TYPES.iter().any(|popular| t.contains(popular)))
    {
        score += 0.05;
    }

    if reasons.is_empty() {
        reasons.push("generic match".to_string());
    }

    PoiRuleScore {
        match_score: clamp01(score),
        distance_km,
        user_distance_km,
        reasons,
    }
}
