// ============================================
// POI Finder
// ============================================
//
// Retrieves and ranks candidate places for one zone + category:
// 1. Fan out the category's text queries against the place-search provider
// 2. Merge + dedup by place id (first occurrence wins)
// 3. Filter to the zone boundary
// 4. Score with the POI rule scorer, sort, truncate
//
// A per-query provider failure degrades to an empty result set for that
// query; only a missing zone is surfaced to the caller.

pub mod categories;

use super::places::{PlaceQuery, PlaceSearchProvider};
use super::scoring::score_poi;
use super::storage::{StoreError, ZoneStore};
use crate::models::{GeoPoint, Poi, ScoredPoi, Zone};
use categories::{category_by_key, category_by_vibes, priority_categories, PoiCategory};
use futures::future::join_all;
use resilience::Limiter;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Simultaneous category loads per zone.
const CATEGORY_CONCURRENCY: usize = 3;

#[derive(Debug, Error)]
pub enum PoiFinderError {
    #[error("zone not found: {0}")]
    ZoneNotFound(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type PoiFinderResult<T> = std::result::Result<T, PoiFinderError>;

#[derive(Debug, Clone, Default)]
pub struct PoiFinderOptions {
    pub limit: usize,
    pub user_location: Option<GeoPoint>,
}

impl PoiFinderOptions {
    fn limit_or_default(&self) -> usize {
        if self.limit == 0 {
            20
        } else {
            self.limit
        }
    }
}

pub struct PoiFinder {
    zones: Arc<dyn ZoneStore>,
    places: Arc<dyn PlaceSearchProvider>,
    limiter: Limiter,
}

impl PoiFinder {
    pub fn new(zones: Arc<dyn ZoneStore>, places: Arc<dyn PlaceSearchProvider>) -> Self {
        Self {
            zones,
            places,
            limiter: Limiter::new(CATEGORY_CONCURRENCY),
        }
    }

    /// Ranked POIs for one zone + category.
    pub async fn find_pois_by_category(
        &self,
        zone_id: &str,
        category_key: &str,
        options: &PoiFinderOptions,
    ) -> PoiFinderResult<Vec<ScoredPoi>> {
        let category = category_by_key(category_key)
            .ok_or_else(|| PoiFinderError::UnknownCategory(category_key.to_string()))?;

        let zone = self
            .zones
            .find_by_id(zone_id)
            .await?
            .ok_or_else(|| PoiFinderError::ZoneNotFound(zone_id.to_string()))?;

        let limit = options.limit_or_default();

        debug!(
            zone = %zone.name,
            category = category.key,
            limit,
            "finding POIs"
        );

        let candidates = self.collect_candidates(&zone, category, limit).await;
        let in_bounds: Vec<Poi> = candidates
            .into_iter()
            .filter(|poi| zone_contains(&zone, poi))
            .collect();

        let vibes: Vec<String> = category.vibes.iter().map(|v| v.to_string()).collect();
        let mut scored: Vec<ScoredPoi> = in_bounds
            .into_iter()
            .map(|poi| {
                let score = score_poi(&poi, &zone, &vibes, options.user_location);
                ScoredPoi {
                    poi,
                    match_score: score.match_score,
                    distance_km: score.distance_km,
                    user_distance_km: score.user_distance_km,
                    reasons: score.reasons,
                    category: category.key.to_string(),
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.match_score
                .partial_cmp(&a.match_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        info!(
            zone = %zone.name,
            category = category.key,
            results = scored.len(),
            "POI search complete"
        );

        Ok(scored)
    }

    /// Ranked POIs for a zone driven by a vibe list instead of an explicit
    /// category key: the category with the largest vibe overlap is searched
    /// (`views` when nothing overlaps).
    pub async fn find_pois_by_vibes(
        &self,
        zone_id: &str,
        vibes: &[String],
        options: &PoiFinderOptions,
    ) -> PoiFinderResult<Vec<ScoredPoi>> {
        let category = category_by_vibes(vibes);
        debug!(zone_id, category = category.key, "vibe-driven POI search");
        self.find_pois_by_category(zone_id, category.key, options)
            .await
    }

    /// All priority (non-lazy) categories for a zone, fetched concurrently
    /// under the category limiter. A failed category degrades to an empty
    /// list rather than aborting the rest.
    pub async fn load_priority_categories(
        &self,
        zone_id: &str,
        options: &PoiFinderOptions,
    ) -> PoiFinderResult<HashMap<String, Vec<ScoredPoi>>> {
        // Surface a missing zone before fanning out
        self.zones
            .find_by_id(zone_id)
            .await?
            .ok_or_else(|| PoiFinderError::ZoneNotFound(zone_id.to_string()))?;

        let tasks = priority_categories().into_iter().map(|category| {
            let limiter = self.limiter.clone();
            async move {
                let result = limiter
                    .run(self.find_pois_by_category(zone_id, category.key, options))
                    .await;
                match result {
                    Ok(pois) => (category.key.to_string(), pois),
                    Err(e) => {
                        warn!(category = category.key, error = %e, "category load failed");
                        (category.key.to_string(), Vec::new())
                    }
                }
            }
        });

        Ok(join_all(tasks).await.into_iter().collect())
    }

    /// Issue every category query and merge, deduplicating by place id.
    async fn collect_candidates(
        &self,
        zone: &Zone,
        category: &PoiCategory,
        limit: usize,
    ) -> Vec<Poi> {
        let per_query = (2 * limit + category.queries.len() - 1) / category.queries.len();

        let mut merged: Vec<Poi> = Vec::new();
        for query_text in category.queries {
            let query = PlaceQuery {
                center: zone.center,
                radius_m: zone.radius_m,
                text: query_text.to_string(),
                types: String::new(),
                limit: per_query,
            };

            let batch = match self.places.search(&query).await {
                Ok(pois) => pois,
                Err(e) => {
                    warn!(query = query_text, error = %e, "place query failed");
                    Vec::new()
                }
            };

            for poi in batch {
                if !merged.iter().any(|existing| existing.id == poi.id) {
                    merged.push(poi);
                }
            }
        }

        merged
    }
}

/// Zone boundary test. A polygon is approximated by its bounding box, which
/// admits points near the corners; callers depend on the wider acceptance.
/// Without a polygon the center+radius circle applies; with neither, every
/// candidate passes.
fn zone_contains(zone: &Zone, poi: &Poi) -> bool {
    let location = match poi.location {
        Some(loc) => loc,
        None => return false,
    };

    if let Some(polygon) = zone.polygon.as_ref().filter(|ring| ring.len() >= 3) {
        let mut min_lat = f64::INFINITY;
        let mut max_lat = f64::NEG_INFINITY;
        let mut min_lng = f64::INFINITY;
        let mut max_lng = f64::NEG_INFINITY;
        for [lat, lng] in polygon {
            min_lat = min_lat.min(*lat);
            max_lat = max_lat.max(*lat);
            min_lng = min_lng.min(*lng);
            max_lng = max_lng.max(*lng);
        }
        return location.lat >= min_lat
            && location.lat <= max_lat
            && location.lng >= min_lng
            && location.lng <= max_lng;
    }

    if zone.radius_m > 0.0 {
        let distance_km = super::scoring::haversine_km(zone.center, location);
        return distance_km * 1000.0 <= zone.radius_m;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::places::PlaceResult;
    use crate::services::storage::InMemoryZoneStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn zone(id: &str) -> Zone {
        Zone {
            id: id.to_string(),
            name: "Sơn Trà".to_string(),
            province: "Đà Nẵng".to_string(),
            center: GeoPoint { lat: 16.10, lng: 108.26 },
            radius_m: 3000.0,
            polygon: None,
            tags: vec!["beach".to_string()],
            vibe_keywords: vec!["biển".to_string()],
            avoid_tags: vec![],
            desc: String::new(),
            rating: None,
            is_active: true,
        }
    }

    fn poi(id: &str, lat: f64, lng: f64) -> Poi {
        Poi {
            id: id.to_string(),
            name: format!("POI {}", id),
            location: Some(GeoPoint { lat, lng }),
            types: vec!["restaurant".to_string()],
            rating: Some(4.0),
        }
    }

    /// Provider stub returning a fixed page per call, counting queries.
    struct StubProvider {
        pages: Vec<Vec<Poi>>,
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl PlaceSearchProvider for StubProvider {
        async fn search(&self, _query: &PlaceQuery) -> PlaceResult<Vec<Poi>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(crate::services::places::PlaceSearchError::Provider(
                    "provider down".to_string(),
                ));
            }
            Ok(self.pages.get(call % self.pages.len()).cloned().unwrap_or_default())
        }
    }

    fn finder(provider: StubProvider) -> PoiFinder {
        let zones = Arc::new(InMemoryZoneStore::with_zones(vec![zone("z1")]));
        PoiFinder::new(zones, Arc::new(provider))
    }

    #[tokio::test]
    async fn test_missing_zone_is_surfaced() {
        let finder = finder(StubProvider {
            pages: vec![vec![]],
            calls: AtomicUsize::new(0),
            fail_first: false,
        });

        let result = finder
            .find_pois_by_category("nope", "food", &PoiFinderOptions::default())
            .await;
        assert!(matches!(result, Err(PoiFinderError::ZoneNotFound(_))));
    }

    #[tokio::test]
    async fn test_dedups_across_queries() {
        // Both food queries return p1; p1 must appear once
        let shared = poi("p1", 16.101, 108.261);
        let finder = finder(StubProvider {
            pages: vec![
                vec![shared.clone(), poi("p2", 16.102, 108.262)],
                vec![shared.clone(), poi("p3", 16.103, 108.263)],
            ],
            calls: AtomicUsize::new(0),
            fail_first: false,
        });

        let pois = finder
            .find_pois_by_category("z1", "food", &PoiFinderOptions::default())
            .await
            .unwrap();

        let p1_count = pois.iter().filter(|p| p.poi.id == "p1").count();
        assert_eq!(p1_count, 1);
        assert_eq!(pois.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_query_degrades_to_partial_results() {
        let finder = finder(StubProvider {
            pages: vec![vec![poi("p1", 16.101, 108.261)]],
            calls: AtomicUsize::new(0),
            fail_first: true,
        });

        // First query errors, second succeeds; the call still returns data
        let pois = finder
            .find_pois_by_category("z1", "food", &PoiFinderOptions::default())
            .await
            .unwrap();
        assert_eq!(pois.len(), 1);
    }

    #[tokio::test]
    async fn test_vibe_driven_search_picks_best_category() {
        let finder = finder(StubProvider {
            pages: vec![vec![poi("p1", 16.101, 108.261)]],
            calls: AtomicUsize::new(0),
            fail_first: false,
        });

        let vibes = vec!["food".to_string(), "local".to_string()];
        let pois = finder
            .find_pois_by_vibes("z1", &vibes, &PoiFinderOptions::default())
            .await
            .unwrap();

        assert!(!pois.is_empty());
        assert!(pois.iter().all(|p| p.category == "food"));
    }

    #[tokio::test]
    async fn test_radius_filter_drops_distant_pois() {
        // ~11 km north of center, well past the 3 km radius
        let finder = finder(StubProvider {
            pages: vec![vec![poi("near", 16.101, 108.261), poi("far", 16.20, 108.26)]],
            calls: AtomicUsize::new(0),
            fail_first: false,
        });

        let pois = finder
            .find_pois_by_category("z1", "views", &PoiFinderOptions::default())
            .await
            .unwrap();

        assert!(pois.iter().any(|p| p.poi.id == "near"));
        assert!(!pois.iter().any(|p| p.poi.id == "far"));
    }

    #[tokio::test]
    async fn test_polygon_bounding_box_filter() {
        let mut z = zone("z1");
        z.polygon = Some(vec![
            [16.09, 108.25],
            [16.11, 108.25],
            [16.11, 108.27],
            [16.09, 108.27],
        ]);
        let zones = Arc::new(InMemoryZoneStore::with_zones(vec![z]));
        let provider = StubProvider {
            pages: vec![vec![poi("inside", 16.10, 108.26), poi("outside", 16.15, 108.26)]],
            calls: AtomicUsize::new(0),
            fail_first: false,
        };
        let finder = PoiFinder::new(zones, Arc::new(provider));

        let pois = finder
            .find_pois_by_category("z1", "views", &PoiFinderOptions::default())
            .await
            .unwrap();

        assert!(pois.iter().any(|p| p.poi.id == "inside"));
        assert!(!pois.iter().any(|p| p.poi.id == "outside"));
    }

    #[tokio::test]
    async fn test_priority_categories_survive_failures() {
        let finder = finder(StubProvider {
            pages: vec![vec![poi("p1", 16.101, 108.261)]],
            calls: AtomicUsize::new(0),
            fail_first: true,
        });

        let by_category = finder
            .load_priority_categories("z1", &PoiFinderOptions::default())
            .await
            .unwrap();

        // All three priority categories present even though one query failed
        assert_eq!(by_category.len(), 3);
        assert!(by_category.contains_key("views"));
        assert!(by_category.contains_key("beach"));
        assert!(by_category.contains_key("nature"));
    }
}
