// ============================================
// Place-Search Provider
// ============================================
//
// Client for the external place-search API (Map4D-style). Two search modes:
// viewbox (preferred) and nearby (fallback when the viewbox query comes back
// empty). Responses arrive as `{code: "ok", result: [...]}`; places without
// coordinates are dropped at the boundary.
//
// Results pass through an injected TTL cache keyed by the full query, so the
// cache can be disabled (TTL 0) or swapped in tests.

pub mod cache;

use crate::config::PlacesConfig;
use crate::models::{GeoPoint, Poi};
use async_trait::async_trait;
use cache::TtlCache;
use resilience::with_timeout;
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PlaceSearchError {
    #[error("place search failed: {0}")]
    Provider(String),
}

pub type PlaceResult<T> = std::result::Result<T, PlaceSearchError>;

/// One text+geo query against the provider.
#[derive(Debug, Clone)]
pub struct PlaceQuery {
    pub center: GeoPoint,
    pub radius_m: f64,
    pub text: String,
    pub types: String,
    pub limit: usize,
}

impl PlaceQuery {
    fn cache_key(&self) -> String {
        format!(
            "{:.4}:{:.4}:{}:{}:{}:{}",
            self.center.lat, self.center.lng, self.radius_m, self.text, self.types, self.limit
        )
    }
}

/// Seam for the external provider; the POI finder only sees this trait.
#[async_trait]
pub trait PlaceSearchProvider: Send + Sync {
    async fn search(&self, query: &PlaceQuery) -> PlaceResult<Vec<Poi>>;
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    code: String,
    #[serde(default)]
    result: Vec<ProviderPlace>,
}

#[derive(Debug, Deserialize)]
struct ProviderPlace {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    place_id: Option<String>,
    name: String,
    #[serde(default)]
    location: Option<GeoPoint>,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    rating: Option<f64>,
}

impl ProviderPlace {
    fn into_poi(self) -> Option<Poi> {
        let id = self.id.or(self.place_id)?;
        // Coordinate-less places are useless downstream
        let location = self.location?;
        Some(Poi {
            id,
            name: self.name,
            location: Some(location),
            types: self.types,
            rating: self.rating,
        })
    }
}

pub struct PlaceSearchClient {
    client: HttpClient,
    base_url: String,
    api_key: String,
    timeout: Duration,
    cache: TtlCache<Vec<Poi>>,
}

impl PlaceSearchClient {
    pub fn new(config: &PlacesConfig) -> Self {
        Self {
            client: HttpClient::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            cache: TtlCache::new(Duration::from_secs(config.cache_ttl_secs)),
        }
    }

    async fn get_places(&self, path: &str, params: &[(&str, String)]) -> PlaceResult<Vec<Poi>> {
        let url = format!("{}{}", self.base_url, path);
        let response: ProviderResponse = with_timeout(self.timeout, async {
            let response = self
                .client
                .get(&url)
                .query(params)
                .send()
                .await
                .map_err(|e| e.to_string())?;

            if !response.status().is_success() {
                return Err(format!("HTTP {}", response.status()));
            }

            response
                .json::<ProviderResponse>()
                .await
                .map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| PlaceSearchError::Provider(e.to_string()))?;

        if response.code != "ok" {
            warn!(code = %response.code, "provider returned non-ok code");
            return Ok(Vec::new());
        }

        Ok(response
            .result
            .into_iter()
            .filter_map(ProviderPlace::into_poi)
            .collect())
    }

    /// Viewbox search: the radius converted into a lat/lng bounding box.
    async fn search_viewbox(&self, query: &PlaceQuery) -> PlaceResult<Vec<Poi>> {
        let lat_delta = query.radius_m / 111_000.0;
        let lng_delta =
            query.radius_m / (111_000.0 * (query.center.lat.to_radians()).cos());
        let viewbox = format!(
            "{},{},{},{}",
            query.center.lat - lat_delta,
            query.center.lng - lng_delta,
            query.center.lat + lat_delta,
            query.center.lng + lng_delta
        );

        debug!(text = %query.text, %viewbox, "viewbox search");

        let mut pois = self
            .get_places(
                "/place/viewbox-search",
                &[
                    ("key", self.api_key.clone()),
                    ("viewbox", viewbox),
                    ("text", query.text.clone()),
                    ("types", query.types.clone()),
                ],
            )
            .await?;
        pois.truncate(query.limit);
        Ok(pois)
    }

    async fn search_nearby(&self, query: &PlaceQuery) -> PlaceResult<Vec<Poi>> {
        debug!(text = %query.text, radius_m = query.radius_m, "nearby search");

        let mut pois = self
            .get_places(
                "/place/nearby-search",
                &[
                    ("key", self.api_key.clone()),
                    (
                        "location",
                        format!("{},{}", query.center.lat, query.center.lng),
                    ),
                    ("radius", query.radius_m.to_string()),
                    ("text", query.text.clone()),
                    ("types", query.types.clone()),
                ],
            )
            .await?;
        pois.truncate(query.limit);
        Ok(pois)
    }
}

#[async_trait]
impl PlaceSearchProvider for PlaceSearchClient {
    async fn search(&self, query: &PlaceQuery) -> PlaceResult<Vec<Poi>> {
        let key = query.cache_key();
        if let Some(cached) = self.cache.get(&key) {
            debug!(text = %query.text, "place cache hit");
            return Ok(cached);
        }

        // Viewbox first, nearby as fallback on empty results
        let mut pois = self.search_viewbox(query).await?;
        if pois.is_empty() {
            pois = self.search_nearby(query).await?;
        }

        if !pois.is_empty() {
            self.cache.insert(key, pois.clone());
        }

        Ok(pois)
    }
}
