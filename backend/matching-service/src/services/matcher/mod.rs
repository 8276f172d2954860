// ============================================
// Zone Matcher
// ============================================
//
// Top-level orchestration for one matching query:
// 1. Embedding attempt: health probe, hybrid search, id -> zone mapping
// 2. Keyword fallback: all active zones minus avoid matches
// 3. Re-rank everything with the rule scorer and a context-dependent blend
//
// The matcher itself never errors: embedding failures degrade to the keyword
// path, and an empty catalog yields an empty result.

use super::embedding::{HybridSearchRequest, SemanticIndex};
use super::scoring::{haversine_km, score_zone, user_proximity_bonus};
use super::storage::ZoneStore;
use crate::models::{GeoPoint, MatchStrategy, Preference, ScoredZone, Zone};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Candidates requested from the semantic index.
const SEARCH_TOP_K: u32 = 20;

/// Vibe boost factor handed to hybrid search.
const VIBE_BOOST: f64 = 1.3;

/// Zones returned to the caller.
const RESULT_LIMIT: usize = 10;

/// Free-text fragments that signal a "near me" intent.
const PROXIMITY_CUES: [&str; 8] = [
    "gần",
    "quanh đây",
    "gần đây",
    "gần tôi",
    "near",
    "nearby",
    "close to",
    "around here",
];

#[derive(Debug, Clone)]
pub struct MatchOptions {
    pub province: Option<String>,
    pub user_location: Option<GeoPoint>,
    pub use_embedding: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            province: None,
            user_location: None,
            use_embedding: true,
        }
    }
}

impl MatchOptions {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug)]
pub struct ZoneMatchResult {
    pub strategy: MatchStrategy,
    pub zones: Vec<ScoredZone>,
    pub reason: String,
}

/// Zone plus the annotations the embedding path attaches.
struct Candidate {
    zone: Zone,
    embed_score: f64,
    vibe_matches: Vec<String>,
}

pub struct ZoneMatcher {
    zones: Arc<dyn ZoneStore>,
    index: Arc<dyn SemanticIndex>,
}

impl ZoneMatcher {
    pub fn new(zones: Arc<dyn ZoneStore>, index: Arc<dyn SemanticIndex>) -> Self {
        Self { zones, index }
    }

    pub async fn match_zones(&self, prefs: &Preference, options: &MatchOptions) -> ZoneMatchResult {
        debug!(
            vibes = prefs.vibes.len(),
            avoid = prefs.avoid.len(),
            province = options.province.as_deref().unwrap_or("-"),
            use_embedding = options.use_embedding,
            "matching zones"
        );

        let mut candidates = Vec::new();
        let mut strategy = MatchStrategy::Keyword;

        if options.use_embedding {
            match self.embedding_candidates(prefs, options).await {
                Ok(found) if !found.is_empty() => {
                    candidates = found;
                    strategy = MatchStrategy::Embedding;
                }
                Ok(_) => {
                    debug!("embedding produced no candidates, falling back to keyword");
                }
                Err(e) => {
                    warn!(error = %e, "embedding attempt failed, falling back to keyword");
                }
            }
        }

        if candidates.is_empty() {
            candidates = match self.keyword_candidates(prefs, options).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(error = %e, "zone store unavailable");
                    Vec::new()
                }
            };
            strategy = MatchStrategy::Keyword;
        }

        if candidates.is_empty() {
            return ZoneMatchResult {
                strategy: MatchStrategy::None,
                zones: Vec::new(),
                reason: "no zones available".to_string(),
            };
        }

        let mut scored = self.rerank(candidates, prefs, options);
        scored.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(RESULT_LIMIT);

        info!(
            strategy = strategy.as_str(),
            zones = scored.len(),
            "matching complete"
        );

        let reason = format!("found {} zones using {}", scored.len(), strategy.as_str());
        ZoneMatchResult {
            strategy,
            zones: scored,
            reason,
        }
    }

    /// Embedding path: health probe, hybrid search, map hit ids back to
    /// stored zones. Hits without a stored zone are dropped with a warning.
    async fn embedding_candidates(
        &self,
        prefs: &Preference,
        options: &MatchOptions,
    ) -> Result<Vec<Candidate>, String> {
        if !self.index.is_available().await {
            return Err("embedding service unavailable".to_string());
        }

        let free_text = if prefs.raw_text.is_empty() {
            prefs.vibes.join(" ")
        } else {
            prefs.raw_text.clone()
        };

        let response = self
            .index
            .hybrid_search(&HybridSearchRequest {
                free_text,
                vibes: prefs.vibes.clone(),
                avoid: prefs.avoid.clone(),
                top_k: SEARCH_TOP_K,
                filter_type: "zone".to_string(),
                filter_province: options.province.clone(),
                boost_vibes: VIBE_BOOST,
            })
            .await
            .map_err(|e| e.to_string())?;

        if response.hits.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = response.hits.iter().map(|hit| hit.id.clone()).collect();
        let zones = self
            .zones
            .find_by_ids(&ids)
            .await
            .map_err(|e| e.to_string())?;
        let mut by_id: HashMap<String, Zone> =
            zones.into_iter().map(|zone| (zone.id.clone(), zone)).collect();

        let mut candidates = Vec::new();
        for hit in response.hits {
            match by_id.remove(&hit.id) {
                Some(zone) => candidates.push(Candidate {
                    zone,
                    // Clamped so the boost factor can never push it past 1
                    embed_score: hit.score.min(1.0),
                    vibe_matches: hit.vibe_matches,
                }),
                None => warn!(zone_id = %hit.id, "hit has no stored zone, dropping"),
            }
        }

        Ok(candidates)
    }

    /// Keyword fallback: every active zone, minus avoid-term matches.
    async fn keyword_candidates(
        &self,
        prefs: &Preference,
        options: &MatchOptions,
    ) -> Result<Vec<Candidate>, String> {
        let zones = self
            .zones
            .find_active(options.province.as_deref())
            .await
            .map_err(|e| e.to_string())?;

        let before = zones.len();
        let candidates: Vec<Candidate> = zones
            .into_iter()
            .filter(|zone| !matches_avoid(zone, &prefs.avoid))
            .map(|zone| Candidate {
                zone,
                embed_score: 0.0,
                vibe_matches: Vec::new(),
            })
            .collect();

        if candidates.len() < before {
            debug!(
                before,
                after = candidates.len(),
                "avoid filter dropped zones"
            );
        }

        Ok(candidates)
    }

    /// Blend rule score, embedding score and optional proximity into the
    /// final ranking score.
    fn rerank(
        &self,
        candidates: Vec<Candidate>,
        prefs: &Preference,
        options: &MatchOptions,
    ) -> Vec<ScoredZone> {
        let wants_nearby = has_proximity_cue(&prefs.raw_text);

        candidates
            .into_iter()
            .map(|candidate| {
                let rule = score_zone(&candidate.zone, prefs);
                let mut reasons = rule.reasons;

                let (proximity_score, distance_km) = match options.user_location {
                    Some(user) => {
                        let distance = haversine_km(user, candidate.zone.center);
                        let bonus = user_proximity_bonus(distance);
                        if bonus > 0.0 {
                            reasons.push(format!("close to you ({:.1}km)", distance));
                        }
                        (Some(bonus), Some(distance))
                    }
                    None => (None, None),
                };

                let final_score = match proximity_score {
                    Some(proximity) if wants_nearby => {
                        0.3 * rule.score + 0.3 * candidate.embed_score + 0.4 * proximity
                    }
                    Some(proximity) => {
                        0.4 * rule.score + 0.4 * candidate.embed_score + 0.2 * proximity
                    }
                    None => 0.5 * rule.score + 0.5 * candidate.embed_score,
                };

                ScoredZone {
                    zone: candidate.zone,
                    hard_vibe_score: rule.score,
                    embed_score: candidate.embed_score,
                    proximity_score,
                    distance_km,
                    final_score,
                    vibe_matches: candidate.vibe_matches,
                    reasons,
                }
            })
            .collect()
    }
}

fn matches_avoid(zone: &Zone, avoid: &[String]) -> bool {
    if avoid.is_empty() {
        return false;
    }
    let text = format!(
        "{} {} {}",
        zone.name.to_lowercase(),
        zone.desc.to_lowercase(),
        zone.tags.join(" ").to_lowercase()
    );
    avoid
        .iter()
        .any(|term| !term.is_empty() && text.contains(&term.to_lowercase()))
}

fn has_proximity_cue(raw_text: &str) -> bool {
    if raw_text.is_empty() {
        return false;
    }
    let lower = raw_text.to_lowercase();
    PROXIMITY_CUES.iter().any(|cue| lower.contains(cue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::embedding::{
        EmbedError, EmbedResult, HybridSearchResponse, SearchHit, UpsertItem, UpsertStats,
    };
    use crate::services::storage::InMemoryZoneStore;
    use async_trait::async_trait;

    fn zone(id: &str, name: &str, tags: &[&str], desc: &str) -> Zone {
        Zone {
            id: id.to_string(),
            name: name.to_string(),
            province: "Đà Nẵng".to_string(),
            center: GeoPoint { lat: 16.06, lng: 108.24 },
            radius_m: 1500.0,
            polygon: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            vibe_keywords: vec![],
            avoid_tags: vec![],
            desc: desc.to_string(),
            rating: None,
            is_active: true,
        }
    }

    fn prefs(vibes: &[&str], avoid: &[&str]) -> Preference {
        Preference {
            vibes: vibes.iter().map(|v| v.to_string()).collect(),
            avoid: avoid.iter().map(|a| a.to_string()).collect(),
            keywords: vec![],
            raw_text: String::new(),
        }
    }

    /// Index stub with scripted availability and hits.
    struct StubIndex {
        available: bool,
        hits: Vec<SearchHit>,
        fail_search: bool,
    }

    impl StubIndex {
        fn down() -> Self {
            Self {
                available: false,
                hits: vec![],
                fail_search: false,
            }
        }

        fn with_hits(hits: Vec<SearchHit>) -> Self {
            Self {
                available: true,
                hits,
                fail_search: false,
            }
        }
    }

    #[async_trait]
    impl SemanticIndex for StubIndex {
        async fn embed(&self, texts: &[String]) -> EmbedResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![0.0; 1024]).collect())
        }

        async fn upsert(&self, _items: &[UpsertItem]) -> EmbedResult<UpsertStats> {
            Ok(UpsertStats {
                added: 0,
                removed: 0,
                total: 0,
            })
        }

        async fn hybrid_search(
            &self,
            _request: &HybridSearchRequest,
        ) -> EmbedResult<HybridSearchResponse> {
            if self.fail_search {
                return Err(EmbedError::Call("boom".to_string()));
            }
            Ok(HybridSearchResponse {
                hits: self.hits.clone(),
                strategy: Some("hybrid".to_string()),
            })
        }

        async fn is_available(&self) -> bool {
            self.available
        }
    }

    fn store() -> Arc<InMemoryZoneStore> {
        Arc::new(InMemoryZoneStore::with_zones(vec![
            zone("z1", "Mỹ Khê", &["beach"], "bãi biển yên tĩnh"),
            zone("z2", "Chợ Hàn", &["shopping"], "chợ đông đúc"),
        ]))
    }

    #[tokio::test]
    async fn test_healthy_index_uses_embedding_strategy() {
        let matcher = ZoneMatcher::new(
            store(),
            Arc::new(StubIndex::with_hits(vec![SearchHit {
                id: "z1".to_string(),
                score: 0.9,
                vibe_matches: vec!["beach".to_string()],
            }])),
        );

        let result = matcher
            .match_zones(&prefs(&["beach"], &[]), &MatchOptions::new())
            .await;

        assert_eq!(result.strategy, MatchStrategy::Embedding);
        assert_eq!(result.zones.len(), 1);
        assert!((result.zones[0].embed_score - 0.9).abs() < 1e-9);
        assert_eq!(result.zones[0].vibe_matches, vec!["beach".to_string()]);
    }

    #[tokio::test]
    async fn test_embed_score_clamped_to_one() {
        let matcher = ZoneMatcher::new(
            store(),
            Arc::new(StubIndex::with_hits(vec![SearchHit {
                id: "z1".to_string(),
                score: 1.4,
                vibe_matches: vec![],
            }])),
        );

        let result = matcher
            .match_zones(&prefs(&[], &[]), &MatchOptions::new())
            .await;
        assert!((result.zones[0].embed_score - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unavailable_index_falls_back_to_keyword() {
        let matcher = ZoneMatcher::new(store(), Arc::new(StubIndex::down()));

        let result = matcher
            .match_zones(&prefs(&["beach"], &[]), &MatchOptions::new())
            .await;

        assert_eq!(result.strategy, MatchStrategy::Keyword);
        assert_eq!(result.zones.len(), 2);
    }

    #[tokio::test]
    async fn test_search_error_falls_back_to_keyword() {
        let index = StubIndex {
            available: true,
            hits: vec![],
            fail_search: true,
        };
        let matcher = ZoneMatcher::new(store(), Arc::new(index));

        let result = matcher
            .match_zones(&prefs(&["beach"], &["đông đúc"]), &MatchOptions::new())
            .await;

        assert_eq!(result.strategy, MatchStrategy::Keyword);
        // Avoid filter drops the crowded market zone
        assert_eq!(result.zones.len(), 1);
        assert_eq!(result.zones[0].zone.id, "z1");
    }

    #[tokio::test]
    async fn test_unknown_hit_ids_are_dropped() {
        let matcher = ZoneMatcher::new(
            store(),
            Arc::new(StubIndex::with_hits(vec![
                SearchHit {
                    id: "z1".to_string(),
                    score: 0.8,
                    vibe_matches: vec![],
                },
                SearchHit {
                    id: "ghost".to_string(),
                    score: 0.7,
                    vibe_matches: vec![],
                },
            ])),
        );

        let result = matcher
            .match_zones(&prefs(&[], &[]), &MatchOptions::new())
            .await;

        assert_eq!(result.strategy, MatchStrategy::Embedding);
        assert_eq!(result.zones.len(), 1);
        assert_eq!(result.zones[0].zone.id, "z1");
    }

    #[tokio::test]
    async fn test_empty_catalog_returns_none_strategy() {
        let matcher = ZoneMatcher::new(
            Arc::new(InMemoryZoneStore::new()),
            Arc::new(StubIndex::down()),
        );

        let result = matcher
            .match_zones(&prefs(&["beach"], &[]), &MatchOptions::new())
            .await;

        assert_eq!(result.strategy, MatchStrategy::None);
        assert!(result.zones.is_empty());
    }

    #[tokio::test]
    async fn test_blend_without_location_halves() {
        let matcher = ZoneMatcher::new(
            store(),
            Arc::new(StubIndex::with_hits(vec![SearchHit {
                id: "z1".to_string(),
                score: 0.8,
                vibe_matches: vec![],
            }])),
        );

        let result = matcher
            .match_zones(&prefs(&["beach"], &[]), &MatchOptions::new())
            .await;

        let top = &result.zones[0];
        let expected = 0.5 * top.hard_vibe_score + 0.5 * top.embed_score;
        assert!((top.final_score - expected).abs() < 1e-9);
        assert!(top.proximity_score.is_none());
    }

    #[tokio::test]
    async fn test_blend_with_location_and_cue() {
        let matcher = ZoneMatcher::new(
            store(),
            Arc::new(StubIndex::with_hits(vec![SearchHit {
                id: "z1".to_string(),
                score: 0.8,
                vibe_matches: vec![],
            }])),
        );

        let user = GeoPoint { lat: 16.0601, lng: 108.2401 };

        // No cue: 0.4/0.4/0.2
        let mut options = MatchOptions::new();
        options.user_location = Some(user);
        let result = matcher.match_zones(&prefs(&["beach"], &[]), &options).await;
        let top = &result.zones[0];
        let proximity = top.proximity_score.unwrap();
        let expected = 0.4 * top.hard_vibe_score + 0.4 * top.embed_score + 0.2 * proximity;
        assert!((top.final_score - expected).abs() < 1e-9);

        // Cue present: 0.3/0.3/0.4
        let mut near_prefs = prefs(&["beach"], &[]);
        near_prefs.raw_text = "bãi biển gần tôi".to_string();
        let result = matcher.match_zones(&near_prefs, &options).await;
        let top = &result.zones[0];
        let proximity = top.proximity_score.unwrap();
        let expected = 0.3 * top.hard_vibe_score + 0.3 * top.embed_score + 0.4 * proximity;
        assert!((top.final_score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_proximity_cue_detection() {
        assert!(has_proximity_cue("quán ăn gần đây"));
        assert!(has_proximity_cue("somewhere nearby"));
        assert!(!has_proximity_cue("bãi biển yên tĩnh"));
        assert!(!has_proximity_cue(""));
    }
}
