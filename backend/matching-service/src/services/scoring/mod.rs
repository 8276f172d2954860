pub mod geo;
pub mod keyword_matcher;
pub mod poi_scorer;
pub mod zone_scorer;

pub use geo::{haversine_km, user_proximity_bonus};
pub use keyword_matcher::{
    extract_flexible_keywords, extract_keywords, semantic_match, SemanticMatch, SEMANTIC_GROUPS,
};
pub use poi_scorer::{score_poi, PoiRuleScore};
pub use zone_scorer::{score_zone, ZoneRuleDetails, ZoneRuleScore};
