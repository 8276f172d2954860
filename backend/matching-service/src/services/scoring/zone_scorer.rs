// ============================================
// Zone Rule Scorer
// ============================================
//
// Pure rule-based affinity between a structured preference object and a zone.
// Additive bonuses/penalties, clamped to [0,1]:
//   vibe match      min(0.6, n * 0.15)
//   avoid penalty  -min(0.8, n * 0.2)
//   keyword match   min(0.4, n * 0.05)
//   semantic bonus  up to 0.2 (group matcher vs zone keywords)
//   rating bonus    min(0.1, (rating - 3.0) * 0.05) when rating >= 4.0
//   popular tags   +0.03 each
//
// Never consults storage or network.

use super::keyword_matcher::{extract_keywords, semantic_match, term_matches};
use crate::models::{Preference, Zone};
use crate::utils::clamp01;

/// Tags that get a fixed popularity nudge.
const POPULAR_TAGS: [&str; 4] = ["beach", "photo", "nature", "culture"];

/// Score breakdown returned for one zone.
#[derive(Debug, Clone)]
pub struct ZoneRuleScore {
    pub score: f64,
    pub reasons: Vec<String>,
    pub details: ZoneRuleDetails,
}

#[derive(Debug, Clone, Default)]
pub struct ZoneRuleDetails {
    pub matched_vibes: Vec<String>,
    pub matched_avoids: Vec<String>,
    pub matched_keywords: Vec<String>,
}

/// Searchable text of a zone: tags, vibe keywords, description and name.
fn zone_haystack(zone: &Zone) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(zone.tags.len() + zone.vibe_keywords.len() + 2);
    parts.extend(zone.tags.iter().map(|t| t.to_lowercase()));
    parts.extend(zone.vibe_keywords.iter().map(|k| k.to_lowercase()));
    parts.push(zone.desc.to_lowercase());
    parts.push(zone.name.to_lowercase());
    parts.join(" ")
}

pub fn score_zone(zone: &Zone, prefs: &Preference) -> ZoneRuleScore {
    let haystack = zone_haystack(zone);
    let mut score = 0.0;
    let mut reasons = Vec::new();
    let mut details = ZoneRuleDetails::default();

    // 1. Vibe match
    for vibe in &prefs.vibes {
        let vibe_lower = vibe.to_lowercase();
        if !vibe_lower.is_empty() && term_matches(&vibe_lower, &haystack) {
            details.matched_vibes.push(vibe.clone());
        }
    }
    if !details.matched_vibes.is_empty() {
        let bonus = (details.matched_vibes.len() as f64 * 0.15).min(0.6);
        score += bonus;
        reasons.push(format!("vibe match: {}", details.matched_vibes.join(", ")));
    }

    // 2. Avoid penalty
    for avoid in &prefs.avoid {
        let avoid_lower = avoid.to_lowercase();
        if !avoid_lower.is_empty() && term_matches(&avoid_lower, &haystack) {
            details.matched_avoids.push(avoid.clone());
        }
    }
    if !details.matched_avoids.is_empty() {
        let penalty = (details.matched_avoids.len() as f64 * 0.2).min(0.8);
        score -= penalty;
        reasons.push(format!("avoid match: {}", details.matched_avoids.join(", ")));
    }

    // 3. Keyword match: supplied keywords plus free-text extraction
    let mut keywords: Vec<String> = prefs.keywords.iter().map(|k| k.to_lowercase()).collect();
    for extracted in extract_keywords(&prefs.raw_text) {
        if !keywords.contains(&extracted) {
            keywords.push(extracted);
        }
    }
    for keyword in &keywords {
        if haystack.contains(keyword.as_str()) {
            details.matched_keywords.push(keyword.clone());
        }
    }
    if !details.matched_keywords.is_empty() {
        let bonus = (details.matched_keywords.len() as f64 * 0.05).min(0.4);
        score += bonus;
        reasons.push(format!(
            "keyword match: {}",
            details.matched_keywords.join(", ")
        ));
    }

    // 4. Semantic bonus against the zone's own keyword set. Overlaps the
    //    keyword term above; both stay as independent additive contributions.
    if !prefs.raw_text.is_empty() {
        let semantic = semantic_match(&prefs.raw_text, &zone.vibe_keywords);
        if semantic.score > 0.0 {
            score += semantic.score * 0.2;
            reasons.push(format!("semantic match {:.2}", semantic.score));
        }
    }

    // 5. Rating bonus
    if let Some(rating) = zone.rating {
        if rating >= 4.0 {
            score += ((rating - 3.0) * 0.05).min(0.1);
            reasons.push(format!("rated {:.1}", rating));
        }
    }

    // 6. Popularity nudge
    for tag in &zone.tags {
        if POPULAR_TAGS.contains(&tag.to_lowercase().as_str()) {
            score += 0.03;
        }
    }

    ZoneRuleScore {
        score: clamp01(score),
        reasons,
        details,
    }
}
