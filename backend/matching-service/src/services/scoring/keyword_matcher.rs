// ============================================
// Semantic Keyword Matcher
// ============================================
//
// Bilingual (Vietnamese/English) lexical matching used by the zone scorer:
// 1. Semantic groups: canonical concept -> surface terms in both languages
// 2. Flexible keyword extraction: free text -> canonical group names
// 3. Graded keyword scoring: exact 1.0 / same group 0.8 / partial 0.5

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Canonical concept groups and their surface forms.
pub static SEMANTIC_GROUPS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(|| {
    HashMap::from([
        // Mountain / nature
        (
            "mountain",
            vec!["núi", "mountain", "đồi", "hill", "peak", "view", "cảnh", "tầm nhìn"],
        ),
        ("nature", vec!["thiên nhiên", "nature", "rừng", "forest", "cảnh đẹp"]),
        // Culture
        ("culture", vec!["văn hóa", "culture", "lịch sử", "history"]),
        ("ancient", vec!["cổ kính", "ancient", "xưa", "phố cổ"]),
        ("temple", vec!["chùa", "đền", "miếu", "pagoda", "temple", "tâm linh"]),
        // Relax
        (
            "relax",
            vec!["nghỉ ngơi", "thư giãn", "relax", "peaceful", "yên tĩnh", "quiet"],
        ),
        ("peaceful", vec!["bình yên", "peaceful", "thanh bình"]),
        // Beach
        ("beach", vec!["biển", "beach", "bãi biển"]),
        ("sunset", vec!["hoàng hôn", "sunset", "bình minh", "sunrise"]),
        ("swim", vec!["bơi", "tắm biển", "swimming"]),
        // Food
        ("food", vec!["ẩm thực", "món ăn", "food", "đặc sản"]),
        ("seafood", vec!["hải sản", "seafood", "đồ biển"]),
        ("cheap", vec!["rẻ", "tiết kiệm", "budget", "cheap", "bình dân"]),
        // Photo
        ("photo", vec!["chụp ảnh", "photo", "sống ảo", "check in", "view", "cảnh"]),
        // Romantic
        ("romantic", vec!["lãng mạn", "romantic", "đèn lồng", "lantern"]),
        // Family
        ("family", vec!["gia đình", "family", "kids", "children", "trẻ em"]),
        // Nightlife
        ("nightlife", vec!["nightlife", "đêm", "bar", "club", "pub"]),
        // Shopping
        ("shopping", vec!["mua sắm", "shopping", "chợ", "market"]),
        // Crowding (avoid-side concept)
        ("crowded", vec!["đông đúc", "crowded", "chen chúc", "ồn ào", "noisy"]),
    ])
});

/// Function words excluded from free-text keyword extraction.
static STOP_WORDS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "the", "and", "for", "with", "một", "của", "và", "các", "là", "có", "tôi", "muốn",
        "thích", "đi", "đến", "cho", "này", "rất", "nơi", "chỗ",
    ]
});

/// Result of comparing free text against a zone's keyword set.
#[derive(Debug, Clone, Default)]
pub struct SemanticMatch {
    /// Average per-keyword score, capped at 1.
    pub score: f64,
    /// Keywords that matched, strongest first.
    pub matches: Vec<(String, f64)>,
}

/// Extract canonical group names mentioned anywhere in the text.
pub fn extract_flexible_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut keywords: Vec<String> = SEMANTIC_GROUPS
        .iter()
        .filter(|(_, terms)| terms.iter().any(|term| lower.contains(term)))
        .map(|(group, _)| group.to_string())
        .collect();
    keywords.sort();
    keywords
}

/// Tokenize free text into candidate keywords: lowercase, punctuation
/// stripped, tokens of <= 2 chars and stop words dropped.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let cleaned: String = lower
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    let mut seen = Vec::new();
    for token in cleaned.split_whitespace() {
        if token.chars().count() <= 2 || STOP_WORDS.contains(&token) {
            continue;
        }
        if !seen.iter().any(|s: &String| s == token) {
            seen.push(token.to_string());
        }
    }
    seen
}

/// Lexical-semantic similarity between user text and a zone's keyword set.
/// Per-keyword scores are averaged over the keyword count and capped at 1.
pub fn semantic_match(user_text: &str, zone_keywords: &[String]) -> SemanticMatch {
    if zone_keywords.is_empty() {
        return SemanticMatch::default();
    }

    let lower = user_text.to_lowercase();
    let mut total = 0.0;
    let mut matches = Vec::new();

    for keyword in zone_keywords {
        let score = score_keyword_match(&lower, keyword);
        if score > 0.0 {
            total += score;
            matches.push((keyword.clone(), score));
        }
    }

    matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    SemanticMatch {
        score: (total / zone_keywords.len() as f64).min(1.0),
        matches,
    }
}

/// Score one keyword against already-lowercased user text.
pub fn score_keyword_match(user_text: &str, keyword: &str) -> f64 {
    let kw = keyword.to_lowercase();

    // Exact occurrence
    if user_text.contains(&kw) {
        return 1.0;
    }

    // Same semantic group
    for terms in SEMANTIC_GROUPS.values() {
        if terms.contains(&kw.as_str()) && terms.iter().any(|term| user_text.contains(term)) {
            return 0.8;
        }
    }

    // Partial token overlap
    for word in user_text.split_whitespace() {
        if word.chars().count() >= 3
            && kw.chars().count() >= 3
            && (word.contains(&kw) || kw.contains(word))
        {
            return 0.5;
        }
    }

    0.0
}

/// True when `term` (or any surface form of its semantic group) occurs in the
/// haystack. Both sides are expected lowercased.
pub fn term_matches(term: &str, haystack: &str) -> bool {
    if haystack.contains(term) {
        return true;
    }

    for terms in SEMANTIC_GROUPS.values() {
        if terms.contains(&term) && terms.iter().any(|t| haystack.contains(t)) {
            return true;
        }
    }

    false
}
