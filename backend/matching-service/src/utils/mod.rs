// Utility functions for matching-service

/// Sanitize a weight-map key before it is written into a profile.
///
/// Keys originate from untrusted analytics properties: structural delimiter
/// characters (`$`, `.`) are replaced, surrounding whitespace trimmed, and
/// keys that end up empty or placeholder-only are rejected. Analytics system
/// properties (leading `$`) are rejected outright.
pub fn sanitize_key(raw: &str) -> Option<String> {
    if raw.starts_with('$') {
        return None;
    }

    let cleaned: String = raw
        .chars()
        .map(|c| if c == '$' || c == '.' { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned.starts_with('_') {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Clamp a score contribution into the canonical [0, 1] range.
pub fn clamp01(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}
