// Fixed catalog of POI categories. Lazy categories are loaded on demand;
// the rest are "priority" categories fetched eagerly per zone.

use once_cell::sync::Lazy;

#[derive(Debug, Clone)]
pub struct PoiCategory {
    pub key: &'static str,
    pub label: &'static str,
    pub label_en: &'static str,
    /// Provider text queries issued for this category.
    pub queries: &'static [&'static str],
    /// Vibe-affinity list handed to the POI scorer.
    pub vibes: &'static [&'static str],
    pub priority: u8,
    pub lazy: bool,
}

pub static POI_CATEGORIES: Lazy<Vec<PoiCategory>> = Lazy::new(|| {
    vec![
        PoiCategory {
            key: "views",
            label: "Điểm tham quan",
            label_en: "Views & Landmarks",
            queries: &["điểm tham quan"],
            vibes: &["photo", "sunset", "nature"],
            priority: 1,
            lazy: false,
        },
        PoiCategory {
            key: "beach",
            label: "Biển & Đảo",
            label_en: "Beach & Island",
            queries: &["bãi biển"],
            vibes: &["beach", "island", "relaxation"],
            priority: 2,
            lazy: false,
        },
        PoiCategory {
            key: "nature",
            label: "Thiên nhiên",
            label_en: "Nature & Outdoor",
            queries: &["thiên nhiên"],
            vibes: &["nature", "adventure", "hiking"],
            priority: 3,
            lazy: false,
        },
        PoiCategory {
            key: "food",
            label: "Ẩm thực",
            label_en: "Food & Dining",
            queries: &["nhà hàng", "cafe"],
            vibes: &["food", "local"],
            priority: 4,
            lazy: true,
        },
        PoiCategory {
            key: "culture",
            label: "Văn hóa",
            label_en: "Culture & History",
            queries: &["chùa", "bảo tàng"],
            vibes: &["culture", "history", "spiritual"],
            priority: 5,
            lazy: true,
        },
        PoiCategory {
            key: "shopping",
            label: "Mua sắm",
            label_en: "Shopping & Markets",
            queries: &["chợ"],
            vibes: &["shopping", "local"],
            priority: 6,
            lazy: true,
        },
        PoiCategory {
            key: "nightlife",
            label: "Giải trí",
            label_en: "Nightlife & Entertainment",
            queries: &["bar"],
            vibes: &["nightlife", "party"],
            priority: 7,
            lazy: true,
        },
    ]
});

pub fn category_by_key(key: &str) -> Option<&'static PoiCategory> {
    POI_CATEGORIES.iter().find(|cat| cat.key == key)
}

/// Non-lazy categories in priority order.
pub fn priority_categories() -> Vec<&'static PoiCategory> {
    let mut categories: Vec<&PoiCategory> =
        POI_CATEGORIES.iter().filter(|cat| !cat.lazy).collect();
    categories.sort_by_key(|cat| cat.priority);
    categories
}

/// Category with the largest vibe overlap; `views` when nothing overlaps.
pub fn category_by_vibes(vibes: &[String]) -> &'static PoiCategory {
    let mut best: Option<&PoiCategory> = None;
    let mut max_overlap = 0;

    for category in POI_CATEGORIES.iter() {
        let overlap = category
            .vibes
            .iter()
            .filter(|v| vibes.iter().any(|user| user == *v))
            .count();
        if overlap > max_overlap {
            max_overlap = overlap;
            best = Some(category);
        }
    }

    best.unwrap_or_else(|| &POI_CATEGORIES[0])
}
