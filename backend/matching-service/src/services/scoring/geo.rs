use crate::models::GeoPoint;

/// Earth radius used for all distance math, in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometers (Haversine).
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Tiered bonus for candidates close to the caller-supplied user location.
/// Zero beyond 2 km.
pub fn user_proximity_bonus(distance_km: f64) -> f64 {
    if distance_km < 0.5 {
        0.15
    } else if distance_km < 1.0 {
        0.10
    } else if distance_km < 2.0 {
        0.05
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // Đà Nẵng → Hội An is roughly 25 km
        let da_nang = GeoPoint { lat: 16.0544, lng: 108.2022 };
        let hoi_an = GeoPoint { lat: 15.8801, lng: 108.3380 };

        let d = haversine_km(da_nang, hoi_an);
        assert!(d > 20.0 && d < 30.0, "got {}", d);
    }

    #[test]
    fn test_haversine_zero_for_same_point() {
        let p = GeoPoint { lat: 16.0, lng: 108.0 };
        assert!(haversine_km(p, p) < 1e-9);
    }

    #[test]
    fn test_proximity_tiers() {
        assert_eq!(user_proximity_bonus(0.2), 0.15);
        assert_eq!(user_proximity_bonus(0.7), 0.10);
        assert_eq!(user_proximity_bonus(1.5), 0.05);
        assert_eq!(user_proximity_bonus(2.5), 0.0);
    }
}
