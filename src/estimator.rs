//! Great-circle distance and constant-speed arrival estimates.

use crate::entities::Coordinates;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Average urban speed assumed when no routing data is available.
pub const DEFAULT_AVG_SPEED_KMH: f64 = 30.0;

/// Haversine distance in kilometres between two latitude/longitude pairs
/// given in degrees.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (lat1, lng1) = (lat1.to_radians(), lng1.to_radians());
    let (lat2, lng2) = (lat2.to_radians(), lng2.to_radians());

    let sin_dlat = ((lat2 - lat1) * 0.5).sin();
    let sin_dlng = ((lng2 - lng1) * 0.5).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn distance_km(from: &Coordinates, to: &Coordinates) -> f64 {
    haversine_km(from.lat, from.lng, to.lat, to.lng)
}

/// Whole minutes needed to cover `distance_km` at `avg_speed_kmh`.
pub fn eta_minutes_at(distance_km: f64, avg_speed_kmh: f64) -> i64 {
    (distance_km / avg_speed_kmh * 60.0).round() as i64
}

pub fn eta_minutes(distance_km: f64) -> i64 {
    eta_minutes_at(distance_km, DEFAULT_AVG_SPEED_KMH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        assert_eq!(haversine_km(12.9716, 77.5946, 12.9716, 77.5946), 0.0);
        assert_eq!(eta_minutes(0.0), 0);
    }

    #[test]
    fn one_degree_of_longitude_on_the_equator() {
        let d = haversine_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111.195).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn distance_is_symmetric() {
        let a = haversine_km(12.9716, 77.5946, 12.9352, 77.6245);
        let b = haversine_km(12.9352, 77.6245, 12.9716, 77.5946);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn bangalore_city_hop() {
        // MG Road to Koramangala
        let d = haversine_km(12.9716, 77.5946, 12.9352, 77.6245);
        assert!((d - 5.18).abs() < 0.05, "got {}", d);
        assert_eq!(eta_minutes(d), 10);
    }

    #[test]
    fn eta_rounds_to_nearest_minute() {
        assert_eq!(eta_minutes(4.2), 8);
        assert_eq!(eta_minutes(15.0), 30);
        assert_eq!(eta_minutes_at(10.0, 60.0), 10);
        assert_eq!(eta_minutes_at(0.24, 30.0), 0);
        assert_eq!(eta_minutes_at(0.26, 30.0), 1);
    }
}
