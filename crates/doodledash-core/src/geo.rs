/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two lat/lon points in kilometers
/// (haversine formula). Used to filter room listings by proximity.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_same_point() {
        assert!(haversine_km(11.2488, 75.7839, 11.2488, 75.7839) < 1e-9);
    }

    #[test]
    fn kozhikode_to_kochi_roughly_150km() {
        // Kozhikode (11.2588, 75.7804) to Kochi (9.9312, 76.2673)
        let d = haversine_km(11.2588, 75.7804, 9.9312, 76.2673);
        assert!((140.0..165.0).contains(&d), "got {d}");
    }

    #[test]
    fn london_to_paris_roughly_344km() {
        let d = haversine_km(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((330.0..360.0).contains(&d), "got {d}");
    }

    #[test]
    fn symmetric() {
        let ab = haversine_km(10.0, 76.0, 12.0, 77.0);
        let ba = haversine_km(12.0, 77.0, 10.0, 76.0);
        assert!((ab - ba).abs() < 1e-9);
    }
}
