//! Great-circle distances and nearest-pharmacy ranking.

use crate::models::Pharmacy;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Number of pharmacies a prescription is offered to.
pub const ALLOCATION_LIMIT: usize = 10;

/// Haversine distance in kilometres between two `(latitude, longitude)` points.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());
    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;
    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone)]
pub struct RankedPharmacy {
    pub pharmacy: Pharmacy,
    pub distance_km: f64,
}

/// Pharmacies with coordinates, nearest first, within `max_distance_km` when given.
pub fn nearest(
    origin: (f64, f64),
    pharmacies: Vec<Pharmacy>,
    max_distance_km: Option<f64>,
    limit: usize,
) -> Vec<RankedPharmacy> {
    let mut ranked: Vec<RankedPharmacy> = pharmacies
        .into_iter()
        .filter_map(|pharmacy| {
            let distance_km = haversine_km(origin, pharmacy.location()?);
            Some(RankedPharmacy { pharmacy, distance_km })
        })
        .filter(|ranked| max_distance_km.is_none_or(|max| ranked.distance_km <= max))
        .collect();
    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn pharmacy(name: &str, lat: f64, lon: f64) -> Pharmacy {
        Pharmacy {
            pharmacy_id: Uuid::new_v4(),
            name: name.into(),
            latitude: Some(lat),
            longitude: Some(lon),
            is_active: true,
        }
    }

    #[test]
    fn known_city_distance() {
        // Cape Town to Johannesburg is roughly 1260 km.
        let distance = haversine_km((-33.9249, 18.4241), (-26.2041, 28.0473));
        assert!((distance - 1261.0).abs() < 10.0, "got {distance}");
        assert_eq!(haversine_km((10.0, 10.0), (10.0, 10.0)), 0.0);
    }

    #[test]
    fn ranks_filters_and_limits() {
        let origin = (-33.9249, 18.4241);
        let pharmacies = vec![
            pharmacy("Far", -26.2041, 28.0473),
            pharmacy("Near", -33.93, 18.43),
            pharmacy("Middle", -34.05, 18.60),
            Pharmacy {
                latitude: None,
                ..pharmacy("Unplaced", 0.0, 0.0)
            },
        ];

        let ranked = nearest(origin, pharmacies.clone(), None, ALLOCATION_LIMIT);
        let names: Vec<&str> = ranked.iter().map(|r| r.pharmacy.name.as_str()).collect();
        assert_eq!(names, ["Near", "Middle", "Far"]);

        let ranked = nearest(origin, pharmacies.clone(), Some(50.0), ALLOCATION_LIMIT);
        assert_eq!(ranked.len(), 2);

        let ranked = nearest(origin, pharmacies, None, 1);
        assert_eq!(ranked[0].pharmacy.name, "Near");
        assert_eq!(ranked.len(), 1);
    }
}
