use crate::models::location::GeoPoint;

const EARTH_RADIUS_MILES: f64 = 3_959.0;

/// One degree of latitude spans roughly 69 miles; used for the cheap
/// bounding-box pre-filter before the exact great-circle pass.
const MILES_PER_DEGREE: f64 = 69.0;

pub fn haversine_miles(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_MILES * central_angle
}

#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn around(center: &GeoPoint, radius_miles: f64) -> Self {
        let delta = radius_miles / MILES_PER_DEGREE;
        Self {
            min_lat: center.lat - delta,
            max_lat: center.lat + delta,
            min_lng: center.lng - delta,
            max_lng: center.lng + delta,
        }
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }
}
