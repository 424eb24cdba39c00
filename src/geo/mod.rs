use crate::models::store::GeoPoint;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Fallback speed when no vehicle profile is known.
pub const DEFAULT_SPEED_KMH: f64 = 30.0;

pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

pub fn eta_minutes(distance_km: f64, speed_kmh: f64) -> u32 {
    let speed = if speed_kmh > 0.0 {
        speed_kmh
    } else {
        DEFAULT_SPEED_KMH
    };

    (distance_km / speed * 60.0).round() as u32
}
