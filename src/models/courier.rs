use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const EARTH_RADIUS_KM: f64 = 6_371.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Straight-line (great-circle) distance in kilometers. Surfaced to
    /// couriers alongside job offers; never used for routing.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lng = (other.lng - self.lng).to_radians();

        let sin_lat = (delta_lat / 2.0).sin();
        let sin_lng = (delta_lng / 2.0).sin();

        let h = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
        2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Courier {
    pub id: Uuid,
    pub name: String,
    pub location: GeoPoint,
    pub active: bool,
    pub updated_at: DateTime<Utc>,
}
