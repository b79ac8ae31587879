use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::services::geofence::GeoPoint;

/// Office location an employee is assigned to; the geofence center.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Meters.
    pub allowed_radius: i32,
    pub location_validation_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    /// Office center, when both coordinates are configured.
    pub fn center(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
            _ => None,
        }
    }

    pub fn radius_meters(&self) -> f64 {
        f64::from(self.allowed_radius.max(0))
    }
}
