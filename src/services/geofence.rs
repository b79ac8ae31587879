//! Great-circle distance and office radius containment.

use crate::database::models::Location;
use crate::error::{AppError, PolicyKind};

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Haversine distance in meters between two points.
pub fn distance_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push h slightly out of [0, 1] for antipodal points.
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_METERS * c
}

pub fn is_within_radius(point: GeoPoint, center: GeoPoint, radius_meters: f64) -> bool {
    distance_meters(point, center) <= radius_meters
}

/// Record-level containment flag. Offices without coordinates never flag a record.
pub fn within_office(point: GeoPoint, location: &Location) -> bool {
    match location.center() {
        Some(center) => is_within_radius(point, center, location.radius_meters()),
        None => true,
    }
}

/// Outcome of the geofence gate at check-in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FenceCheck {
    pub distance_meters: Option<f64>,
    pub within_office_radius: bool,
}

/// Enforce the office geofence for a check-in.
///
/// Only locations with validation enabled are enforced. An enforced location
/// without coordinates cannot be evaluated and is rejected as misconfigured.
pub fn enforce_check_in(point: GeoPoint, location: Option<&Location>) -> Result<FenceCheck, AppError> {
    let Some(location) = location else {
        return Ok(FenceCheck {
            distance_meters: None,
            within_office_radius: true,
        });
    };

    if !location.location_validation_enabled {
        let distance = location.center().map(|center| distance_meters(point, center));
        return Ok(FenceCheck {
            distance_meters: distance,
            within_office_radius: within_office(point, location),
        });
    }

    let center = location.center().ok_or_else(|| {
        AppError::policy(
            PolicyKind::LocationNotConfigured,
            format!(
                "Office location '{}' has validation enabled but no coordinates configured",
                location.name
            ),
        )
    })?;

    let distance = distance_meters(point, center);
    if distance > location.radius_meters() {
        return Err(AppError::policy(
            PolicyKind::OutsideGeofence,
            format!(
                "You are {:.0} meters away from the office. Check-in is allowed within {} meters",
                distance, location.allowed_radius
            ),
        ));
    }

    Ok(FenceCheck {
        distance_meters: Some(distance),
        within_office_radius: true,
    })
}
