use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::services::geofence::GeoPoint;

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct ReverseLookup {
    display_name: Option<String>,
}

/// Best-effort reverse geocoder against a Nominatim-compatible `/reverse` endpoint.
#[derive(Clone)]
pub struct Geocoder {
    client: Option<Client>,
    base_url: Option<String>,
}

impl Geocoder {
    pub fn new(base_url: Option<String>) -> Self {
        let Some(base_url) = base_url else {
            return Self::disabled();
        };

        match Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .user_agent(concat!("hrms/", env!("CARGO_PKG_VERSION")))
            .build()
        {
            Ok(client) => Self {
                client: Some(client),
                base_url: Some(base_url),
            },
            Err(e) => {
                log::warn!("Reverse geocoding disabled, client build failed: {}", e);
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self {
            client: None,
            base_url: None,
        }
    }

    /// Use the caller's address when present, otherwise look one up, otherwise the coordinates.
    pub async fn resolve_address(&self, point: GeoPoint, provided: Option<&str>) -> String {
        if let Some(address) = provided.map(str::trim).filter(|a| !a.is_empty()) {
            return address.to_string();
        }

        match self.reverse(point).await {
            Ok(Some(address)) => address,
            Ok(None) => coordinate_label(point),
            Err(e) => {
                log::warn!(
                    "Reverse geocoding failed for {}: {}",
                    coordinate_label(point),
                    e
                );
                coordinate_label(point)
            }
        }
    }

    async fn reverse(&self, point: GeoPoint) -> Result<Option<String>, reqwest::Error> {
        let (Some(client), Some(base_url)) = (&self.client, &self.base_url) else {
            return Ok(None);
        };

        let lookup = client
            .get(format!("{}/reverse", base_url))
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", point.latitude.to_string()),
                ("lon", point.longitude.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<ReverseLookup>()
            .await?;

        Ok(lookup
            .display_name
            .map(|name| name.trim().chars().take(500).collect::<String>())
            .filter(|name| !name.is_empty()))
    }
}

pub fn coordinate_label(point: GeoPoint) -> String {
    format!("{:.6}, {:.6}", point.latitude, point.longitude)
}
