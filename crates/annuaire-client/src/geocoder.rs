//! City geocoding against the portal's address search endpoint.
//!
//! The endpoint returns a list of candidate places; only the first one is used.

use crate::error::{ClientError, Result};
use crate::headers;
use annuaire_core::{CityName, PortalConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt::Display;
use std::time::Duration;

/// Center point and search polygon for a city.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    /// Center latitude in decimal degrees
    pub center_lat: f64,
    /// Center longitude in decimal degrees
    pub center_lng: f64,
    /// Polygon vertices as `lon1,lat1,...,lonN,latN`
    pub bbox: String,
}

/// Resolves a city name to a [`ResolvedLocation`].
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up `city`.
    ///
    /// # Errors
    /// Returns `ClientError::NotFound` when nothing usable comes back, including
    /// on transport failures and non-success statuses.
    async fn resolve(&self, city: &CityName) -> Result<ResolvedLocation>;
}

/// Geocoder backed by the portal's `recherche/adresse` endpoint.
pub struct PortalGeocoder {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl PortalGeocoder {
    /// Create a geocoder for the configured portal.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(config: &PortalConfig) -> Result<Self> {
        let referer = format!("{}/", config.portal_url.trim_end_matches('/'));
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers::geocode_headers(&referer)?)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/recherche/adresse", config.api_url.trim_end_matches('/')),
            timeout: Duration::from_secs(config.geocode_timeout_secs),
        })
    }

    async fn fetch(&self, city: &CityName) -> std::result::Result<Value, reqwest::Error> {
        self.client
            .get(&self.endpoint)
            .query(&[("adresse", city.as_str())])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await
    }
}

#[async_trait]
impl Geocoder for PortalGeocoder {
    #[tracing::instrument(skip_all, fields(city = %city))]
    async fn resolve(&self, city: &CityName) -> Result<ResolvedLocation> {
        tracing::info!("Geocoding city: {}", city);

        let body = self.fetch(city).await.map_err(|e| {
            tracing::error!("Geocoding API request failed for {}: {}", city, e);
            ClientError::NotFound {
                query: city.to_string(),
                reason: format!("request failed: {e}"),
            }
        })?;

        parse_geocode_response(&body).map_err(|reason| {
            tracing::warn!("No usable result for city {}: {}", city, reason);
            ClientError::NotFound {
                query: city.to_string(),
                reason,
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    centre: Point,
    bbox: Polygon,
}

#[derive(Debug, Deserialize)]
struct Point {
    /// `[lng, lat]`
    coordinates: [f64; 2],
}

#[derive(Debug, Deserialize)]
struct Polygon {
    /// Rings of `[lng, lat]` vertices; the outer ring comes first.
    coordinates: Vec<Vec<[serde_json::Number; 2]>>,
}

/// Extract the first place of a geocoding response.
///
/// # Errors
/// Returns a reason string when the body is not a non-empty list or the first
/// element lacks a center point or an outer ring.
pub fn parse_geocode_response(body: &Value) -> std::result::Result<ResolvedLocation, String> {
    let places = body
        .as_array()
        .ok_or_else(|| "response is not a list".to_string())?;
    let first = places
        .first()
        .ok_or_else(|| "empty result list".to_string())?;

    let place = Place::deserialize(first).map_err(|e| format!("unexpected place shape: {e}"))?;
    let [center_lng, center_lat] = place.geometry.centre.coordinates;
    let ring = place
        .geometry
        .bbox
        .coordinates
        .first()
        .ok_or_else(|| "bounding box has no ring".to_string())?;

    Ok(ResolvedLocation {
        center_lat,
        center_lng,
        bbox: serialize_bbox(ring),
    })
}

/// Flatten `[lon, lat]` vertices into `lon1,lat1,lon2,lat2,...`, keeping their order.
#[must_use]
pub fn serialize_bbox<T: Display>(vertices: &[[T; 2]]) -> String {
    vertices
        .iter()
        .map(|[lon, lat]| format!("{lon},{lat}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_bbox_keeps_order() {
        assert_eq!(
            serialize_bbox(&[[5.1, 43.1], [5.2, 43.2]]),
            "5.1,43.1,5.2,43.2"
        );
        assert_eq!(serialize_bbox::<f64>(&[]), "");
    }

    #[test]
    fn test_parse_first_place() {
        let body = json!([
            {
                "label": "Marseille",
                "geometry": {
                    "centre": { "type": "Point", "coordinates": [5.38, 43.28] },
                    "bbox": {
                        "type": "Polygon",
                        "coordinates": [[
                            [5.228751, 43.169636],
                            [5.532543, 43.169636],
                            [5.532543, 43.391057],
                            [5.228751, 43.391057],
                            [5.228751, 43.169636]
                        ]]
                    }
                }
            },
            {
                "label": "Marseille-en-Beauvaisis",
                "geometry": {
                    "centre": { "coordinates": [1.98, 49.57] },
                    "bbox": { "coordinates": [[[1.9, 49.5]]] }
                }
            }
        ]);

        let location = parse_geocode_response(&body).expect("parse location");
        assert!((location.center_lat - 43.28).abs() < f64::EPSILON);
        assert!((location.center_lng - 5.38).abs() < f64::EPSILON);
        assert_eq!(
            location.bbox,
            "5.228751,43.169636,5.532543,43.169636,5.532543,43.391057,5.228751,43.391057,5.228751,43.169636"
        );
    }

    #[test]
    fn test_parse_empty_list() {
        let err = parse_geocode_response(&json!([])).expect_err("empty list");
        assert_eq!(err, "empty result list");
    }

    #[test]
    fn test_parse_rejects_non_list() {
        assert!(parse_geocode_response(&json!({ "error": "bad request" })).is_err());
    }

    #[test]
    fn test_parse_rejects_missing_bbox() {
        let body = json!([{ "geometry": { "centre": { "coordinates": [5.38, 43.28] } } }]);
        let err = parse_geocode_response(&body).expect_err("missing bbox");
        assert!(err.contains("unexpected place shape"));
    }

    #[test]
    fn test_parse_keeps_number_text() {
        let body = json!([{
            "geometry": {
                "centre": { "coordinates": [5, 43] },
                "bbox": { "coordinates": [[[5, 43.0], [6, 44]]] }
            }
        }]);
        let location = parse_geocode_response(&body).expect("parse location");
        assert_eq!(location.bbox, "5,43.0,6,44");
        assert!((location.center_lat - 43.0).abs() < f64::EPSILON);
    }
}
