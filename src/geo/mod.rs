//! Nearest-hospital lookup: Google Places text search when a key is
//! configured, OpenStreetMap Overpass otherwise or on any Google failure.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::config::GeoConfig;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

const MAPS_DIRECTIONS_URL: &str = "https://www.google.com/maps/dir/";
const MAPS_PLACE_URL: &str = "https://www.google.com/maps/place/";


#[derive(Error, Debug)]
pub enum GeoError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("Map service error: {0}")]
    Service(String),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HospitalSource {
    GooglePlaces,
    OpenStreetMap,
}


#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hospital {
    pub name: String,
    pub distance_km: f64,
    pub lat: f64,
    pub lon: f64,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub maps_url: String,
    pub source: HospitalSource,
}


#[derive(Debug, Clone, PartialEq)]
pub enum HospitalLookup {
    Found(Hospital),
    NotFound { reason: String },
}


/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2) + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}


#[derive(Debug, Deserialize)]
struct PlacesResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    place_id: Option<String>,
    geometry: PlaceGeometry,
}

#[derive(Debug, Deserialize)]
struct PlaceGeometry {
    location: PlaceLocation,
}

#[derive(Debug, Deserialize)]
struct PlaceLocation {
    lat: f64,
    lng: f64,
}


#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverpassElement {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
}


pub fn overpass_query(lat: f64, lon: f64, radius_m: u32) -> String {
    format!("[out:json];node[\"amenity\"=\"hospital\"](around:{radius_m},{lat},{lon});out;")
}

/// Closest element with coordinates, with its distance.
pub fn nearest_element(lat: f64, lon: f64, elements: &[OverpassElement]) -> Option<(&OverpassElement, f64)> {
    elements
        .iter()
        .filter_map(|e| match (e.lat, e.lon) {
            (Some(h_lat), Some(h_lon)) => Some((e, haversine_km(lat, lon, h_lat, h_lon))),
            _ => None,
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

pub fn directions_url(lat: f64, lon: f64) -> Result<Url, GeoError> {
    Ok(Url::parse_with_params(
        MAPS_DIRECTIONS_URL,
        &[
            ("api", "1".to_string()),
            ("destination", format!("{lat},{lon}")),
            ("travelmode", "driving".to_string()),
        ],
    )?)
}

fn place_url(place_id: &str) -> Result<Url, GeoError> {
    Ok(Url::parse_with_params(MAPS_PLACE_URL, &[("q", format!("place_id:{place_id}"))])?)
}


fn hospital_from_places(lat: f64, lon: f64, response: PlacesResponse) -> Result<Option<Hospital>, GeoError> {
    if response.status != "OK" {
        return Err(GeoError::Service(format!(
            "Google Places status {}: {}",
            response.status,
            response.error_message.unwrap_or_default()
        )));
    }

    let Some(place) = response.results.into_iter().next() else {
        return Ok(None);
    };

    let location = place.geometry.location;
    let maps_url = match &place.place_id {
        Some(id) => place_url(id)?,
        None => directions_url(location.lat, location.lng)?,
    };

    Ok(Some(Hospital {
        name: place.name.unwrap_or_else(|| "Unnamed Hospital".to_string()),
        distance_km: haversine_km(lat, lon, location.lat, location.lng),
        lat: location.lat,
        lon: location.lng,
        address: place.formatted_address.unwrap_or_default(),
        city: None,
        maps_url: maps_url.to_string(),
        source: HospitalSource::GooglePlaces,
    }))
}

fn hospital_from_element(element: &OverpassElement, distance_km: f64) -> Result<Option<Hospital>, GeoError> {
    let (Some(lat), Some(lon)) = (element.lat, element.lon) else {
        return Ok(None);
    };

    Ok(Some(Hospital {
        name: element
            .tags
            .get("name")
            .cloned()
            .unwrap_or_else(|| "Unnamed Hospital".to_string()),
        distance_km,
        lat,
        lon,
        address: element.tags.get("addr:street").cloned().unwrap_or_default(),
        city: element.tags.get("addr:city").cloned(),
        maps_url: directions_url(lat, lon)?.to_string(),
        source: HospitalSource::OpenStreetMap,
    }))
}


pub struct HospitalLocator {
    config: GeoConfig,
    google: Client,
    overpass: Client,
}

impl HospitalLocator {
    pub fn new(config: GeoConfig) -> Result<Self, GeoError> {
        info!(
            "Hospital locator initialized: google={}, radius={}m",
            config.google_api_key.is_some(),
            config.radius_m
        );
        Ok(Self {
            google: Client::builder()
                .timeout(Duration::from_secs(config.google_timeout_secs))
                .build()?,
            overpass: Client::builder()
                .timeout(Duration::from_secs(config.overpass_timeout_secs))
                .build()?,
            config,
        })
    }

    pub async fn nearest(&self, lat: f64, lon: f64) -> Result<HospitalLookup, GeoError> {
        if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
            return Err(GeoError::InvalidCoordinates { lat, lon });
        }

        if let Some(key) = self.config.google_api_key.as_deref().filter(|k| !k.is_empty()) {
            match self.google_nearest(key, lat, lon).await {
                Ok(Some(hospital)) => return Ok(HospitalLookup::Found(hospital)),
                Ok(None) => debug!("Google Places returned no hospitals, trying Overpass"),
                Err(e) => warn!("Google Places failed, falling back to Overpass: {}", e),
            }
        }

        self.overpass_nearest(lat, lon).await
    }

    async fn google_nearest(&self, key: &str, lat: f64, lon: f64) -> Result<Option<Hospital>, GeoError> {
        let response = self
            .google
            .get(&self.config.google_places_url)
            .query(&[
                ("query", "hospital".to_string()),
                ("location", format!("{lat},{lon}")),
                ("radius", self.config.radius_m.to_string()),
                ("key", key.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<PlacesResponse>()
            .await?;

        hospital_from_places(lat, lon, response)
    }

    async fn overpass_nearest(&self, lat: f64, lon: f64) -> Result<HospitalLookup, GeoError> {
        let response = self
            .overpass
            .post(&self.config.overpass_url)
            .body(overpass_query(lat, lon, self.config.radius_m))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeoError::Service(format!("Overpass returned {}", response.status())));
        }

        let data = response.json::<OverpassResponse>().await?;
        if data.elements.is_empty() {
            return Ok(HospitalLookup::NotFound {
                reason: format!("No hospital found within {} km", self.config.radius_m / 1000),
            });
        }

        match nearest_element(lat, lon, &data.elements) {
            Some((element, distance)) => match hospital_from_element(element, distance)? {
                Some(hospital) => Ok(HospitalLookup::Found(hospital)),
                None => Ok(HospitalLookup::NotFound {
                    reason: "No valid hospital data found".to_string(),
                }),
            },
            None => Ok(HospitalLookup::NotFound {
                reason: "No valid hospital data found".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(lat: Option<f64>, lon: Option<f64>, name: &str) -> OverpassElement {
        OverpassElement {
            lat,
            lon,
            tags: HashMap::from([("name".to_string(), name.to_string())]),
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        let paris_london = haversine_km(48.8566, 2.3522, 51.5074, -0.1278);
        assert!((paris_london - 343.5).abs() < 1.0, "got {paris_london}");
        assert_eq!(haversine_km(10.0, 20.0, 10.0, 20.0), 0.0);
    }

    #[test]
    fn test_nearest_element_skips_missing_coordinates() {
        let elements = vec![
            element(None, Some(77.0), "No lat"),
            element(Some(28.70), Some(77.10), "Far"),
            element(Some(28.61), Some(77.21), "Near"),
        ];
        let (nearest, distance) = nearest_element(28.61, 77.20, &elements).unwrap();
        assert_eq!(nearest.tags["name"], "Near");
        assert!(distance < 1.5);

        assert!(nearest_element(0.0, 0.0, &[element(None, None, "x")]).is_none());
    }

    #[test]
    fn test_overpass_query_format() {
        assert_eq!(
            overpass_query(12.5, 77.25, 5000),
            "[out:json];node[\"amenity\"=\"hospital\"](around:5000,12.5,77.25);out;"
        );
    }

    #[test]
    fn test_directions_url() {
        let url = directions_url(12.5, 77.25).unwrap();
        assert_eq!(url.host_str(), Some("www.google.com"));
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["destination"], "12.5,77.25");
        assert_eq!(params["travelmode"], "driving");
    }

    #[test]
    fn test_places_response_parsing() {
        let ok: PlacesResponse = serde_json::from_str(
            r#"{"status": "OK", "results": [{"name": "City Hospital", "formatted_address": "1 Main St",
                "place_id": "abc123", "geometry": {"location": {"lat": 12.51, "lng": 77.25}}}]}"#,
        )
        .unwrap();
        let hospital = hospital_from_places(12.5, 77.25, ok).unwrap().unwrap();
        assert_eq!(hospital.name, "City Hospital");
        assert_eq!(hospital.source, HospitalSource::GooglePlaces);
        assert!(hospital.maps_url.contains("place_id%3Aabc123"));
        assert!((hospital.distance_km - 1.11).abs() < 0.01);

        let denied: PlacesResponse =
            serde_json::from_str(r#"{"status": "REQUEST_DENIED", "error_message": "bad key"}"#).unwrap();
        assert!(matches!(hospital_from_places(0.0, 0.0, denied), Err(GeoError::Service(_))));

        let empty: PlacesResponse = serde_json::from_str(r#"{"status": "OK", "results": []}"#).unwrap();
        assert!(hospital_from_places(0.0, 0.0, empty).unwrap().is_none());
    }

    #[test]
    fn test_element_without_name_or_address() {
        let bare = OverpassElement {
            lat: Some(1.0),
            lon: Some(2.0),
            tags: HashMap::new(),
        };
        let hospital = hospital_from_element(&bare, 0.5).unwrap().unwrap();
        assert_eq!(hospital.name, "Unnamed Hospital");
        assert_eq!(hospital.address, "");
        assert!(hospital.city.is_none());
    }

    #[tokio::test]
    async fn test_rejects_invalid_coordinates() {
        let locator = HospitalLocator::new(GeoConfig::default()).unwrap();
        let err = locator.nearest(95.0, 0.0).await.unwrap_err();
        assert!(matches!(err, GeoError::InvalidCoordinates { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_services_surface_http_error() {
        let locator = HospitalLocator::new(GeoConfig {
            google_api_key: Some("key".to_string()),
            google_places_url: "http://127.0.0.1:9/places".to_string(),
            overpass_url: "http://127.0.0.1:9/interpreter".to_string(),
            google_timeout_secs: 1,
            overpass_timeout_secs: 1,
            ..Default::default()
        })
        .unwrap();

        let err = locator.nearest(12.5, 77.25).await.unwrap_err();
        assert!(matches!(err, GeoError::Http(_)));
    }
}
