//! Geocoding and great-circle distance

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Earth radius in miles
pub const EARTH_RADIUS_MILES: f64 = 3963.0;

/// GeoJSON point with the address it was resolved from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zipcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Location {
    pub fn point(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [longitude, latitude],
            formatted_address: None,
            street: None,
            city: None,
            state: None,
            zipcode: None,
            country: None,
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

/// Central angle between two points, in radians
pub fn haversine(a: &Location, b: &Location) -> f64 {
    let (lat1, lat2) = (a.latitude().to_radians(), b.latitude().to_radians());
    let dlat = lat2 - lat1;
    let dlng = (b.longitude() - a.longitude()).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

/// Whether `point` lies within `miles` of `center`
pub fn within_radius(center: &Location, point: &Location, miles: f64) -> bool {
    haversine(center, point) <= miles / EARTH_RADIUS_MILES
}

/// Resolves addresses and zipcodes to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Option<Location>;

    async fn geocode_zipcode(&self, zipcode: &str) -> Option<Location>;
}

/// One row of a static zipcode table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZipcodeEntry {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Geocoder backed by a fixed zipcode table
///
/// An address resolves when one of its words is a known zipcode.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    zipcodes: HashMap<String, ZipcodeEntry>,
}

impl StaticGeocoder {
    pub fn new(zipcodes: HashMap<String, ZipcodeEntry>) -> Self {
        Self { zipcodes }
    }

    fn locate(&self, zipcode: &str) -> Option<Location> {
        let entry = self.zipcodes.get(zipcode)?;
        let mut location = Location::point(entry.longitude, entry.latitude);
        location.zipcode = Some(zipcode.to_string());
        location.city = entry.city.clone();
        location.state = entry.state.clone();
        location.country = entry.country.clone();
        Some(location)
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn geocode(&self, address: &str) -> Option<Location> {
        let mut location = address
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|word| !word.is_empty())
            .find_map(|word| self.locate(word))?;

        location.formatted_address = Some(address.trim().to_string());
        location.street = address
            .split(',')
            .next()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Some(location)
    }

    async fn geocode_zipcode(&self, zipcode: &str) -> Option<Location> {
        self.locate(zipcode.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boston() -> ZipcodeEntry {
        ZipcodeEntry {
            latitude: 42.3601,
            longitude: -71.0589,
            city: Some("Boston".into()),
            state: Some("MA".into()),
            country: Some("US".into()),
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        let boston = Location::point(-71.0589, 42.3601);
        let providence = Location::point(-71.4128, 41.824);
        let miles = haversine(&boston, &providence) * EARTH_RADIUS_MILES;
        assert!((miles - 41.0).abs() < 2.0, "got {miles}");

        assert!(within_radius(&boston, &providence, 50.0));
        assert!(!within_radius(&boston, &providence, 30.0));
    }

    #[tokio::test]
    async fn test_static_geocoder_resolves_address() {
        let geocoder = StaticGeocoder::new(HashMap::from([("02118".to_string(), boston())]));

        let location = geocoder
            .geocode("233 Bay State Rd, Boston MA 02118")
            .await
            .unwrap();
        assert_eq!(location.kind, "Point");
        assert_eq!(location.coordinates, [-71.0589, 42.3601]);
        assert_eq!(location.street.as_deref(), Some("233 Bay State Rd"));
        assert_eq!(location.zipcode.as_deref(), Some("02118"));

        assert!(geocoder.geocode("nowhere 99999").await.is_none());
        assert!(geocoder.geocode_zipcode("02118").await.is_some());
    }
}
