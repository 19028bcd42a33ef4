//! HTTP client for the Places (New) and Routes APIs.

use crate::error::PlacesError;
use crate::tool::{
    AutocompleteArgs, ComputeRouteArgs, GeocodeArgs, NearbySearchArgs, ReverseGeocodeArgs,
    TextSearchArgs,
};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue, json};
use std::time::Duration;
use tracing::{debug, instrument};

const SEARCH_FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,\
places.location,places.rating,places.userRatingCount,places.priceLevel,places.types,\
places.currentOpeningHours.openNow,places.googleMapsUri";
const GEOCODE_FIELD_MASK: &str =
    "places.id,places.displayName,places.formattedAddress,places.location";
const AUTOCOMPLETE_FIELD_MASK: &str = "suggestions.placePrediction.placeId,\
suggestions.placePrediction.text,suggestions.queryPrediction.text";
const ROUTE_FIELD_MASK: &str = "routes.duration,routes.distanceMeters,routes.localizedValues,\
routes.legs.steps.navigationInstruction";

/// Radius of the circle searched when reverse geocoding.
const REVERSE_GEOCODE_RADIUS_METERS: f64 = 50.0;

/// Configuration for the Places client.
#[derive(Debug, Clone, Deserialize)]
pub struct PlacesConfig {
    /// API key sent as `X-Goog-Api-Key`.
    pub api_key: String,
    #[serde(default = "default_places_base_url")]
    pub places_base_url: String,
    #[serde(default = "default_routes_base_url")]
    pub routes_base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Radius used when a search call gives none.
    #[serde(default = "default_radius_meters")]
    pub default_radius_meters: f64,
}

fn default_places_base_url() -> String {
    "https://places.googleapis.com".to_string()
}

fn default_routes_base_url() -> String {
    "https://routes.googleapis.com".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

fn default_radius_meters() -> f64 {
    1_000.0
}

impl PlacesConfig {
    /// Creates a configuration with the public endpoints.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            places_base_url: default_places_base_url(),
            routes_base_url: default_routes_base_url(),
            timeout_seconds: default_timeout_seconds(),
            default_radius_meters: default_radius_meters(),
        }
    }

    /// Sends both APIs to `base_url` (for testing).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.places_base_url.clone_from(&base_url);
        self.routes_base_url = base_url;
        self
    }
}

/// Places and Routes client.
///
/// Each method issues exactly one POST and returns the upstream body untouched.
#[derive(Debug, Clone)]
pub struct PlacesClient {
    client: reqwest::Client,
    api_key: String,
    places_base_url: String,
    routes_base_url: String,
    default_radius_meters: f64,
}

impl PlacesClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: PlacesConfig) -> Result<Self, PlacesError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| PlacesError::InvalidConfig {
                reason: e.to_string(),
            })?;
        Ok(Self::with_http_client(config, client))
    }

    /// Creates a client over an existing HTTP client; `timeout_seconds` is ignored.
    #[must_use]
    pub fn with_http_client(config: PlacesConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            api_key: config.api_key,
            places_base_url: config.places_base_url.trim_end_matches('/').to_string(),
            routes_base_url: config.routes_base_url.trim_end_matches('/').to_string(),
            default_radius_meters: config.default_radius_meters,
        }
    }

    /// Searches places of the given types around a point.
    pub async fn nearby_search(&self, args: &NearbySearchArgs) -> Result<JsonValue, PlacesError> {
        let mut body = Map::new();
        body.insert(
            "locationRestriction".to_string(),
            circle(
                args.latitude,
                args.longitude,
                args.radius.unwrap_or(self.default_radius_meters),
            ),
        );
        insert_some(&mut body, "includedTypes", args.included_types.as_ref());
        insert_some(&mut body, "maxResultCount", args.max_result_count);

        self.post_places("places:searchNearby", SEARCH_FIELD_MASK, body)
            .await
    }

    /// Searches places matching free text, biased around a point when given.
    pub async fn text_search(&self, args: &TextSearchArgs) -> Result<JsonValue, PlacesError> {
        let mut body = Map::new();
        insert_some(&mut body, "textQuery", args.query.as_ref());
        if args.latitude.is_some() && args.longitude.is_some() {
            body.insert(
                "locationBias".to_string(),
                circle(
                    args.latitude,
                    args.longitude,
                    args.radius.unwrap_or(self.default_radius_meters),
                ),
            );
        }

        self.post_places("places:searchText", SEARCH_FIELD_MASK, body)
            .await
    }

    /// Resolves an address to its best matching place.
    pub async fn geocode(&self, args: &GeocodeArgs) -> Result<JsonValue, PlacesError> {
        let mut body = Map::new();
        insert_some(&mut body, "textQuery", args.address.as_ref());
        body.insert("pageSize".to_string(), json!(1));

        self.post_places("places:searchText", GEOCODE_FIELD_MASK, body)
            .await
    }

    /// Finds the place closest to a point.
    pub async fn reverse_geocode(
        &self,
        args: &ReverseGeocodeArgs,
    ) -> Result<JsonValue, PlacesError> {
        let mut body = Map::new();
        body.insert(
            "locationRestriction".to_string(),
            circle(args.latitude, args.longitude, REVERSE_GEOCODE_RADIUS_METERS),
        );
        body.insert("rankPreference".to_string(), json!("DISTANCE"));
        body.insert("maxResultCount".to_string(), json!(1));

        self.post_places("places:searchNearby", GEOCODE_FIELD_MASK, body)
            .await
    }

    /// Suggests places and queries for partial input.
    pub async fn autocomplete(&self, args: &AutocompleteArgs) -> Result<JsonValue, PlacesError> {
        let mut body = Map::new();
        insert_some(&mut body, "input", args.input.as_ref());
        if args.latitude.is_some() && args.longitude.is_some() {
            body.insert(
                "locationBias".to_string(),
                circle(
                    args.latitude,
                    args.longitude,
                    args.radius.unwrap_or(self.default_radius_meters),
                ),
            );
        }

        self.post_places("places:autocomplete", AUTOCOMPLETE_FIELD_MASK, body)
            .await
    }

    /// Computes a route between two waypoints.
    pub async fn compute_route(&self, args: &ComputeRouteArgs) -> Result<JsonValue, PlacesError> {
        let mut body = Map::new();
        insert_some(
            &mut body,
            "origin",
            waypoint(
                args.origin.as_deref(),
                args.origin_latitude,
                args.origin_longitude,
            ),
        );
        insert_some(
            &mut body,
            "destination",
            waypoint(
                args.destination.as_deref(),
                args.destination_latitude,
                args.destination_longitude,
            ),
        );
        insert_some(&mut body, "travelMode", args.travel_mode.as_ref());

        let url = format!("{}/directions/v2:computeRoutes", self.routes_base_url);
        self.post("directions/v2:computeRoutes", url, ROUTE_FIELD_MASK, body)
            .await
    }

    async fn post_places(
        &self,
        endpoint: &'static str,
        field_mask: &str,
        body: Map<String, JsonValue>,
    ) -> Result<JsonValue, PlacesError> {
        let url = format!("{}/v1/{endpoint}", self.places_base_url);
        self.post(endpoint, url, field_mask, body).await
    }

    #[instrument(skip(self, url, field_mask, body))]
    async fn post(
        &self,
        endpoint: &'static str,
        url: String,
        field_mask: &str,
        body: Map<String, JsonValue>,
    ) -> Result<JsonValue, PlacesError> {
        let response = self
            .client
            .post(url)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", field_mask)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlacesError::Request {
                endpoint,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlacesError::Status {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .json::<JsonValue>()
            .await
            .map_err(|e| PlacesError::Decode {
                endpoint,
                reason: e.to_string(),
            })?;
        debug!(status = status.as_u16(), "places call succeeded");
        Ok(body)
    }
}

fn insert_some<T: serde::Serialize>(body: &mut Map<String, JsonValue>, key: &str, value: Option<T>) {
    if let Some(value) = value.and_then(|v| serde_json::to_value(v).ok()) {
        body.insert(key.to_string(), value);
    }
}

/// A `{ circle: { center, radius } }` area. Missing coordinates are left out.
fn circle(latitude: Option<f64>, longitude: Option<f64>, radius: f64) -> JsonValue {
    let mut center = Map::new();
    insert_some(&mut center, "latitude", latitude);
    insert_some(&mut center, "longitude", longitude);
    json!({
        "circle": {
            "center": center,
            "radius": radius,
        }
    })
}

/// A Routes waypoint: the address when given, else the coordinates.
fn waypoint(address: Option<&str>, latitude: Option<f64>, longitude: Option<f64>) -> Option<JsonValue> {
    match (address, latitude, longitude) {
        (Some(address), _, _) => Some(json!({ "address": address })),
        (None, Some(latitude), Some(longitude)) => Some(json!({
            "location": {
                "latLng": { "latitude": latitude, "longitude": longitude }
            }
        })),
        _ => None,
    }
}
