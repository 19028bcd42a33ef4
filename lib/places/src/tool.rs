//! Places tools as the assistant calls them.
//!
//! Every argument is optional. Absent arguments are left out of the
//! upstream request and the Places API decides whether that is an error.

use crate::error::ToolParseError;
use persona_gateway_conversation::ToolCall;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

pub const NEARBY_SEARCH: &str = "nearby_search";
pub const TEXT_SEARCH: &str = "text_search";
pub const GEOCODE: &str = "geocode";
pub const REVERSE_GEOCODE: &str = "reverse_geocode";
pub const AUTOCOMPLETE: &str = "autocomplete";
pub const COMPUTE_ROUTE: &str = "compute_route";

/// Arguments of `nearby_search`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NearbySearchArgs {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Search radius in meters.
    pub radius: Option<f64>,
    /// Place types such as `restaurant` or `sushi_restaurant`.
    pub included_types: Option<Vec<String>>,
    pub max_result_count: Option<u32>,
}

/// Arguments of `text_search`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TextSearchArgs {
    pub query: Option<String>,
    /// Biases results around this point when both coordinates are present.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
}

/// Arguments of `geocode`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeocodeArgs {
    pub address: Option<String>,
}

/// Arguments of `reverse_geocode`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReverseGeocodeArgs {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Arguments of `autocomplete`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AutocompleteArgs {
    pub input: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius: Option<f64>,
}

/// Arguments of `compute_route`.
///
/// Each end is an address or place name, or a coordinate pair when the
/// address is absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ComputeRouteArgs {
    pub origin: Option<String>,
    pub origin_latitude: Option<f64>,
    pub origin_longitude: Option<f64>,
    pub destination: Option<String>,
    pub destination_latitude: Option<f64>,
    pub destination_longitude: Option<f64>,
    /// `DRIVE`, `WALK`, `BICYCLE`, `TRANSIT` or `TWO_WHEELER`.
    pub travel_mode: Option<String>,
}

/// A recognised Places tool call with decoded arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum PlacesTool {
    NearbySearch(NearbySearchArgs),
    TextSearch(TextSearchArgs),
    Geocode(GeocodeArgs),
    ReverseGeocode(ReverseGeocodeArgs),
    Autocomplete(AutocompleteArgs),
    ComputeRoute(ComputeRouteArgs),
}

impl PlacesTool {
    /// Every tool name, in schema order.
    pub const NAMES: [&'static str; 6] = [
        NEARBY_SEARCH,
        TEXT_SEARCH,
        GEOCODE,
        REVERSE_GEOCODE,
        AUTOCOMPLETE,
        COMPUTE_ROUTE,
    ];

    /// Parses a tool call.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown tool names and for arguments that are not
    /// a JSON object of the tool's shape.
    pub fn from_call(call: &ToolCall) -> Result<Self, ToolParseError> {
        match call.name.as_str() {
            NEARBY_SEARCH => decode(NEARBY_SEARCH, &call.arguments).map(Self::NearbySearch),
            TEXT_SEARCH => decode(TEXT_SEARCH, &call.arguments).map(Self::TextSearch),
            GEOCODE => decode(GEOCODE, &call.arguments).map(Self::Geocode),
            REVERSE_GEOCODE => decode(REVERSE_GEOCODE, &call.arguments).map(Self::ReverseGeocode),
            AUTOCOMPLETE => decode(AUTOCOMPLETE, &call.arguments).map(Self::Autocomplete),
            COMPUTE_ROUTE => decode(COMPUTE_ROUTE, &call.arguments).map(Self::ComputeRoute),
            other => Err(ToolParseError::Unsupported {
                name: other.to_string(),
            }),
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NearbySearch(_) => NEARBY_SEARCH,
            Self::TextSearch(_) => TEXT_SEARCH,
            Self::Geocode(_) => GEOCODE,
            Self::ReverseGeocode(_) => REVERSE_GEOCODE,
            Self::Autocomplete(_) => AUTOCOMPLETE,
            Self::ComputeRoute(_) => COMPUTE_ROUTE,
        }
    }
}

fn decode<T: DeserializeOwned>(tool: &'static str, arguments: &JsonValue) -> Result<T, ToolParseError> {
    // Some models send `null` instead of `{}` for tools without required arguments.
    let arguments = match arguments {
        JsonValue::Null => JsonValue::Object(serde_json::Map::new()),
        JsonValue::Object(_) => arguments.clone(),
        other => {
            return Err(ToolParseError::InvalidArguments {
                tool,
                reason: format!("expected a JSON object, got {other}"),
            });
        }
    };
    serde_json::from_value(arguments).map_err(|e| ToolParseError::InvalidArguments {
        tool,
        reason: e.to_string(),
    })
}
