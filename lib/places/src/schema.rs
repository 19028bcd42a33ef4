//! Tool definitions offered to assistants that may use Places.

use crate::tool::{AUTOCOMPLETE, COMPUTE_ROUTE, GEOCODE, NEARBY_SEARCH, REVERSE_GEOCODE, TEXT_SEARCH};
use persona_gateway_conversation::ToolDefinition;
use serde_json::{Value as JsonValue, json};

fn coordinate(description: &str) -> JsonValue {
    json!({"type": "number", "description": description})
}

fn object(properties: JsonValue, required: &[&str]) -> JsonValue {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// The definitions of every Places tool, in dispatch order.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            NEARBY_SEARCH,
            "Find places of given types within a radius of a point.",
        )
        .with_input_schema(object(
            json!({
                "latitude": coordinate("Latitude of the search centre"),
                "longitude": coordinate("Longitude of the search centre"),
                "radius": {"type": "number", "description": "Search radius in meters"},
                "included_types": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Place types, e.g. restaurant, cafe, sushi_restaurant"
                },
                "max_result_count": {"type": "integer", "minimum": 1, "maximum": 20}
            }),
            &["latitude", "longitude"],
        )),
        ToolDefinition::new(
            TEXT_SEARCH,
            "Find places matching a free-text query, optionally near a point.",
        )
        .with_input_schema(object(
            json!({
                "query": {"type": "string", "description": "What to search for"},
                "latitude": coordinate("Latitude to bias results around"),
                "longitude": coordinate("Longitude to bias results around"),
                "radius": {"type": "number", "description": "Bias radius in meters"}
            }),
            &["query"],
        )),
        ToolDefinition::new(GEOCODE, "Resolve an address to coordinates.").with_input_schema(
            object(
                json!({"address": {"type": "string", "description": "Address or place name"}}),
                &["address"],
            ),
        ),
        ToolDefinition::new(
            REVERSE_GEOCODE,
            "Find the address of the place closest to a point.",
        )
        .with_input_schema(object(
            json!({
                "latitude": coordinate("Latitude of the point"),
                "longitude": coordinate("Longitude of the point")
            }),
            &["latitude", "longitude"],
        )),
        ToolDefinition::new(
            AUTOCOMPLETE,
            "Suggest places and queries for partially typed input.",
        )
        .with_input_schema(object(
            json!({
                "input": {"type": "string", "description": "Text typed so far"},
                "latitude": coordinate("Latitude to bias suggestions around"),
                "longitude": coordinate("Longitude to bias suggestions around"),
                "radius": {"type": "number", "description": "Bias radius in meters"}
            }),
            &["input"],
        )),
        ToolDefinition::new(
            COMPUTE_ROUTE,
            "Compute a route between two places with travel time and distance.",
        )
        .with_input_schema(object(
            json!({
                "origin": {"type": "string", "description": "Start address or place name"},
                "origin_latitude": coordinate("Start latitude, when no address is given"),
                "origin_longitude": coordinate("Start longitude, when no address is given"),
                "destination": {"type": "string", "description": "End address or place name"},
                "destination_latitude": coordinate("End latitude, when no address is given"),
                "destination_longitude": coordinate("End longitude, when no address is given"),
                "travel_mode": {
                    "type": "string",
                    "enum": ["DRIVE", "WALK", "BICYCLE", "TRANSIT", "TWO_WHEELER"]
                }
            }),
            &[],
        )),
    ]
}
