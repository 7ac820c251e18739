//! Custom parameter decoding
//!
//! Reservation events carry a JSON-encoded string of free-form parameters.
//! A missing, malformed or non-object blob decodes to an empty map; callers
//! treat that the same as "parameter not present".

use serde_json::{Map, Value};
use tracing::warn;

/// Decoded custom parameters
pub type CustomParameters = Map<String, Value>;

/// Key holding the requested VLAN
pub const VLAN_NAME_KEY: &str = "vlan_name";

/// Parse the `customParameters` string of an event
///
/// Never fails: anything that is not a JSON object yields an empty map.
pub fn parse_custom_parameters(raw: Option<&str>) -> CustomParameters {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return CustomParameters::new();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(params)) => params,
        Ok(other) => {
            warn!("Ignoring customParameters that are not a JSON object: {}", other);
            CustomParameters::new()
        }
        Err(e) => {
            warn!("Error parsing customParameters: {}", e);
            CustomParameters::new()
        }
    }
}

/// Look up a single parameter
pub fn get_custom_parameter<'a>(params: &'a CustomParameters, key: &str) -> Option<&'a Value> {
    params.get(key)
}

/// Whether the blob decodes to a non-empty parameter map
pub fn has_custom_parameters(raw: Option<&str>) -> bool {
    !parse_custom_parameters(raw).is_empty()
}

/// Extract `vlan_name` from the `customParameters` string
///
/// Strings are returned trimmed and numbers are rendered as text, so both
/// `"vlan_name": "100"` and `"vlan_name": 100` yield `"100"`. Empty values and
/// any other JSON type yield `None`.
pub fn get_vlan_name_from_custom_params(raw: Option<&str>) -> Option<String> {
    let params = parse_custom_parameters(raw);
    let value = match get_custom_parameter(&params, VLAN_NAME_KEY)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    (!value.is_empty()).then_some(value)
}
