//! Scan payload parsing
//!
//! Attendee codes carry a small JSON object such as `{"roll_no": "101"}`.

use serde_json::Value;

/// Field holding the roll identifier
pub const ROLL_FIELD: &str = "roll_no";

/// Extract the roll identifier from decoded QR text.
///
/// Roll identifiers are text, so only a non-empty JSON string is used, and
/// it is used verbatim. Everything else (not JSON, not an object, missing
/// field, numbers, null, empty string) yields `None`.
pub fn parse_roll(raw: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw).ok()?;
    match value.as_object()?.get(ROLL_FIELD)? {
        Value::String(roll) if !roll.is_empty() => Some(roll.clone()),
        _ => None,
    }
}
