//! Checks run on raw configuration documents
//!
//! Validation works on the JSON value before deserialization so that error
//! messages can name the offending field.

use serde_json::{Map, Value};

use super::ConfigError;
use crate::models::{DurationValue, MAX_OCTAVE};
use crate::shortcuts::MappingCategory;

const PREVIEW_SIZES: [&str; 3] = ["small", "medium", "large"];
const THEMES: [&str; 2] = ["light", "dark"];
const RECOVERY_MODES: [&str; 2] = ["strict", "lenient"];

/// Validate a complete or partial configuration document
pub fn validate_config(value: &Value) -> Result<(), ConfigError> {
    let root = value
        .as_object()
        .ok_or_else(|| invalid("configuration must be an object"))?;

    if let Some(mappings) = root.get("keyMappings") {
        validate_key_mappings(mappings)?;
    }
    if let Some(rendering) = root.get("rendering") {
        validate_rendering(section(rendering, "rendering")?)?;
    }
    if let Some(behavior) = root.get("behavior") {
        validate_behavior(section(behavior, "behavior")?)?;
    }
    Ok(())
}

/// `"default"` or an object with all six categories
pub fn validate_key_mappings(value: &Value) -> Result<(), ConfigError> {
    if let Some(token) = value.as_str() {
        if token == "default" {
            return Ok(());
        }
        return Err(invalid(format!(
            "keyMappings must be \"default\" or an object, got \"{}\"",
            token
        )));
    }

    let mappings = section(value, "keyMappings")?;
    for category in MappingCategory::ALL {
        let table = mappings
            .get(category.name())
            .ok_or_else(|| invalid(format!("keyMappings.{} is required", category)))?;
        let table = table
            .as_object()
            .ok_or_else(|| invalid(format!("keyMappings.{} must be an object", category)))?;
        if let Some((key, _)) = table.iter().find(|(_, value)| !value.is_string()) {
            return Err(invalid(format!("keyMappings.{}[\"{}\"] must be a string", category, key)));
        }
    }
    Ok(())
}

fn validate_rendering(rendering: &Map<String, Value>) -> Result<(), ConfigError> {
    one_of(rendering, "rendering.previewSize", "previewSize", &PREVIEW_SIZES)?;
    one_of(rendering, "rendering.theme", "theme", &THEMES)?;
    for flag in ["showKeySignature", "showTimeSignature", "autoScroll", "highlightCurrent"] {
        if let Some(value) = rendering.get(flag) {
            if !value.is_boolean() {
                return Err(invalid(format!("rendering.{} must be a boolean", flag)));
            }
        }
    }
    Ok(())
}

fn validate_behavior(behavior: &Map<String, Value>) -> Result<(), ConfigError> {
    if let Some(value) = behavior.get("undoHistorySize") {
        match value.as_u64() {
            Some(size) if size >= 1 => {}
            _ => return Err(invalid("behavior.undoHistorySize must be an integer >= 1")),
        }
    }

    if let Some(value) = behavior.get("defaultOctave") {
        match value.as_u64() {
            Some(octave) if octave <= MAX_OCTAVE as u64 => {}
            _ => return Err(invalid("behavior.defaultOctave must be between 0 and 8")),
        }
    }

    if let Some(value) = behavior.get("defaultDuration") {
        let known = value.as_str().and_then(DurationValue::from_name).is_some();
        if !known {
            return Err(invalid(format!("behavior.defaultDuration {} is not a known duration", value)));
        }
    }

    one_of(behavior, "behavior.errorRecoveryMode", "errorRecoveryMode", &RECOVERY_MODES)?;

    if let Some(value) = behavior.get("autoCommitDelayMs") {
        if !value.is_null() && value.as_u64().is_none() {
            return Err(invalid("behavior.autoCommitDelayMs must be null or a non-negative integer"));
        }
    }
    for field in ["chordModeTimeoutMs", "debounceDelayMs"] {
        if let Some(value) = behavior.get(field) {
            if value.as_u64().is_none() {
                return Err(invalid(format!("behavior.{} must be a non-negative integer", field)));
            }
        }
    }
    Ok(())
}

/// Merge `right` over `left`, recursing into objects
///
/// Arrays and scalars in `right` replace their counterpart.
pub fn merge_values(left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Object(mut left_map), Value::Object(right_map)) => {
            for (name, right_value) in right_map {
                let merged = match left_map.remove(&name) {
                    Some(left_value) => merge_values(left_value, right_value),
                    None => right_value,
                };
                left_map.insert(name, merged);
            }
            Value::Object(left_map)
        }
        (_, right) => right,
    }
}

fn section<'a>(value: &'a Value, name: &str) -> Result<&'a Map<String, Value>, ConfigError> {
    value
        .as_object()
        .ok_or_else(|| invalid(format!("{} must be an object", name)))
}

fn one_of(map: &Map<String, Value>, path: &str, field: &str, allowed: &[&str]) -> Result<(), ConfigError> {
    let Some(value) = map.get(field) else {
        return Ok(());
    };
    match value.as_str() {
        Some(text) if allowed.contains(&text) => Ok(()),
        _ => Err(invalid(format!("{} must be one of {}, got {}", path, allowed.join("|"), value))),
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_partial_documents_pass() {
        assert!(validate_config(&json!({})).is_ok());
        assert!(validate_config(&json!({ "behavior": { "defaultOctave": 8 } })).is_ok());
        assert!(validate_config(&json!({ "keyMappings": "default" })).is_ok());
    }

    #[test]
    fn test_missing_category_named() {
        let error = validate_key_mappings(&json!({ "durations": {} })).unwrap_err();
        assert_eq!(error.to_string(), "Invalid configuration: keyMappings.pitches is required");
    }

    #[test]
    fn test_enum_and_range_violations() {
        assert!(validate_config(&json!({ "rendering": { "previewSize": "huge" } })).is_err());
        assert!(validate_config(&json!({ "rendering": { "theme": "sepia" } })).is_err());
        assert!(validate_config(&json!({ "behavior": { "undoHistorySize": 0 } })).is_err());
        assert!(validate_config(&json!({ "behavior": { "defaultOctave": 9 } })).is_err());
        assert!(validate_config(&json!({ "behavior": { "defaultDuration": "breve" } })).is_err());
        assert!(validate_config(&json!({ "behavior": { "errorRecoveryMode": "panic" } })).is_err());
        assert!(validate_config(&json!({ "behavior": { "autoCommitDelayMs": -5 } })).is_err());
        assert!(validate_config(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_merge_recurses_into_objects() {
        let merged = merge_values(
            json!({ "behavior": { "defaultOctave": 4, "debounceDelayMs": 100 }, "keyMappings": "default" }),
            json!({ "behavior": { "defaultOctave": 5 }, "keyMappings": { "durations": {} } }),
        );
        assert_eq!(
            merged,
            json!({ "behavior": { "defaultOctave": 5, "debounceDelayMs": 100 }, "keyMappings": { "durations": {} } })
        );
    }
}
