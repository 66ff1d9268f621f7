// handlers/protected/utils.rs - helpers shared by the protected handlers

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{FieldError, PageQuery, PageRequest};

pub fn page_request(state: &AppState, query: &PageQuery) -> Result<PageRequest, ApiError> {
    PageRequest::from_query(query, &state.config.pagination)
}

/// Single-field validation failure
pub fn field_error(field: &str, message: impl Into<String>) -> ApiError {
    ApiError::validation(vec![FieldError::new(field, message)])
}

/// Optional optimistic-concurrency token carried in a PUT body
pub fn expected_version(body: &Value) -> Result<Option<u32>, ApiError> {
    match body.get("version") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n >= 1)
            .map(Some)
            .ok_or_else(|| field_error("version", "version must be a positive integer")),
    }
}

/// Overlay the `allowed` fields present in `patch` onto `current`.
/// Fields outside `allowed` and explicit nulls are ignored.
pub fn apply_patch<T>(current: &T, patch: &Value, allowed: &[&str]) -> Result<T, ApiError>
where
    T: Serialize + DeserializeOwned,
{
    let mut merged = serde_json::to_value(current)
        .map_err(|e| ApiError::internal("Failed to prepare update", e))?;

    if let (Value::Object(target), Value::Object(changes)) = (&mut merged, patch) {
        for field in allowed {
            match changes.get(*field) {
                None | Some(Value::Null) => {}
                Some(value) => {
                    target.insert(field.to_string(), value.clone());
                }
            }
        }
    }

    serde_json::from_value(merged).map_err(|e| ApiError::invalid_json(format!("Malformed payload: {}", e)))
}

/// Case-insensitive substring match for `?search=`
pub fn matches_search(haystack: &str, needle: Option<&str>) -> bool {
    match needle.map(str::trim).filter(|n| !n.is_empty()) {
        None => true,
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
    }
}

/// Parse an enum filter such as `?status=在读` by its wire label
pub fn parse_label<T: DeserializeOwned>(field: &str, raw: Option<&str>) -> Result<Option<T>, ApiError> {
    match raw.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(None),
        Some(label) => serde_json::from_value(Value::String(label.to_string()))
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("Unknown {} filter '{}'", field, label))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Row {
        id: i64,
        name: String,
        class_id: Option<i64>,
    }

    #[test]
    fn patch_only_touches_allowed_fields() {
        let row = Row { id: 1, name: "a".into(), class_id: Some(2) };
        let patched = apply_patch(&row, &json!({ "id": 9, "name": "b", "classId": null }), &["name", "classId"]).unwrap();
        assert_eq!(patched, Row { id: 1, name: "b".into(), class_id: Some(2) });
    }

    #[test]
    fn version_must_be_positive_integer() {
        assert_eq!(expected_version(&json!({})).unwrap(), None);
        assert_eq!(expected_version(&json!({ "version": 3 })).unwrap(), Some(3));
        assert!(expected_version(&json!({ "version": 0 })).is_err());
        assert!(expected_version(&json!({ "version": "3" })).is_err());
    }

    #[test]
    fn search_is_case_insensitive() {
        assert!(matches_search("Sunflower", Some("sun")));
        assert!(matches_search("anything", Some("  ")));
        assert!(!matches_search("Sunflower", Some("moon")));
    }
}
