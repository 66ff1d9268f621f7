//! Field-rule table validation for request bodies.
//!
//! Handlers declare a `const` table of [`FieldRule`]s and run the raw JSON body
//! through [`validate`] (create) or [`validate_partial`] (update) before
//! deserializing it into a typed payload. Every failing field produces one
//! [`FieldError`]; nothing short-circuits.

pub mod pagination;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

pub use pagination::{paginate, Page, PageQuery, PageRequest, Pagination};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// `YYYY-MM-DD`
    Date,
    /// RFC 3339
    DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temporal {
    NotFuture,
    NotPast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Email,
    /// Mainland mobile number: 11 digits starting with 1
    Phone,
}

/// One row of a validation table. For strings `min`/`max` bound the length in
/// characters, for numbers the value itself.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub required: bool,
    pub kind: FieldType,
    pub one_of: Option<&'static [&'static str]>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub positive: bool,
    pub temporal: Option<Temporal>,
    pub format: Option<Format>,
}

impl FieldRule {
    pub const fn required(field: &'static str, kind: FieldType) -> Self {
        Self {
            field,
            required: true,
            kind,
            one_of: None,
            min: None,
            max: None,
            positive: false,
            temporal: None,
            format: None,
        }
    }

    pub const fn optional(field: &'static str, kind: FieldType) -> Self {
        Self {
            required: false,
            ..Self::required(field, kind)
        }
    }

    pub const fn one_of(self, values: &'static [&'static str]) -> Self {
        Self {
            one_of: Some(values),
            ..self
        }
    }

    pub const fn range(self, min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            ..self
        }
    }

    pub const fn min(self, min: f64) -> Self {
        Self {
            min: Some(min),
            ..self
        }
    }

    pub const fn max(self, max: f64) -> Self {
        Self {
            max: Some(max),
            ..self
        }
    }

    /// Strictly greater than zero
    pub const fn positive(self) -> Self {
        Self {
            positive: true,
            ..self
        }
    }

    pub const fn not_future(self) -> Self {
        Self {
            temporal: Some(Temporal::NotFuture),
            ..self
        }
    }

    pub const fn not_past(self) -> Self {
        Self {
            temporal: Some(Temporal::NotPast),
            ..self
        }
    }

    pub const fn format(self, format: Format) -> Self {
        Self {
            format: Some(format),
            ..self
        }
    }
}

/// Validate a create payload: required fields must be present
pub fn validate(rules: &[FieldRule], input: &Value, now: DateTime<Utc>) -> Result<(), Vec<FieldError>> {
    run(rules, input, now, true)
}

/// Validate an update payload: only the fields that are present are checked
pub fn validate_partial(
    rules: &[FieldRule],
    input: &Value,
    now: DateTime<Utc>,
) -> Result<(), Vec<FieldError>> {
    run(rules, input, now, false)
}

/// Validate then deserialize. Validation failures become a 400 with details.
pub fn parse<T: DeserializeOwned>(rules: &[FieldRule], input: Value) -> Result<T, ApiError> {
    validate(rules, &input, Utc::now()).map_err(ApiError::validation)?;
    from_validated(input)
}

/// Partial-update flavour of [`parse`]
pub fn parse_partial<T: DeserializeOwned>(rules: &[FieldRule], input: Value) -> Result<T, ApiError> {
    validate_partial(rules, &input, Utc::now()).map_err(ApiError::validation)?;
    from_validated(input)
}

fn from_validated<T: DeserializeOwned>(input: Value) -> Result<T, ApiError> {
    serde_json::from_value(input).map_err(|e| ApiError::invalid_json(format!("Malformed payload: {}", e)))
}

/// Cross-field check shared by activities and schedule entries
pub fn ensure_time_order(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    end_field: &str,
) -> Result<(), ApiError> {
    if end <= start {
        return Err(ApiError::Validation {
            message: "End time must be after start time".to_string(),
            details: vec![FieldError::new(end_field, "End time must be after start time")],
        });
    }
    Ok(())
}

fn run(rules: &[FieldRule], input: &Value, now: DateTime<Utc>, enforce_required: bool) -> Result<(), Vec<FieldError>> {
    let object = match input {
        Value::Object(map) => map,
        _ => return Err(vec![FieldError::new("body", "Request body must be a JSON object")]),
    };

    let errors: Vec<FieldError> = rules
        .iter()
        .filter_map(|rule| check_field(rule, object, now, enforce_required))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!("Validation rejected {} field(s)", errors.len());
        Err(errors)
    }
}

fn check_field(
    rule: &FieldRule,
    object: &Map<String, Value>,
    now: DateTime<Utc>,
    enforce_required: bool,
) -> Option<FieldError> {
    let field = rule.field;
    let fail = |message: String| Some(FieldError::new(field, message));

    let value = match object.get(field) {
        None | Some(Value::Null) => {
            return if rule.required && enforce_required {
                fail(format!("{} is required", field))
            } else {
                None
            };
        }
        Some(value) => value,
    };

    match rule.kind {
        FieldType::String => {
            let Some(s) = value.as_str() else {
                return fail(format!("{} must be a string", field));
            };
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return fail(format!("{} cannot be empty", field));
            }
            let len = trimmed.chars().count() as f64;
            if let Some(min) = rule.min {
                if len < min {
                    return fail(format!("{} must be at least {} characters", field, min));
                }
            }
            if let Some(max) = rule.max {
                if len > max {
                    return fail(format!("{} must be at most {} characters", field, max));
                }
            }
            if let Some(allowed) = rule.one_of {
                if !allowed.contains(&trimmed) {
                    return fail(format!("{} must be one of: {}", field, allowed.join(", ")));
                }
            }
            match rule.format {
                Some(Format::Email) if !is_email(trimmed) => {
                    fail(format!("{} must be a valid email address", field))
                }
                Some(Format::Phone) if !is_phone(trimmed) => {
                    fail(format!("{} must be a valid phone number", field))
                }
                _ => None,
            }
        }
        FieldType::Integer => {
            let Some(n) = as_integer(value) else {
                return fail(format!("{} must be an integer", field));
            };
            check_range(rule, n as f64)
        }
        FieldType::Number => {
            let Some(n) = as_number(value) else {
                return fail(format!("{} must be a number", field));
            };
            check_range(rule, n)
        }
        FieldType::Boolean => {
            if value.is_boolean() {
                None
            } else {
                fail(format!("{} must be a boolean", field))
            }
        }
        FieldType::Date => {
            let parsed = value
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
            let Some(date) = parsed else {
                return fail(format!("{} must be a date in YYYY-MM-DD format", field));
            };
            let today = now.date_naive();
            match rule.temporal {
                Some(Temporal::NotFuture) if date > today => {
                    fail(format!("{} cannot be in the future", field))
                }
                Some(Temporal::NotPast) if date < today => {
                    fail(format!("{} cannot be in the past", field))
                }
                _ => None,
            }
        }
        FieldType::DateTime => {
            let parsed = value
                .as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc));
            let Some(instant) = parsed else {
                return fail(format!("{} must be an RFC 3339 date-time", field));
            };
            match rule.temporal {
                Some(Temporal::NotFuture) if instant > now => {
                    fail(format!("{} cannot be in the future", field))
                }
                Some(Temporal::NotPast) if instant < now => {
                    fail(format!("{} cannot be in the past", field))
                }
                _ => None,
            }
        }
    }
}

fn check_range(rule: &FieldRule, n: f64) -> Option<FieldError> {
    let field = rule.field;
    if rule.positive && n <= 0.0 {
        return Some(FieldError::new(field, format!("{} must be greater than 0", field)));
    }
    match (rule.min, rule.max) {
        (Some(min), Some(max)) if n < min || n > max => Some(FieldError::new(
            field,
            format!("{} must be between {} and {}", field, min, max),
        )),
        (Some(min), None) if n < min => {
            Some(FieldError::new(field, format!("{} must be at least {}", field, min)))
        }
        (None, Some(max)) if n > max => {
            Some(FieldError::new(field, format!("{} must be at most {}", field, max)))
        }
        _ => None,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        _ => None,
    }
}

/// Numbers may arrive as JSON numbers or numeric strings (money fields)
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn is_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !s.contains(char::is_whitespace)
}

fn is_phone(s: &str) -> bool {
    s.len() == 11 && s.starts_with('1') && s.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    const STUDENT: &[FieldRule] = &[
        FieldRule::required("name", FieldType::String).max(50.0),
        FieldRule::required("gender", FieldType::String).one_of(&["男", "女"]),
        FieldRule::required("birthDate", FieldType::Date).not_future(),
        FieldRule::optional("classId", FieldType::Integer).min(1.0),
    ];

    const MODEL: &[FieldRule] = &[
        FieldRule::required("rating", FieldType::Integer).range(1.0, 5.0),
        FieldRule::optional("importance", FieldType::Number).range(0.0, 1.0),
        FieldRule::optional("temperature", FieldType::Number).range(0.0, 2.0),
        FieldRule::optional("amount", FieldType::Number).positive(),
    ];

    fn fields(errors: &[FieldError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn one_detail_per_missing_field() {
        let errors = validate(STUDENT, &json!({}), Utc::now()).unwrap_err();
        assert_eq!(fields(&errors), vec!["name", "gender", "birthDate"]);
        assert!(errors.iter().all(|e| e.message.ends_with("is required")));
    }

    #[test]
    fn partial_validation_ignores_absent_fields() {
        assert!(validate_partial(STUDENT, &json!({ "name": "小明" }), Utc::now()).is_ok());
        let errors = validate_partial(STUDENT, &json!({ "gender": "male" }), Utc::now()).unwrap_err();
        assert_eq!(fields(&errors), vec!["gender"]);
    }

    #[test]
    fn whitespace_strings_are_empty() {
        let input = json!({ "name": "   ", "gender": "女", "birthDate": "2021-03-01" });
        let errors = validate(STUDENT, &input, Utc::now()).unwrap_err();
        assert_eq!(errors[0].message, "name cannot be empty");
    }

    #[test]
    fn future_birth_dates_are_rejected() {
        let tomorrow = (Utc::now() + Duration::days(1)).format("%Y-%m-%d").to_string();
        let input = json!({ "name": "小红", "gender": "女", "birthDate": tomorrow });
        let errors = validate(STUDENT, &input, Utc::now()).unwrap_err();
        assert_eq!(errors, vec![FieldError::new("birthDate", "birthDate cannot be in the future")]);

        let garbled = json!({ "name": "小红", "gender": "女", "birthDate": "2021/03/01" });
        assert!(validate(STUDENT, &garbled, Utc::now()).is_err());
    }

    #[test]
    fn numeric_ranges_are_inclusive() {
        let ok = json!({ "rating": 5, "importance": 0, "temperature": 2.0, "amount": "0.01" });
        assert!(validate(MODEL, &ok, Utc::now()).is_ok());

        let bad = json!({ "rating": 6, "importance": 1.5, "temperature": -0.1, "amount": 0 });
        let errors = validate(MODEL, &bad, Utc::now()).unwrap_err();
        assert_eq!(fields(&errors), vec!["rating", "importance", "temperature", "amount"]);
        assert_eq!(errors[0].message, "rating must be between 1 and 5");
        assert_eq!(errors[3].message, "amount must be greater than 0");
    }

    #[test]
    fn integers_reject_fractions_and_strings() {
        assert!(validate(MODEL, &json!({ "rating": 2.5 }), Utc::now()).is_err());
        assert!(validate(MODEL, &json!({ "rating": "3" }), Utc::now()).is_err());
        assert!(validate(MODEL, &json!({ "rating": 3.0 }), Utc::now()).is_ok());
    }

    #[test]
    fn non_object_bodies_are_rejected() {
        let errors = validate(STUDENT, &json!([1, 2]), Utc::now()).unwrap_err();
        assert_eq!(errors[0].field, "body");
    }

    #[test]
    fn formats() {
        assert!(is_email("parent@example.com"));
        assert!(!is_email("parent@example"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("a b@example.com"));
        assert!(is_phone("13800138000"));
        assert!(!is_phone("23800138000"));
        assert!(!is_phone("1380013800"));
    }

    #[test]
    fn time_order_requires_strictly_later_end() {
        let start = Utc::now();
        assert!(ensure_time_order(start, start + Duration::hours(1), "endTime").is_ok());
        let err = ensure_time_order(start, start, "endTime").unwrap_err();
        assert_eq!(err.message(), "End time must be after start time");
    }
}
