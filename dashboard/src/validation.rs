//! Rule-string validation of request payloads.
//!
//! Rules are written the Laravel way, either as one `|` separated string (`"required|email"`)
//! or as a list (`["required", "regex:/^a|b$/"]`, needed when a pattern contains `|`).

use regex::Regex;
use serde_json::{Map, Value};

use crate::{
    errors::{DashboardError, ValidationError, ValidationIssue},
    validators::{is_valid_email, is_valid_url, is_valid_uuid},
};

/// Conversion into a list of raw rule strings.
pub trait IntoRules {
    fn into_rules(self) -> Vec<String>;
}

impl IntoRules for &str {
    fn into_rules(self) -> Vec<String> {
        self.split('|')
            .map(str::trim)
            .filter(|rule| !rule.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl IntoRules for String {
    fn into_rules(self) -> Vec<String> {
        self.as_str().into_rules()
    }
}

impl IntoRules for Vec<String> {
    fn into_rules(self) -> Vec<String> {
        self
    }
}

impl IntoRules for Vec<&str> {
    fn into_rules(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl<const N: usize> IntoRules for [&str; N] {
    fn into_rules(self) -> Vec<String> {
        self.into_iter().map(str::to_string).collect()
    }
}

impl IntoRules for &[&str] {
    fn into_rules(self) -> Vec<String> {
        self.iter().map(|rule| rule.to_string()).collect()
    }
}

#[derive(Debug, Clone)]
pub enum Rule {
    Required,
    Nullable,
    String,
    Numeric,
    Integer,
    Boolean,
    Email,
    Url,
    Uuid,
    Min(f64),
    Max(f64),
    In(Vec<String>),
    Regex(Regex),
}

impl Rule {
    pub fn parse(attribute: &str, raw: &str) -> Result<Self, DashboardError> {
        let invalid = || DashboardError::InvalidRule {
            attribute: attribute.to_string(),
            rule: raw.to_string(),
        };
        let (name, argument) = match raw.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument)),
            None => (raw.trim(), None),
        };
        let rule = match (name, argument) {
            ("required", None) => Self::Required,
            ("nullable", None) => Self::Nullable,
            ("string", None) => Self::String,
            ("numeric", None) => Self::Numeric,
            ("integer", None) => Self::Integer,
            ("boolean", None) => Self::Boolean,
            ("email", None) => Self::Email,
            ("url", None) => Self::Url,
            ("uuid", None) => Self::Uuid,
            ("min", Some(limit)) => Self::Min(parse_limit(limit).ok_or_else(invalid)?),
            ("max", Some(limit)) => Self::Max(parse_limit(limit).ok_or_else(invalid)?),
            ("in", Some(values)) => Self::In(values.split(',').map(|value| value.trim().to_string()).collect()),
            ("regex", Some(pattern)) => Self::Regex(compile_pattern(pattern).ok_or_else(invalid)?),
            _ => return Err(invalid()),
        };
        Ok(rule)
    }
}

fn parse_limit(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|limit| limit.is_finite())
}

/// Accepts `/pattern/` with optional `i`, `m`, `s` or `x` flags, or a bare pattern.
fn compile_pattern(raw: &str) -> Option<Regex> {
    let raw = raw.trim();
    let pattern = match raw.strip_prefix('/').and_then(|rest| rest.rsplit_once('/')) {
        Some((body, "")) => body.to_string(),
        Some((body, flags)) if flags.chars().all(|flag| "imsx".contains(flag)) => format!("(?{flags}){body}"),
        Some(_) => return None,
        None => raw.to_string(),
    };
    Regex::new(&pattern).ok()
}

/// Rules for one attribute.
#[derive(Debug, Clone)]
pub struct AttributeRules {
    pub attribute: String,
    pub rules: Vec<String>,
}

impl AttributeRules {
    pub fn new(attribute: impl Into<String>, rules: Vec<String>) -> Self {
        Self {
            attribute: attribute.into(),
            rules,
        }
    }
}

/// Validates `payload` against every attribute's rules.
///
/// Rules are parsed up front, so a misconfigured rule surfaces as [`DashboardError::InvalidRule`]
/// even when the payload would otherwise pass. Failures are collected into a single
/// [`DashboardError::Validation`].
pub fn validate(payload: &Map<String, Value>, rules: &[AttributeRules]) -> Result<(), DashboardError> {
    let mut parsed = Vec::with_capacity(rules.len());
    for entry in rules {
        let attribute_rules = entry
            .rules
            .iter()
            .map(|raw| Rule::parse(&entry.attribute, raw))
            .collect::<Result<Vec<_>, _>>()?;
        parsed.push((entry.attribute.as_str(), attribute_rules));
    }

    let mut issues = Vec::new();
    for (attribute, rules) in &parsed {
        validate_attribute(attribute, payload.get(*attribute), rules, &mut issues);
    }

    if issues.is_empty() {
        Ok(())
    } else {
        log::debug!("validation failed on {} attribute(s)", issues.len());
        Err(ValidationError::new(issues).into())
    }
}

fn validate_attribute(attribute: &str, value: Option<&Value>, rules: &[Rule], issues: &mut Vec<ValidationIssue>) {
    let display = attribute.replace('_', " ");
    let required = rules.iter().any(|rule| matches!(rule, Rule::Required));

    if required && value.is_none_or(is_blank) {
        issues.push(ValidationIssue::new(
            attribute,
            "validation.required",
            format!("The {display} field is required."),
        ));
        return;
    }

    // Absent attributes only answer to `required`.
    let Some(value) = value else {
        return;
    };

    if value.is_null() && rules.iter().any(|rule| matches!(rule, Rule::Nullable)) {
        return;
    }

    let numeric = rules.iter().any(|rule| matches!(rule, Rule::Numeric | Rule::Integer));

    for rule in rules {
        let failure = match rule {
            Rule::Required | Rule::Nullable => None,
            Rule::String => (!value.is_string()).then(|| ("string", format!("The {display} must be a string."))),
            Rule::Numeric => {
                number_of(value).is_none().then(|| ("numeric", format!("The {display} must be a number.")))
            }
            Rule::Integer => {
                (!is_integer(value)).then(|| ("integer", format!("The {display} must be an integer.")))
            }
            Rule::Boolean => (!is_boolean(value))
                .then(|| ("boolean", format!("The {display} field must be true or false."))),
            Rule::Email => (!value.as_str().is_some_and(is_valid_email))
                .then(|| ("email", format!("The {display} must be a valid email address."))),
            Rule::Url => {
                (!value.as_str().is_some_and(is_valid_url)).then(|| ("url", format!("The {display} format is invalid.")))
            }
            Rule::Uuid => (!value.as_str().is_some_and(is_valid_uuid))
                .then(|| ("uuid", format!("The {display} must be a valid UUID."))),
            Rule::Min(limit) => size_of(value, numeric).filter(|size| size < limit).map(|_| {
                ("min", match value {
                    Value::String(_) if !numeric => format!("The {display} must be at least {limit} characters."),
                    Value::Array(_) => format!("The {display} must have at least {limit} items."),
                    _ => format!("The {display} must be at least {limit}."),
                })
            }),
            Rule::Max(limit) => size_of(value, numeric).filter(|size| size > limit).map(|_| {
                ("max", match value {
                    Value::String(_) if !numeric => {
                        format!("The {display} may not be greater than {limit} characters.")
                    }
                    Value::Array(_) => format!("The {display} may not have more than {limit} items."),
                    _ => format!("The {display} may not be greater than {limit}."),
                })
            }),
            Rule::In(allowed) => (!allowed.iter().any(|candidate| as_plain_string(value).as_deref() == Some(candidate.as_str())))
                .then(|| ("in", format!("The selected {display} is invalid."))),
            Rule::Regex(pattern) => (!value.as_str().is_some_and(|candidate| pattern.is_match(candidate)))
                .then(|| ("regex", format!("The {display} format is invalid."))),
        };
        if let Some((code, message)) = failure {
            issues.push(ValidationIssue::new(attribute, format!("validation.{code}"), message));
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(string) => string.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
        _ => false,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(string) => string.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(number) => number.is_i64() || number.is_u64(),
        Value::String(string) => string.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(number) => matches!(number.as_i64(), Some(0 | 1)),
        Value::String(string) => matches!(string.as_str(), "0" | "1"),
        _ => false,
    }
}

/// Size compared by `min` / `max`: numeric value for numeric attributes, otherwise character
/// count or item count.
fn size_of(value: &Value, numeric: bool) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(string) if numeric => string.trim().parse::<f64>().ok(),
        Value::String(string) => Some(string.chars().count() as f64),
        Value::Array(items) => Some(items.len() as f64),
        _ => None,
    }
}

fn as_plain_string(value: &Value) -> Option<String> {
    match value {
        Value::String(string) => Some(string.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn errors(payload: Value, rules: &[(&str, &str)]) -> Map<String, Value> {
        let rules: Vec<AttributeRules> = rules
            .iter()
            .map(|(attribute, rules)| AttributeRules::new(*attribute, rules.into_rules()))
            .collect();
        match validate(&self::payload(payload), &rules) {
            Ok(()) => Map::new(),
            Err(DashboardError::Validation(err)) => err.messages(),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_attributes_only_check_required() {
        let messages = errors(json!({}), &[("first_name", "required|min:3"), ("email", "email")]);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages["first_name"][0], "The first name field is required.");
    }

    #[test]
    fn blank_strings_fail_required() {
        let messages = errors(json!({"name": "  "}), &[("name", "required")]);
        assert_eq!(messages["name"][0], "The name field is required.");
    }

    #[test]
    fn nullable_skips_remaining_rules() {
        assert!(errors(json!({"email": null}), &[("email", "nullable|email")]).is_empty());
        assert!(!errors(json!({"email": null}), &[("email", "email")]).is_empty());
    }

    #[test]
    fn min_and_max_follow_the_value_type() {
        let messages = errors(
            json!({"name": "ab", "age": "7", "tags": [1, 2, 3]}),
            &[("name", "string|min:3"), ("age", "integer|min:18"), ("tags", "max:2")],
        );
        assert_eq!(messages["name"][0], "The name must be at least 3 characters.");
        assert_eq!(messages["age"][0], "The age must be at least 18.");
        assert_eq!(messages["tags"][0], "The tags may not have more than 2 items.");
    }

    #[test]
    fn in_and_regex_rules() {
        let rules = [("gender", "in:male,female"), ("code", "regex:/^[a-z]+$/i")];
        assert!(errors(json!({"gender": "male", "code": "ABC"}), &rules).is_empty());
        let messages = errors(json!({"gender": "other", "code": "a1"}), &rules);
        assert_eq!(messages["gender"][0], "The selected gender is invalid.");
        assert_eq!(messages["code"][0], "The code format is invalid.");
    }

    #[test]
    fn list_rules_allow_pipes_in_patterns() {
        let rules = vec![AttributeRules::new("size", ["regex:/^(s|m|l)$/"].into_rules())];
        assert!(validate(&payload(json!({"size": "m"})), &rules).is_ok());
        assert!(validate(&payload(json!({"size": "xl"})), &rules).is_err());
    }

    #[test]
    fn unknown_rules_are_configuration_errors() {
        let rules = vec![AttributeRules::new("name", "required|shiny".into_rules())];
        let err = validate(&payload(json!({"name": "x"})), &rules).unwrap_err();
        assert!(matches!(err, DashboardError::InvalidRule { ref rule, .. } if rule == "shiny"));
    }

    #[test]
    fn size_limits_must_be_finite() {
        for raw in ["min:NaN", "max:inf", "min:-infinity", "max:ten"] {
            assert!(matches!(Rule::parse("size", raw), Err(DashboardError::InvalidRule { .. })), "{raw}");
        }
        assert!(Rule::parse("size", "max:2.5").is_ok());
    }

    #[test]
    fn type_rules() {
        let rules = [("flag", "boolean"), ("count", "numeric"), ("id", "uuid"), ("site", "url")];
        assert!(
            errors(
                json!({"flag": 1, "count": "4.5", "id": "550e8400-e29b-41d4-a716-446655440000", "site": "https://a.io"}),
                &rules
            )
            .is_empty()
        );
        let messages = errors(json!({"flag": "yes", "count": "x", "id": "1", "site": "nope"}), &rules);
        assert_eq!(messages.len(), 4);
    }
}
