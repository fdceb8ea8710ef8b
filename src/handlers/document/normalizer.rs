//! Payload Normalizer
//!
//! Merges query and body parameters into one candidate document, strips
//! transport-only fields and coerces numeric strings so that numeric sorts
//! on stored fields stay correct. Scalar identities are stored in their
//! string form, the same form query-string lookups use.

use super::types::{Document, Identity};
use crate::config::DocumentConfig;
use crate::error::{Error, Result};
use serde_json::{Number, Value as JsonValue};
use std::collections::HashSet;

/// Parameters the planner reads; never stored whatever the configuration says
pub const CONTROL_PARAMS: &[&str] = &[
    "view", "limit", "db", "col", "action", "field", "amount", "id",
];

/// Builds normalized payloads for write operations
#[derive(Debug, Clone)]
pub struct PayloadNormalizer {
    identity_field: String,
    transport_fields: HashSet<String>,
}

impl PayloadNormalizer {
    pub fn new(config: &DocumentConfig) -> Self {
        Self {
            identity_field: config.identity_field.clone(),
            transport_fields: config
                .transport_fields
                .iter()
                .cloned()
                .chain(CONTROL_PARAMS.iter().map(|name| name.to_string()))
                .collect(),
        }
    }

    pub fn identity_field(&self) -> &str {
        &self.identity_field
    }

    /// Merge query then body (body wins on duplicate keys), drop transport
    /// fields and coerce numerals.
    pub fn normalize(&self, query: &[(String, String)], body: Option<&Document>) -> Document {
        let mut document = Document::new();

        for (key, value) in query {
            document.insert(key.clone(), JsonValue::String(value.clone()));
        }
        if let Some(body) = body {
            for (key, value) in body {
                document.insert(key.clone(), value.clone());
            }
        }

        document.retain(|key, _| !self.transport_fields.contains(key));

        for (key, value) in document.iter_mut() {
            if key == &self.identity_field {
                if let Some(text) = identity_text(value) {
                    *value = JsonValue::String(text);
                }
                continue;
            }
            if let Some(number) = value.as_str().and_then(parse_numeral) {
                *value = JsonValue::Number(number);
            }
        }

        document
    }

    /// Extract the identity from a normalized payload
    pub fn require_identity(&self, document: &Document) -> Result<Identity> {
        match document.get(&self.identity_field) {
            Some(value) if is_usable_identity(value) => {
                Ok(Identity::new(self.identity_field.clone(), value.clone()))
            }
            _ => Err(Error::Validation(format!(
                "'{}' is required",
                self.identity_field
            ))),
        }
    }
}

/// Parse a string that is entirely a finite numeral.
///
/// Integers that fit `i64` stay integers; anything else with a fractional or
/// exponent part becomes a float.
pub fn parse_numeral(text: &str) -> Option<Number> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    // f64::from_str also accepts "inf" and "NaN"; those contain no digits and
    // are rejected above.
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(Number::from(int));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
}

fn identity_text(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_usable_identity(value: &JsonValue) -> bool {
    value.as_str().is_some_and(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalizer() -> PayloadNormalizer {
        PayloadNormalizer::new(&DocumentConfig::default())
    }

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn body(value: JsonValue) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_numeric_coercion() {
        let doc = normalizer().normalize(
            &query(&[("userId", "u1"), ("points", "42"), ("tag", "42abc")]),
            None,
        );
        assert_eq!(doc["points"], json!(42));
        assert_eq!(doc["tag"], json!("42abc"));
    }

    #[test]
    fn test_float_and_blank_values() {
        let doc = normalizer().normalize(
            &query(&[("ratio", "0.25"), ("big", "1e3"), ("blank", ""), ("word", "NaN")]),
            None,
        );
        assert_eq!(doc["ratio"], json!(0.25));
        assert_eq!(doc["big"], json!(1000.0));
        assert_eq!(doc["blank"], json!(""));
        assert_eq!(doc["word"], json!("NaN"));
    }

    #[test]
    fn test_body_wins_over_query() {
        let doc = normalizer().normalize(
            &query(&[("userId", "u1"), ("name", "query")]),
            Some(&body(json!({"name": "body", "level": 3}))),
        );
        assert_eq!(doc["name"], json!("body"));
        assert_eq!(doc["level"], json!(3));
    }

    #[test]
    fn test_transport_fields_stripped() {
        let doc = normalizer().normalize(
            &query(&[
                ("mongoUri", "mongodb://localhost"),
                ("view", "raw"),
                ("limit", "10"),
                ("db", "test"),
                ("userId", "u1"),
            ]),
            Some(&body(json!({"mongoUri": "mongodb://elsewhere"}))),
        );
        assert_eq!(doc.len(), 1);
        assert!(doc.contains_key("userId"));
    }

    #[test]
    fn test_identity_never_coerced() {
        let doc = normalizer().normalize(&query(&[("userId", "123")]), None);
        assert_eq!(doc["userId"], json!("123"));
    }

    #[test]
    fn test_scalar_body_identity_becomes_text() {
        let n = normalizer();
        let doc = n.normalize(&[], Some(&body(json!({"userId": 42, "points": 1}))));
        assert_eq!(doc["userId"], json!("42"));
        assert_eq!(doc["points"], json!(1));
        assert_eq!(n.require_identity(&doc).unwrap().value, json!("42"));

        let doc = n.normalize(&[], Some(&body(json!({"userId": true}))));
        assert_eq!(n.require_identity(&doc).unwrap().value, json!("true"));

        let doc = n.normalize(&[], Some(&body(json!({"userId": ["a"]}))));
        assert!(n.require_identity(&doc).is_err());
    }

    #[test]
    fn test_control_params_stripped_without_config() {
        let config = DocumentConfig {
            transport_fields: vec!["mongoUri".to_string()],
            ..DocumentConfig::default()
        };
        let doc = PayloadNormalizer::new(&config).normalize(
            &query(&[("userId", "u1"), ("action", "add"), ("field", "points"), ("amount", "2")]),
            None,
        );
        assert_eq!(doc.len(), 1);
        assert!(doc.contains_key("userId"));
    }

    #[test]
    fn test_require_identity() {
        let n = normalizer();
        let doc = n.normalize(&query(&[("name", "x")]), None);
        assert!(matches!(n.require_identity(&doc), Err(Error::Validation(_))));

        let doc = n.normalize(&query(&[("userId", "  ")]), None);
        assert!(n.require_identity(&doc).is_err());

        let doc = n.normalize(&[], Some(&body(json!({"userId": null}))));
        assert!(n.require_identity(&doc).is_err());

        let doc = n.normalize(&query(&[("userId", "u7")]), None);
        let identity = n.require_identity(&doc).unwrap();
        assert_eq!(identity.field, "userId");
        assert_eq!(identity.value, json!("u7"));
    }

    #[test]
    fn test_parse_numeral() {
        assert_eq!(parse_numeral(" 7 "), Some(Number::from(7)));
        assert_eq!(parse_numeral("-3"), Some(Number::from(-3)));
        assert!(parse_numeral("inf").is_none());
        assert!(parse_numeral("1e999").is_none());
        assert!(parse_numeral("12px").is_none());
    }
}
