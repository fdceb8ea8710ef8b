//! Request Planning
//!
//! Turns an HTTP verb and its parameters into a typed [`Operation`]. Every
//! validation failure surfaces here, before a connection is opened.

use super::normalizer::{parse_numeral, PayloadNormalizer};
use super::types::{Delta, Document, Identity, OutputMode};
use crate::config::DocumentConfig;
use crate::error::{Error, Result};
use http::Method;
use serde_json::Value as JsonValue;

/// A fully validated store operation
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ReadOne {
        identity: Identity,
    },
    ReadMany {
        limit: u32,
        mode: OutputMode,
    },
    QuotaOnly,
    UpsertMerge {
        identity: Identity,
        payload: Document,
    },
    /// Accumulates on every call; repeating a request adds the delta again.
    UpsertIncrement {
        identity: Identity,
        field: String,
        delta: Delta,
    },
    DeleteOne {
        identity: Identity,
    },
    DeleteAll,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ReadOne { .. } => "read_one",
            Operation::ReadMany { .. } => "read_many",
            Operation::QuotaOnly => "quota",
            Operation::UpsertMerge { .. } => "upsert_merge",
            Operation::UpsertIncrement { .. } => "upsert_increment",
            Operation::DeleteOne { .. } => "delete_one",
            Operation::DeleteAll => "delete_all",
        }
    }
}

/// Raw request parameters
#[derive(Debug, Clone, Default)]
pub struct RequestParams {
    /// Query string pairs in arrival order
    pub query: Vec<(String, String)>,
    /// Parsed JSON object body, if any
    pub body: Option<Document>,
}

impl RequestParams {
    pub fn new(query: Vec<(String, String)>, body: Option<Document>) -> Self {
        Self { query, body }
    }

    /// Last non-empty value of a query parameter
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rev()
            .find(|(key, value)| key == name && !value.trim().is_empty())
            .map(|(_, value)| value.as_str())
    }
}

/// Plans operations from verbs and parameters
#[derive(Debug, Clone)]
pub struct RequestPlanner {
    normalizer: PayloadNormalizer,
    reset_token: String,
    default_limit: u32,
    max_limit: u32,
}

impl RequestPlanner {
    pub fn new(config: &DocumentConfig) -> Self {
        Self {
            normalizer: PayloadNormalizer::new(config),
            reset_token: config.reset_token.clone(),
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }

    pub fn plan(&self, method: &Method, params: &RequestParams) -> Result<Operation> {
        match *method {
            Method::GET => self.plan_read(params),
            Method::POST => self.plan_write(params),
            Method::PUT => self.plan_put(params),
            Method::DELETE => self.plan_delete(params),
            _ => Err(Error::MethodNotAllowed(method.to_string())),
        }
    }

    fn plan_read(&self, params: &RequestParams) -> Result<Operation> {
        match params.param("action") {
            Some("stats") => return Ok(Operation::QuotaOnly),
            Some(other) => {
                return Err(Error::Validation(format!(
                    "unsupported GET action '{}'",
                    other
                )))
            }
            None => {}
        }

        if let Some(identity) = self.query_identity(params) {
            return Ok(Operation::ReadOne { identity });
        }

        Ok(Operation::ReadMany {
            limit: self.page_limit(params.param("limit")),
            mode: OutputMode::from_view(params.param("view")),
        })
    }

    fn plan_write(&self, params: &RequestParams) -> Result<Operation> {
        let payload = self.normalizer.normalize(&params.query, params.body.as_ref());
        let identity = self.normalizer.require_identity(&payload)?;

        match params.param("action") {
            Some("add") => {
                let field = self.increment_field(params.param("field"))?;
                let delta = increment_delta(params.param("amount"))?;
                Ok(Operation::UpsertIncrement {
                    identity,
                    field,
                    delta,
                })
            }
            Some(other) => Err(Error::Validation(format!(
                "unsupported POST action '{}'",
                other
            ))),
            None => Ok(Operation::UpsertMerge { identity, payload }),
        }
    }

    fn plan_put(&self, params: &RequestParams) -> Result<Operation> {
        let mut payload = self.normalizer.normalize(&params.query, params.body.as_ref());

        // The query identity targets the document, whatever the body says.
        if let Some(identity) = self.query_identity(params) {
            payload.insert(identity.field.clone(), identity.value.clone());
        }

        let identity = self.normalizer.require_identity(&payload)?;
        Ok(Operation::UpsertMerge { identity, payload })
    }

    fn plan_delete(&self, params: &RequestParams) -> Result<Operation> {
        let identity = self.query_identity(params).ok_or_else(|| {
            Error::Validation(format!(
                "'{}' is required for DELETE",
                self.normalizer.identity_field()
            ))
        })?;

        if identity.value_text() == self.reset_token {
            Ok(Operation::DeleteAll)
        } else {
            Ok(Operation::DeleteOne { identity })
        }
    }

    /// Identity from the query string (`userId`, or the `id` alias)
    fn query_identity(&self, params: &RequestParams) -> Option<Identity> {
        let field = self.normalizer.identity_field();
        params
            .param(field)
            .or_else(|| params.param("id"))
            .map(|value| Identity::new(field, JsonValue::String(value.to_string())))
    }

    fn page_limit(&self, raw: Option<&str>) -> u32 {
        raw.and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
    }

    fn increment_field(&self, raw: Option<&str>) -> Result<String> {
        let field = raw
            .map(str::trim)
            .ok_or_else(|| Error::Validation("'field' is required for action=add".to_string()))?;

        // Dotted names address nested paths in MongoDB but literal keys elsewhere.
        if field.is_empty() || field.starts_with('$') || field.contains(['.', '\0']) {
            return Err(Error::Validation(format!(
                "'{}' is not a valid field name",
                field
            )));
        }
        if field == self.normalizer.identity_field() || field == "_id" {
            return Err(Error::Validation(format!("'{}' cannot be incremented", field)));
        }
        Ok(field.to_string())
    }
}

fn increment_delta(raw: Option<&str>) -> Result<Delta> {
    let raw = raw.ok_or_else(|| Error::Validation("'amount' is required for action=add".to_string()))?;
    parse_numeral(raw)
        .ok_or_else(|| Error::Validation(format!("'amount' must be numeric, got '{}'", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn planner() -> RequestPlanner {
        RequestPlanner::new(&DocumentConfig::default())
    }

    fn params(pairs: &[(&str, &str)]) -> RequestParams {
        RequestParams::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            None,
        )
    }

    #[test]
    fn test_get_variants() {
        let p = planner();
        assert_eq!(
            p.plan(&Method::GET, &params(&[("action", "stats")])).unwrap(),
            Operation::QuotaOnly
        );
        assert!(matches!(
            p.plan(&Method::GET, &params(&[("userId", "u1")])).unwrap(),
            Operation::ReadOne { .. }
        ));
        assert_eq!(
            p.plan(&Method::GET, &params(&[("view", "raw"), ("limit", "20")])).unwrap(),
            Operation::ReadMany {
                limit: 20,
                mode: OutputMode::Raw
            }
        );
    }

    #[test]
    fn test_limit_defaults_and_cap() {
        let p = planner();
        let limit = |raw: &str| match p.plan(&Method::GET, &params(&[("limit", raw)])).unwrap() {
            Operation::ReadMany { limit, .. } => limit,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(limit("abc"), 100);
        assert_eq!(limit("0"), 100);
        assert_eq!(limit("10000"), 500);
        assert_eq!(limit("250"), 250);
    }

    #[test]
    fn test_post_without_identity_is_rejected() {
        let err = planner()
            .plan(&Method::POST, &params(&[("points", "3")]))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_post_merge_payload() {
        let op = planner()
            .plan(
                &Method::POST,
                &params(&[("userId", "u1"), ("points", "9"), ("mongoUri", "mongodb://x")]),
            )
            .unwrap();
        match op {
            Operation::UpsertMerge { identity, payload } => {
                assert_eq!(identity.value, json!("u1"));
                assert_eq!(payload["points"], json!(9));
                assert!(!payload.contains_key("mongoUri"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_increment_policy() {
        let p = planner();
        let op = p
            .plan(
                &Method::POST,
                &params(&[("userId", "u1"), ("action", "add"), ("field", "points"), ("amount", "5")]),
            )
            .unwrap();
        assert!(matches!(op, Operation::UpsertIncrement { ref field, .. } if field == "points"));

        for bad in [
            vec![("userId", "u1"), ("action", "add"), ("field", "points"), ("amount", "five")],
            vec![("userId", "u1"), ("action", "add"), ("field", "points")],
            vec![("userId", "u1"), ("action", "add"), ("amount", "1")],
            vec![("userId", "u1"), ("action", "add"), ("field", "$set"), ("amount", "1")],
            vec![("userId", "u1"), ("action", "add"), ("field", "userId"), ("amount", "1")],
            vec![("userId", "u1"), ("action", "add"), ("field", "_id"), ("amount", "1")],
            vec![("userId", "u1"), ("action", "add"), ("field", "stats.points"), ("amount", "1")],
            vec![("userId", "u1"), ("action", "add"), ("field", " "), ("amount", "1")],
            vec![("userId", "u1"), ("action", "multiply")],
        ] {
            let err = p.plan(&Method::POST, &params(&bad)).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{bad:?}");
        }
    }

    #[test]
    fn test_put_query_identity_overrides_body() {
        let mut request = params(&[("userId", "target")]);
        request.body = json!({"userId": "other", "name": "n"}).as_object().cloned();
        match planner().plan(&Method::PUT, &request).unwrap() {
            Operation::UpsertMerge { identity, payload } => {
                assert_eq!(identity.value, json!("target"));
                assert_eq!(payload["userId"], json!("target"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_delete_variants() {
        let p = planner();
        assert_eq!(
            p.plan(&Method::DELETE, &params(&[("userId", "ALL_DATA_RESET_CONFIRM")]))
                .unwrap(),
            Operation::DeleteAll
        );
        assert!(matches!(
            p.plan(&Method::DELETE, &params(&[("userId", "all_data_reset_confirm")]))
                .unwrap(),
            Operation::DeleteOne { .. }
        ));
        assert!(p.plan(&Method::DELETE, &params(&[])).is_err());
    }

    #[test]
    fn test_unsupported_method() {
        let err = planner().plan(&Method::PATCH, &params(&[])).unwrap_err();
        assert!(matches!(err, Error::MethodNotAllowed(_)));
    }
}
