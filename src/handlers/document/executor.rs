//! Operation Executor
//!
//! Runs a planned [`Operation`] against one live store connection.

use super::engine::DocumentStore;
use super::quota::QuotaEstimator;
use super::request::Operation;
use super::types::{Document, ListQuery, OutputMode, QuotaSnapshot};
use crate::error::{Error, Result};
use serde_json::{json, Value as JsonValue};
use tracing::debug;

/// Result of a successfully executed operation
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    Found(Document),
    Missing,
    Listed {
        documents: Vec<Document>,
        quota: Option<QuotaSnapshot>,
    },
    Quota(QuotaSnapshot),
    Merged {
        document: Document,
        created: bool,
    },
    Incremented(Document),
    Deleted {
        count: u64,
    },
    Reset {
        count: u64,
    },
}

impl OperationOutcome {
    /// Whether the operation created a new document
    pub fn created(&self) -> bool {
        matches!(self, OperationOutcome::Merged { created: true, .. })
    }

    /// JSON response body
    pub fn into_json(self) -> JsonValue {
        match self {
            OperationOutcome::Found(document) => JsonValue::Object(document),
            OperationOutcome::Missing => json!({
                "exists": false,
                "message": "document not found",
            }),
            OperationOutcome::Listed {
                documents,
                quota: None,
            } => JsonValue::Array(documents.into_iter().map(JsonValue::Object).collect()),
            OperationOutcome::Listed {
                documents,
                quota: Some(quota),
            } => json!({
                "status": "Online",
                "database": quota.database.clone(),
                "storage": quota,
                "documents": documents,
            }),
            OperationOutcome::Quota(quota) => json!({
                "status": "success",
                "storage": quota,
            }),
            OperationOutcome::Merged { document, .. } => json!({
                "success": true,
                "data": document,
            }),
            OperationOutcome::Incremented(document) => json!({
                "success": true,
                "updated": document,
            }),
            OperationOutcome::Deleted { count } => json!({
                "success": true,
                "deletedCount": count,
            }),
            OperationOutcome::Reset { count } => json!({
                "success": true,
                "deletedCount": count,
                "message": "collection reset",
            }),
        }
    }
}

/// Executes operations against a store connection
#[derive(Debug, Clone)]
pub struct OperationExecutor {
    quota: QuotaEstimator,
    ranking_field: String,
}

impl OperationExecutor {
    pub fn new(quota: QuotaEstimator, ranking_field: impl Into<String>) -> Self {
        Self {
            quota,
            ranking_field: ranking_field.into(),
        }
    }

    pub async fn execute(
        &self,
        store: &dyn DocumentStore,
        operation: Operation,
    ) -> Result<OperationOutcome> {
        debug!(operation = operation.name(), "executing operation");

        let outcome = match operation {
            Operation::ReadOne { identity } => match store.find_one(&identity).await {
                Ok(Some(document)) => OperationOutcome::Found(document),
                Ok(None) => OperationOutcome::Missing,
                Err(failure) => return Err(Error::Operation(failure)),
            },
            Operation::ReadMany { limit, mode } => {
                let query = ListQuery {
                    ranking_field: self.ranking_field.clone(),
                    limit,
                };
                let documents = store.find_many(&query).await.map_err(Error::Operation)?;
                let quota = match mode {
                    OutputMode::Raw => None,
                    OutputMode::Enriched => Some(
                        self.quota
                            .snapshot(store)
                            .await
                            .map_err(Error::Operation)?,
                    ),
                };
                OperationOutcome::Listed { documents, quota }
            }
            Operation::QuotaOnly => {
                OperationOutcome::Quota(self.quota.snapshot(store).await.map_err(Error::Operation)?)
            }
            Operation::UpsertMerge { identity, payload } => {
                let outcome = store
                    .upsert_merge(&identity, &payload)
                    .await
                    .map_err(Error::Operation)?;
                OperationOutcome::Merged {
                    document: outcome.document,
                    created: outcome.created,
                }
            }
            Operation::UpsertIncrement {
                identity,
                field,
                delta,
            } => OperationOutcome::Incremented(
                store
                    .upsert_increment(&identity, &field, &delta)
                    .await
                    .map_err(Error::Operation)?,
            ),
            Operation::DeleteOne { identity } => OperationOutcome::Deleted {
                count: store.delete_one(&identity).await.map_err(Error::Operation)?,
            },
            Operation::DeleteAll => OperationOutcome::Reset {
                count: store.delete_all().await.map_err(Error::Operation)?,
            },
        };

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::handlers::document::descriptor::ConnectionDescriptor;
    use crate::handlers::document::engine::{ConnectTimeouts, StoreConnector};
    use crate::handlers::document::engines::memory::MemoryConnector;
    use crate::handlers::document::types::Identity;
    use serde_json::Number;

    async fn store() -> Box<dyn DocumentStore> {
        let descriptor = ConnectionDescriptor::resolve(
            Some("mongodb://localhost:27017"),
            None,
            None,
            &StoreConfig::default(),
        )
        .unwrap();
        MemoryConnector::new()
            .connect(&descriptor, &ConnectTimeouts::default())
            .await
            .unwrap()
    }

    fn executor() -> OperationExecutor {
        OperationExecutor::new(QuotaEstimator::new(1024 * 1024), "points")
    }

    fn payload(value: JsonValue) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn user(id: &str) -> Identity {
        Identity::new("userId", json!(id))
    }

    #[tokio::test]
    async fn test_merge_keeps_untouched_fields() {
        let store = store().await;
        let executor = executor();

        let first = executor
            .execute(
                store.as_ref(),
                Operation::UpsertMerge {
                    identity: user("u1"),
                    payload: payload(json!({"userId": "u1", "name": "Ada", "points": 3})),
                },
            )
            .await
            .unwrap();
        assert!(first.created());

        let second = executor
            .execute(
                store.as_ref(),
                Operation::UpsertMerge {
                    identity: user("u1"),
                    payload: payload(json!({"userId": "u1", "points": 7})),
                },
            )
            .await
            .unwrap();
        assert!(!second.created());

        let found = executor
            .execute(store.as_ref(), Operation::ReadOne { identity: user("u1") })
            .await
            .unwrap();
        match found {
            OperationOutcome::Found(doc) => {
                assert_eq!(doc["name"], json!("Ada"));
                assert_eq!(doc["points"], json!(7));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_document_is_not_an_error() {
        let store = store().await;
        let outcome = executor()
            .execute(store.as_ref(), Operation::ReadOne { identity: user("ghost") })
            .await
            .unwrap();
        assert_eq!(outcome.clone(), OperationOutcome::Missing);
        assert_eq!(outcome.into_json()["exists"], json!(false));
    }

    #[tokio::test]
    async fn test_increments_accumulate() {
        let store = store().await;
        let executor = executor();
        for delta in [Number::from(2), Number::from(5)] {
            executor
                .execute(
                    store.as_ref(),
                    Operation::UpsertIncrement {
                        identity: user("u1"),
                        field: "points".to_string(),
                        delta,
                    },
                )
                .await
                .unwrap();
        }
        let found = store.find_one(&user("u1")).await.unwrap().unwrap();
        assert_eq!(found["points"], json!(7));
    }

    #[tokio::test]
    async fn test_list_modes() {
        let store = store().await;
        let executor = executor();
        for (id, points) in [("a", 1), ("b", 30), ("c", 12)] {
            store
                .upsert_merge(&user(id), &payload(json!({"userId": id, "points": points})))
                .await
                .unwrap();
        }

        let raw = executor
            .execute(
                store.as_ref(),
                Operation::ReadMany {
                    limit: 2,
                    mode: OutputMode::Raw,
                },
            )
            .await
            .unwrap()
            .into_json();
        let ids: Vec<_> = raw
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["userId"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["b", "c"]);

        let enriched = executor
            .execute(
                store.as_ref(),
                Operation::ReadMany {
                    limit: 10,
                    mode: OutputMode::Enriched,
                },
            )
            .await
            .unwrap()
            .into_json();
        assert_eq!(enriched["status"], json!("Online"));
        assert_eq!(enriched["storage"]["objects"], json!(3));
        assert_eq!(enriched["documents"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_counts() {
        let store = store().await;
        let executor = executor();
        let missing = executor
            .execute(store.as_ref(), Operation::DeleteOne { identity: user("nobody") })
            .await
            .unwrap();
        assert_eq!(missing, OperationOutcome::Deleted { count: 0 });

        store
            .upsert_merge(&user("u1"), &payload(json!({"userId": "u1"})))
            .await
            .unwrap();
        store
            .upsert_merge(&user("u2"), &payload(json!({"userId": "u2"})))
            .await
            .unwrap();
        let reset = executor
            .execute(store.as_ref(), Operation::DeleteAll)
            .await
            .unwrap();
        assert_eq!(reset, OperationOutcome::Reset { count: 2 });
    }
}
