//! In-memory Document Store
//!
//! HashMap-backed engine with the same upsert/increment semantics as the
//! MongoDB engine. Used as a test double (it counts connection attempts and
//! open sessions) and for local demos.
//!
//! # Limitations
//! - Data is lost on restart
//! - The endpoint in the descriptor is ignored; every connection sees the
//!   same data
//! - Do not use in production

use crate::handlers::document::{
    descriptor::ConnectionDescriptor,
    diagnosis::StoreFailure,
    engine::{ConnectTimeouts, DocumentStore, StoreConnector},
    types::{Delta, Document, Identity, ListQuery, StorageStats, UpsertOutcome},
};
use async_trait::async_trait;
use serde_json::{Number, Value as JsonValue};
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

type CollectionKey = (String, String);

#[derive(Default)]
struct MemoryCluster {
    collections: RwLock<HashMap<CollectionKey, Vec<Document>>>,
    connect_attempts: AtomicUsize,
    open_sessions: AtomicUsize,
}

/// Connector handing out sessions on a shared in-memory cluster
#[derive(Clone, Default)]
pub struct MemoryConnector {
    cluster: Arc<MemoryCluster>,
    connect_failure: Option<StoreFailure>,
    operation_failure: Option<StoreFailure>,
    connect_delay: Option<Duration>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connect attempt fails with `failure`
    pub fn with_connect_failure(mut self, failure: StoreFailure) -> Self {
        self.connect_failure = Some(failure);
        self
    }

    /// Connections open, but every operation fails with `failure`
    pub fn with_operation_failure(mut self, failure: StoreFailure) -> Self {
        self.operation_failure = Some(failure);
        self
    }

    /// Simulate a slow endpoint
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    /// Number of connect calls made so far
    pub fn connect_attempts(&self) -> usize {
        self.cluster.connect_attempts.load(Ordering::SeqCst)
    }

    /// Number of sessions not yet released
    pub fn open_sessions(&self) -> usize {
        self.cluster.open_sessions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    fn engine_name(&self) -> &'static str {
        "memory"
    }

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        _timeouts: &ConnectTimeouts,
    ) -> Result<Box<dyn DocumentStore>, StoreFailure> {
        self.cluster.connect_attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = &self.connect_failure {
            return Err(failure.clone());
        }

        self.cluster.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryStore {
            cluster: self.cluster.clone(),
            database: descriptor.database().to_string(),
            collection: descriptor.collection().to_string(),
            operation_failure: self.operation_failure.clone(),
        }))
    }
}

struct MemoryStore {
    cluster: Arc<MemoryCluster>,
    database: String,
    collection: String,
    operation_failure: Option<StoreFailure>,
}

impl MemoryStore {
    fn key(&self) -> CollectionKey {
        (self.database.clone(), self.collection.clone())
    }

    fn check(&self) -> Result<(), StoreFailure> {
        match &self.operation_failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }

    fn new_document(identity: &Identity) -> Document {
        let mut document = Document::new();
        document.insert(
            "_id".to_string(),
            JsonValue::String(uuid::Uuid::new_v4().simple().to_string()),
        );
        document.insert(identity.field.clone(), identity.value.clone());
        document
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        self.cluster.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(&self, identity: &Identity) -> Result<Option<Document>, StoreFailure> {
        self.check()?;
        let collections = self.cluster.collections.read().await;
        Ok(collections
            .get(&self.key())
            .and_then(|docs| docs.iter().find(|doc| identity.matches(doc)))
            .cloned())
    }

    async fn find_many(&self, query: &ListQuery) -> Result<Vec<Document>, StoreFailure> {
        self.check()?;
        let collections = self.cluster.collections.read().await;
        let mut documents = collections.get(&self.key()).cloned().unwrap_or_default();

        let rank = |doc: &Document| doc.get(&query.ranking_field).and_then(JsonValue::as_f64);
        documents.sort_by(|a, b| match (rank(a), rank(b)) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(CmpOrdering::Equal),
            (Some(_), None) => CmpOrdering::Less,
            (None, Some(_)) => CmpOrdering::Greater,
            (None, None) => CmpOrdering::Equal,
        });
        documents.truncate(query.limit as usize);
        Ok(documents)
    }

    async fn upsert_merge(
        &self,
        identity: &Identity,
        fields: &Document,
    ) -> Result<UpsertOutcome, StoreFailure> {
        self.check()?;
        let mut collections = self.cluster.collections.write().await;
        let documents = collections.entry(self.key()).or_default();

        let (index, created) = match documents.iter().position(|doc| identity.matches(doc)) {
            Some(index) => (index, false),
            None => {
                documents.push(Self::new_document(identity));
                (documents.len() - 1, true)
            }
        };

        let document = &mut documents[index];
        for (key, value) in fields {
            if key != "_id" {
                document.insert(key.clone(), value.clone());
            }
        }

        Ok(UpsertOutcome {
            document: document.clone(),
            created,
        })
    }

    async fn upsert_increment(
        &self,
        identity: &Identity,
        field: &str,
        delta: &Delta,
    ) -> Result<Document, StoreFailure> {
        self.check()?;
        // Read, add and write happen under one write lock.
        let mut collections = self.cluster.collections.write().await;
        let documents = collections.entry(self.key()).or_default();

        let index = match documents.iter().position(|doc| identity.matches(doc)) {
            Some(index) => index,
            None => {
                documents.push(Self::new_document(identity));
                documents.len() - 1
            }
        };

        let document = &mut documents[index];
        let updated = match document.get(field) {
            None | Some(JsonValue::Null) => delta.clone(),
            Some(JsonValue::Number(current)) => add_numbers(current, delta),
            Some(_) => {
                return Err(StoreFailure::other(
                    "Write",
                    format!("Cannot apply $inc to a value of non-numeric type in field '{}'", field),
                ))
            }
        };
        document.insert(field.to_string(), JsonValue::Number(updated));

        Ok(document.clone())
    }

    async fn delete_one(&self, identity: &Identity) -> Result<u64, StoreFailure> {
        self.check()?;
        let mut collections = self.cluster.collections.write().await;
        let Some(documents) = collections.get_mut(&self.key()) else {
            return Ok(0);
        };
        match documents.iter().position(|doc| identity.matches(doc)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_all(&self) -> Result<u64, StoreFailure> {
        self.check()?;
        let mut collections = self.cluster.collections.write().await;
        Ok(collections
            .get_mut(&self.key())
            .map(|documents| documents.drain(..).count() as u64)
            .unwrap_or(0))
    }

    async fn storage_stats(&self) -> Result<StorageStats, StoreFailure> {
        self.check()?;
        let collections = self.cluster.collections.read().await;

        let mut objects = 0u64;
        let mut data_bytes = 0u64;
        for ((database, _), documents) in collections.iter() {
            if database != &self.database {
                continue;
            }
            for document in documents {
                objects += 1;
                data_bytes += serde_json::to_vec(document)
                    .map(|bytes| bytes.len() as u64)
                    .unwrap_or(0);
            }
        }

        Ok(StorageStats {
            database: self.database.clone(),
            data_bytes,
            // no secondary structures are kept
            index_bytes: 0,
            storage_bytes: data_bytes,
            objects,
            avg_object_bytes: if objects == 0 {
                0.0
            } else {
                data_bytes as f64 / objects as f64
            },
        })
    }

    async fn close(self: Box<Self>) {
        // open_sessions is decremented by Drop
    }
}

fn add_numbers(current: &Number, delta: &Number) -> Number {
    if let (Some(a), Some(b)) = (current.as_i64(), delta.as_i64()) {
        if let Some(sum) = a.checked_add(b) {
            return Number::from(sum);
        }
    }
    let sum = current.as_f64().unwrap_or(0.0) + delta.as_f64().unwrap_or(0.0);
    Number::from_f64(sum).unwrap_or_else(|| current.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use serde_json::json;

    fn descriptor(collection: &str) -> ConnectionDescriptor {
        ConnectionDescriptor::resolve(
            Some("mongodb://localhost:27017"),
            Some("test"),
            Some(collection),
            &StoreConfig::default(),
        )
        .unwrap()
    }

    fn user(id: &str) -> Identity {
        Identity::new("userId", json!(id))
    }

    #[tokio::test]
    async fn test_sessions_share_data_and_count_releases() {
        let connector = MemoryConnector::new();
        let timeouts = ConnectTimeouts::default();

        let writer = connector.connect(&descriptor("c"), &timeouts).await.unwrap();
        let mut fields = Document::new();
        fields.insert("name".to_string(), json!("Ada"));
        writer.upsert_merge(&user("u1"), &fields).await.unwrap();
        writer.close().await;

        let reader = connector.connect(&descriptor("c"), &timeouts).await.unwrap();
        assert_eq!(connector.open_sessions(), 1);
        let found = reader.find_one(&user("u1")).await.unwrap().unwrap();
        assert_eq!(found["name"], json!("Ada"));
        assert!(found.contains_key("_id"));
        reader.close().await;

        assert_eq!(connector.connect_attempts(), 2);
        assert_eq!(connector.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let connector = MemoryConnector::new();
        let timeouts = ConnectTimeouts::default();
        let a = connector.connect(&descriptor("a"), &timeouts).await.unwrap();
        let b = connector.connect(&descriptor("b"), &timeouts).await.unwrap();

        a.upsert_merge(&user("u1"), &Document::new()).await.unwrap();
        assert!(b.find_one(&user("u1")).await.unwrap().is_none());
        assert_eq!(b.storage_stats().await.unwrap().objects, 1);
    }

    #[tokio::test]
    async fn test_increment_on_text_field_fails() {
        let connector = MemoryConnector::new();
        let store = connector
            .connect(&descriptor("c"), &ConnectTimeouts::default())
            .await
            .unwrap();
        let mut fields = Document::new();
        fields.insert("points".to_string(), json!("many"));
        store.upsert_merge(&user("u1"), &fields).await.unwrap();

        let result = store
            .upsert_increment(&user("u1"), "points", &Number::from(1))
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_add_numbers() {
        assert_eq!(add_numbers(&Number::from(2), &Number::from(3)), Number::from(5));
        let mixed = add_numbers(&Number::from(2), &Number::from_f64(0.5).unwrap());
        assert_eq!(mixed.as_f64(), Some(2.5));
    }
}
