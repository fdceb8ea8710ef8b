//! MongoDB Connection Implementation
//!
//! One `Client` per request, pinged before use and shut down on close.

use super::{config::MongoConnectionOptions, convert_mongodb_error};
use crate::handlers::document::{
    descriptor::ConnectionDescriptor,
    diagnosis::StoreFailure,
    engine::{ConnectTimeouts, DocumentStore, StoreConnector},
    types::{Delta, Document, Identity, ListQuery, StorageStats, UpsertOutcome},
};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Bson},
    options::{ClientOptions, ReturnDocument},
    Client, Collection, Database,
};
use serde_json::Value as JsonValue;

/// Opens MongoDB connections from request descriptors
#[derive(Clone, Debug, Default)]
pub struct MongoConnector {
    options: MongoConnectionOptions,
}

impl MongoConnector {
    pub fn new(options: MongoConnectionOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl StoreConnector for MongoConnector {
    fn engine_name(&self) -> &'static str {
        "mongodb"
    }

    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        timeouts: &ConnectTimeouts,
    ) -> Result<Box<dyn DocumentStore>, StoreFailure> {
        // Parse MongoDB URI
        let mut client_options = ClientOptions::parse(descriptor.uri())
            .await
            .map_err(convert_mongodb_error)?;
        self.options.apply(&mut client_options, timeouts);

        let client = Client::with_options(client_options).map_err(convert_mongodb_error)?;

        // Ping to verify connection
        let ping = client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await;
        if let Err(err) = ping {
            client.shutdown().await;
            return Err(convert_mongodb_error(err));
        }

        let database = client.database(descriptor.database());
        let collection = database.collection::<bson::Document>(descriptor.collection());

        Ok(Box::new(MongoStore {
            client,
            database,
            collection,
        }))
    }
}

/// One live MongoDB connection targeting a collection
pub struct MongoStore {
    client: Client,
    database: Database,
    collection: Collection<bson::Document>,
}

impl MongoStore {
    fn filter(identity: &Identity) -> Result<bson::Document, StoreFailure> {
        let value = Bson::try_from(identity.value.clone())
            .map_err(|e| StoreFailure::other("Serialization", format!("JSON to BSON error: {}", e)))?;
        let mut filter = bson::Document::new();
        filter.insert(identity.field.clone(), value);
        Ok(filter)
    }

    async fn fetch_one(&self, filter: bson::Document) -> Result<Option<Document>, StoreFailure> {
        let found = self
            .collection
            .find_one(filter)
            .await
            .map_err(convert_mongodb_error)?;
        Ok(found.map(document_from_bson))
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_one(&self, identity: &Identity) -> Result<Option<Document>, StoreFailure> {
        self.fetch_one(Self::filter(identity)?).await
    }

    async fn find_many(&self, query: &ListQuery) -> Result<Vec<Document>, StoreFailure> {
        let mut sort = bson::Document::new();
        sort.insert(query.ranking_field.clone(), -1);

        let cursor = self
            .collection
            .find(doc! {})
            .sort(sort)
            .limit(i64::from(query.limit))
            .await
            .map_err(convert_mongodb_error)?;

        let documents: Vec<bson::Document> =
            cursor.try_collect().await.map_err(convert_mongodb_error)?;
        Ok(documents.into_iter().map(document_from_bson).collect())
    }

    async fn upsert_merge(
        &self,
        identity: &Identity,
        fields: &Document,
    ) -> Result<UpsertOutcome, StoreFailure> {
        let filter = Self::filter(identity)?;

        let set = bson_from_json(fields)?;
        let marker = ObjectId::new();

        let updated = self
            .collection
            .find_one_and_update(filter, merge_update(set, marker))
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(convert_mongodb_error)?
            .ok_or_else(|| StoreFailure::other("Write", "upsert returned no document"))?;

        Ok(UpsertOutcome {
            created: inserted_with(&updated, marker),
            document: document_from_bson(updated),
        })
    }

    async fn upsert_increment(
        &self,
        identity: &Identity,
        field: &str,
        delta: &Delta,
    ) -> Result<Document, StoreFailure> {
        let amount = match delta.as_i64() {
            Some(int) => Bson::Int64(int),
            None => Bson::Double(delta.as_f64().unwrap_or(0.0)),
        };
        let mut inc = bson::Document::new();
        inc.insert(field, amount);

        let updated = self
            .collection
            .find_one_and_update(Self::filter(identity)?, doc! { "$inc": inc })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(convert_mongodb_error)?;

        updated
            .map(document_from_bson)
            .ok_or_else(|| StoreFailure::other("Write", "upsert returned no document"))
    }

    async fn delete_one(&self, identity: &Identity) -> Result<u64, StoreFailure> {
        let result = self
            .collection
            .delete_one(Self::filter(identity)?)
            .await
            .map_err(convert_mongodb_error)?;
        Ok(result.deleted_count)
    }

    async fn delete_all(&self) -> Result<u64, StoreFailure> {
        let result = self
            .collection
            .delete_many(doc! {})
            .await
            .map_err(convert_mongodb_error)?;
        Ok(result.deleted_count)
    }

    async fn storage_stats(&self) -> Result<StorageStats, StoreFailure> {
        let stats = self
            .database
            .run_command(doc! { "dbStats": 1 })
            .await
            .map_err(convert_mongodb_error)?;

        Ok(StorageStats {
            database: self.database.name().to_string(),
            data_bytes: stat_number(&stats, "dataSize") as u64,
            index_bytes: stat_number(&stats, "indexSize") as u64,
            storage_bytes: stat_number(&stats, "storageSize") as u64,
            objects: stat_number(&stats, "objects") as u64,
            avg_object_bytes: stat_number(&stats, "avgObjSize"),
        })
    }

    async fn close(self: Box<Self>) {
        let MongoStore { client, .. } = *self;
        client.shutdown().await;
    }
}

/// `$set` the fields; a freshly inserted document takes `marker` as its `_id`
fn merge_update(mut set: bson::Document, marker: ObjectId) -> bson::Document {
    // _id is immutable once stored
    set.remove("_id");
    doc! {
        "$set": set,
        "$setOnInsert": { "_id": marker },
    }
}

/// True when the upsert inserted the document rather than updating it
fn inserted_with(document: &bson::Document, marker: ObjectId) -> bool {
    document.get_object_id("_id").is_ok_and(|id| id == marker)
}

/// dbStats reports sizes as int32, int64 or double depending on magnitude
fn stat_number(stats: &bson::Document, key: &str) -> f64 {
    match stats.get(key) {
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        Some(Bson::Double(v)) => *v,
        _ => 0.0,
    }
}

/// Convert a JSON object to a BSON document
fn bson_from_json(fields: &Document) -> Result<bson::Document, StoreFailure> {
    let bson = Bson::try_from(JsonValue::Object(fields.clone()))
        .map_err(|e| StoreFailure::other("Serialization", format!("JSON to BSON error: {}", e)))?;

    match bson {
        Bson::Document(doc) => Ok(doc),
        _ => Err(StoreFailure::other(
            "Serialization",
            "Expected BSON document",
        )),
    }
}

/// Convert a stored document to JSON, rendering the ObjectId as plain hex
fn document_from_bson(document: bson::Document) -> Document {
    let mut json = match Bson::Document(document).into_relaxed_extjson() {
        JsonValue::Object(map) => map,
        _ => Document::new(),
    };

    if let Some(JsonValue::Object(id)) = json.get("_id") {
        if let Some(JsonValue::String(hex)) = id.get("$oid") {
            let hex = hex.clone();
            json.insert("_id".to_string(), JsonValue::String(hex));
        }
    }
    json
}
