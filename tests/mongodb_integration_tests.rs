//! MongoDB engine tests against a live server
//!
//! Run with `--features integration-tests` and `DOC_BRIDGE_TEST_URI` pointing
//! at a disposable MongoDB deployment. Each test uses its own collection.

#![cfg(all(feature = "integration-tests", feature = "mongodb-backend"))]

use doc_bridge::config::StoreConfig;
use doc_bridge::handlers::document::engines::{MongoConnectionOptions, MongoConnector};
use doc_bridge::handlers::document::types::{Document, Identity, ListQuery};
use doc_bridge::handlers::document::{
    classify, ConnectTimeouts, ConnectionDescriptor, DiagnosisCode, DocumentStore, StoreConnector,
};
use serde_json::{json, Number};
use std::time::Duration;

fn test_uri() -> Option<String> {
    std::env::var("DOC_BRIDGE_TEST_URI").ok()
}

async fn open(uri: &str, collection: &str) -> Box<dyn DocumentStore> {
    let descriptor =
        ConnectionDescriptor::resolve(Some(uri), Some("doc_bridge_it"), Some(collection), &StoreConfig::default())
            .unwrap();
    MongoConnector::new(MongoConnectionOptions::default())
        .connect(&descriptor, &ConnectTimeouts::default())
        .await
        .unwrap()
}

fn user(id: &str) -> Identity {
    Identity::new("userId", json!(id))
}

#[tokio::test]
async fn test_merge_increment_and_delete() {
    let Some(uri) = test_uri() else {
        eprintln!("DOC_BRIDGE_TEST_URI not set, skipping");
        return;
    };
    let store = open(&uri, "merge_increment").await;
    store.delete_all().await.unwrap();

    let mut fields = Document::new();
    fields.insert("userId".to_string(), json!("u1"));
    fields.insert("name".to_string(), json!("Ada"));
    let created = store.upsert_merge(&user("u1"), &fields).await.unwrap();
    assert!(created.created);
    assert!(created.document["_id"].is_string());

    let mut update = Document::new();
    update.insert("level".to_string(), json!(2));
    let updated = store.upsert_merge(&user("u1"), &update).await.unwrap();
    assert!(!updated.created);
    assert_eq!(updated.document["name"], json!("Ada"));

    store
        .upsert_increment(&user("u1"), "points", &Number::from(3))
        .await
        .unwrap();
    let after = store
        .upsert_increment(&user("u1"), "points", &Number::from(4))
        .await
        .unwrap();
    assert_eq!(after["points"], json!(7));

    let listed = store
        .find_many(&ListQuery {
            ranking_field: "points".to_string(),
            limit: 10,
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let stats = store.storage_stats().await.unwrap();
    assert!(stats.objects >= 1);

    assert_eq!(store.delete_one(&user("u1")).await.unwrap(), 1);
    assert_eq!(store.delete_one(&user("u1")).await.unwrap(), 0);
    store.close().await;
}

#[tokio::test]
async fn test_unreachable_host_is_diagnosed() {
    if test_uri().is_none() {
        return;
    }
    let descriptor = ConnectionDescriptor::resolve(
        Some("mongodb://127.0.0.1:1/?directConnection=true"),
        None,
        None,
        &StoreConfig::default(),
    )
    .unwrap();
    let timeouts = ConnectTimeouts {
        connect: Duration::from_millis(300),
        server_selection: Duration::from_millis(300),
    };
    let failure = MongoConnector::default()
        .connect(&descriptor, &timeouts)
        .await
        .err()
        .unwrap();
    assert_eq!(classify(&failure).code, DiagnosisCode::UnreachableServer);
}
