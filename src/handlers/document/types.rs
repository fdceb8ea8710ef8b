//! Document Types and Common Structures
//!
//! Types shared by the normalizer, executor and store engines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value as JsonValue};

/// Schema-less document: ordered field name to tagged JSON value
pub type Document = Map<String, JsonValue>;

/// Identity key targeting a single document
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Field name of the identity key (e.g. "userId")
    pub field: String,
    /// Value the document must carry in that field
    pub value: JsonValue,
}

impl Identity {
    pub fn new(field: impl Into<String>, value: JsonValue) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }

    /// Whether a document carries this identity
    pub fn matches(&self, document: &Document) -> bool {
        document.get(&self.field) == Some(&self.value)
    }

    /// Identity value rendered for logs and sentinel comparison
    pub fn value_text(&self) -> String {
        match &self.value {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Read-many output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Bare document list
    Raw,
    /// List wrapped with a quota snapshot
    #[default]
    Enriched,
}

impl OutputMode {
    pub fn from_view(view: Option<&str>) -> Self {
        match view {
            Some("raw") => OutputMode::Raw,
            _ => OutputMode::Enriched,
        }
    }
}

/// Parameters of a read-many query
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Field sorted in descending numeric order
    pub ranking_field: String,
    /// Maximum number of documents returned
    pub limit: u32,
}

/// Increment delta, always a finite number
pub type Delta = Number;

/// Result of an upsert-merge
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    /// Document as stored after the merge
    pub document: Document,
    /// True when the upsert created the document
    pub created: bool,
}

/// Raw size statistics reported by the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    /// Database the statistics belong to
    pub database: String,
    /// Uncompressed data size in bytes
    pub data_bytes: u64,
    /// Total index size in bytes
    pub index_bytes: u64,
    /// Allocated storage size in bytes
    pub storage_bytes: u64,
    /// Number of objects (documents)
    pub objects: u64,
    /// Average object size in bytes
    pub avg_object_bytes: f64,
}

/// Point-in-time storage usage against the configured quota
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    pub database: String,
    /// Data plus index bytes
    pub used_bytes: u64,
    /// Quota minus used bytes; negative when over quota
    pub remaining_bytes: i64,
    pub quota_bytes: u64,
    pub objects: u64,
    /// Percentage of the quota in use, two decimals
    pub percent_used: String,
    pub data_bytes: u64,
    pub index_bytes: u64,
    /// Allocated on-disk size; excluded from the used figure
    pub storage_bytes: u64,
    pub avg_object_bytes: f64,
    pub captured_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identity_matches_exact_value() {
        let identity = Identity::new("userId", json!("42"));
        let mut doc = Document::new();
        doc.insert("userId".to_string(), json!("42"));
        assert!(identity.matches(&doc));

        doc.insert("userId".to_string(), json!(42));
        assert!(!identity.matches(&doc));
    }

    #[test]
    fn test_output_mode_from_view() {
        assert_eq!(OutputMode::from_view(Some("raw")), OutputMode::Raw);
        assert_eq!(OutputMode::from_view(Some("full")), OutputMode::Enriched);
        assert_eq!(OutputMode::from_view(None), OutputMode::Enriched);
    }
}
