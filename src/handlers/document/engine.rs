//! Document Store Abstraction Layer
//!
//! Unified interface over document store engines (MongoDB, in-memory).

use super::descriptor::ConnectionDescriptor;
use super::diagnosis::StoreFailure;
use super::types::{Delta, Document, Identity, ListQuery, StorageStats, UpsertOutcome};
use async_trait::async_trait;
use std::time::Duration;

/// Timeouts applied while opening a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectTimeouts {
    /// TCP/TLS connect timeout
    pub connect: Duration,
    /// Server selection timeout
    pub server_selection: Duration,
}

impl ConnectTimeouts {
    /// Upper bound for the whole open sequence
    pub fn total(&self) -> Duration {
        self.connect + self.server_selection
    }
}

impl Default for ConnectTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            server_selection: Duration::from_secs(5),
        }
    }
}

/// Opens one live connection per request
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Engine name for logs
    fn engine_name(&self) -> &'static str;

    /// Connect to the described endpoint and verify it is reachable
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
        timeouts: &ConnectTimeouts,
    ) -> Result<Box<dyn DocumentStore>, StoreFailure>;
}

/// Operations on one collection over one live connection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find the document carrying the identity
    async fn find_one(&self, identity: &Identity) -> Result<Option<Document>, StoreFailure>;

    /// Documents ordered by descending ranking field, at most `limit`
    async fn find_many(&self, query: &ListQuery) -> Result<Vec<Document>, StoreFailure>;

    /// Field-level merge by identity, creating the document if absent
    async fn upsert_merge(
        &self,
        identity: &Identity,
        fields: &Document,
    ) -> Result<UpsertOutcome, StoreFailure>;

    /// Atomically add `delta` to `field`, creating the document if absent
    async fn upsert_increment(
        &self,
        identity: &Identity,
        field: &str,
        delta: &Delta,
    ) -> Result<Document, StoreFailure>;

    /// Delete the document carrying the identity; returns 0 or 1
    async fn delete_one(&self, identity: &Identity) -> Result<u64, StoreFailure>;

    /// Delete every document in the collection
    async fn delete_all(&self) -> Result<u64, StoreFailure>;

    /// Database-level size statistics
    async fn storage_stats(&self) -> Result<StorageStats, StoreFailure>;

    /// Release the connection
    async fn close(self: Box<Self>);
}
