//! Quota Estimator
//!
//! Derives used and remaining capacity from store statistics against a
//! configured ceiling. The ceiling is an assumption, not discovered from the
//! store.

use super::diagnosis::StoreFailure;
use super::engine::DocumentStore;
use super::types::{QuotaSnapshot, StorageStats};
use chrono::Utc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaEstimator {
    ceiling_bytes: u64,
}

impl QuotaEstimator {
    pub fn new(ceiling_bytes: u64) -> Self {
        Self { ceiling_bytes }
    }

    /// Query the store and build a fresh snapshot
    pub async fn snapshot(&self, store: &dyn DocumentStore) -> Result<QuotaSnapshot, StoreFailure> {
        let stats = store.storage_stats().await?;
        Ok(self.estimate(&stats))
    }

    /// Snapshot from already fetched statistics
    pub fn estimate(&self, stats: &StorageStats) -> QuotaSnapshot {
        let used = stats.data_bytes.saturating_add(stats.index_bytes);
        let remaining = self.ceiling_bytes as i128 - used as i128;
        let percent = if self.ceiling_bytes == 0 {
            0.0
        } else {
            used as f64 / self.ceiling_bytes as f64 * 100.0
        };

        QuotaSnapshot {
            database: stats.database.clone(),
            used_bytes: used,
            remaining_bytes: remaining.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
            quota_bytes: self.ceiling_bytes,
            objects: stats.objects,
            percent_used: format!("{:.2}", percent),
            data_bytes: stats.data_bytes,
            index_bytes: stats.index_bytes,
            storage_bytes: stats.storage_bytes,
            avg_object_bytes: stats.avg_object_bytes,
            captured_at: Utc::now(),
        }
    }
}
