//! Analytics store
//!
//! Persisted entities and the storage seam the pipeline writes through.
//! Uniqueness is enforced on `(date, endpoint)` for metrics and on
//! `endpoint` for classifications; both writes must be atomic
//! insert-if-absent primitives so parallel rows within a batch cannot
//! race into duplicates.

pub mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One metrics row per `(date, endpoint)` per day.
///
/// `avg_processing_time` stays in its source string form to preserve
/// the service's formatting and precision. Serde renames carry the
/// logical column names at the storage boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub date: NaiveDate,
    #[serde(rename = "api_endpoint")]
    pub endpoint: String,
    #[serde(rename = "count")]
    pub request_count: u64,
    #[serde(rename = "avg_p_time")]
    pub avg_processing_time: String,
    /// Set on first insert, never updated.
    pub created: DateTime<Utc>,
}

/// One classification row per distinct endpoint ever observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointClassification {
    #[serde(rename = "api_endpoint")]
    pub endpoint: String,
    pub classification_color: Option<String>,
    pub classification_data: Option<String>,
    pub created: DateTime<Utc>,
}

impl EndpointClassification {
    /// A bare row as the pipeline registers it: no color, no data.
    pub fn bare(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            classification_color: None,
            classification_data: None,
            created: Utc::now(),
        }
    }
}

/// Storage seam for the pipeline's writes.
#[async_trait::async_trait]
pub trait MetricStore: Send + Sync {
    /// Keyed upsert on `(date, endpoint)`: create if absent, else
    /// replace `request_count`/`avg_processing_time` keeping `created`.
    async fn upsert_metric(&self, record: &MetricRecord) -> Result<(), StoreError>;

    /// Insert a bare classification row if the endpoint has never been
    /// seen. Returns true iff a row was created.
    async fn register_endpoint(&self, endpoint: &str) -> Result<bool, StoreError>;

    async fn get_metric(
        &self,
        date: NaiveDate,
        endpoint: &str,
    ) -> Result<Option<MetricRecord>, StoreError>;

    async fn metric_count(&self) -> Result<usize, StoreError>;

    async fn endpoint_count(&self) -> Result<usize, StoreError>;
}

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),
}
