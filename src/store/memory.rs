//! In-memory store backed by concurrent maps
//!
//! The DashMap entry API supplies the atomic insert-if-absent the
//! [`MetricStore`] contract requires, so parallel rows in a batch never
//! need a store-wide lock.

use chrono::NaiveDate;
use dashmap::DashMap;

use super::{EndpointClassification, MetricRecord, MetricStore, StoreError};

/// Concurrent in-memory implementation of [`MetricStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    metrics: DashMap<(NaiveDate, String), MetricRecord>,
    endpoints: DashMap<String, EndpointClassification>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored classifications, ordered by endpoint.
    pub fn classifications(&self) -> Vec<EndpointClassification> {
        let mut rows: Vec<_> = self.endpoints.iter().map(|e| e.value().clone()).collect();
        rows.sort_by(|a, b| a.endpoint.cmp(&b.endpoint));
        rows
    }
}

#[async_trait::async_trait]
impl MetricStore for MemoryStore {
    async fn upsert_metric(&self, record: &MetricRecord) -> Result<(), StoreError> {
        self.metrics
            .entry((record.date, record.endpoint.clone()))
            .and_modify(|existing| {
                existing.request_count = record.request_count;
                existing.avg_processing_time = record.avg_processing_time.clone();
            })
            .or_insert_with(|| record.clone());
        Ok(())
    }

    async fn register_endpoint(&self, endpoint: &str) -> Result<bool, StoreError> {
        let mut inserted = false;
        self.endpoints
            .entry(endpoint.to_string())
            .or_insert_with(|| {
                inserted = true;
                EndpointClassification::bare(endpoint)
            });
        Ok(inserted)
    }

    async fn get_metric(
        &self,
        date: NaiveDate,
        endpoint: &str,
    ) -> Result<Option<MetricRecord>, StoreError> {
        Ok(self
            .metrics
            .get(&(date, endpoint.to_string()))
            .map(|r| r.value().clone()))
    }

    async fn metric_count(&self) -> Result<usize, StoreError> {
        Ok(self.metrics.len())
    }

    async fn endpoint_count(&self) -> Result<usize, StoreError> {
        Ok(self.endpoints.len())
    }
}
