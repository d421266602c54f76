//! Day pipeline and range orchestration
//!
//! One [`Processor`] instance, constructed once with all of its
//! collaborators, drives the full pass for a day: search, transform,
//! upsert, alert, notify. Rows inside a micro-batch run in parallel and
//! join before the next batch; days inside a range run sequentially and
//! fail independently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use crate::alerts::config::{AlertCondition, AlertConfigError, AlertConfigSource, AlertConfiguration};
use crate::alerts::evaluator::evaluate;
use crate::alerts::notifier::AlertNotifier;
use crate::search::{collect_records, PollConfig, SearchApi, SearchError, SearchRecord, SearchRequest, DEFAULT_QUERY_TEMPLATE};
use crate::store::{MetricStore, StoreError};

use super::rewrite::EndpointRewriter;
use super::transform::transform;

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Search query template (stored escaped form).
    pub query_template: String,
    /// Rows per micro-batch.
    pub batch_size: usize,
    pub poll: PollConfig,
    /// When false, days are queried but nothing is persisted or alerted.
    pub ingest_enabled: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            query_template: DEFAULT_QUERY_TEMPLATE.to_string(),
            batch_size: 100,
            poll: PollConfig::default(),
            ingest_enabled: true,
        }
    }
}

/// Outcome of one day's pass.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub rows_fetched: usize,
    pub rows_persisted: usize,
    /// Malformed rows skipped with a warning.
    pub rows_skipped: usize,
    pub alerts_fired: usize,
}

/// Outcome of a range pass. Failed days are logged, counted, and do not
/// abort the range.
#[derive(Debug, Clone, Serialize)]
pub struct RangeSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days_processed: usize,
    pub days_failed: usize,
    pub rows_persisted: usize,
    pub alerts_fired: usize,
}

enum RowOutcome {
    Persisted { alerted: bool },
    Skipped,
}

/// The ingestion pipeline, fully parameterized at construction.
pub struct Processor {
    search: Arc<dyn SearchApi>,
    store: Arc<dyn MetricStore>,
    alert_source: Arc<dyn AlertConfigSource>,
    notifier: AlertNotifier,
    rewriter: EndpointRewriter,
    options: PipelineOptions,
}

impl Processor {
    pub fn new(
        search: Arc<dyn SearchApi>,
        store: Arc<dyn MetricStore>,
        alert_source: Arc<dyn AlertConfigSource>,
        notifier: AlertNotifier,
        rewriter: EndpointRewriter,
        options: PipelineOptions,
    ) -> Self {
        Self {
            search,
            store,
            alert_source,
            notifier,
            rewriter,
            options,
        }
    }

    /// Run the full pipeline for one calendar day.
    pub async fn process_day(&self, date: NaiveDate) -> Result<DaySummary, ProcessError> {
        tracing::info!(%date, "Processing logs for day");

        let request = SearchRequest::for_day(&self.options.query_template, date);
        let records = collect_records(self.search.as_ref(), &request, &self.options.poll).await?;
        let rows_fetched = records.len();

        if !self.options.ingest_enabled {
            tracing::info!(
                %date,
                rows = rows_fetched,
                "Ingestion disabled, skipping persistence and alerting"
            );
            return Ok(DaySummary {
                date,
                rows_fetched,
                rows_persisted: 0,
                rows_skipped: 0,
                alerts_fired: 0,
            });
        }

        // Read fresh each day; immutable for the rest of the pass
        let alert_config = self.alert_source.load().await?;
        let conditions = alert_config.condition_index();

        let mut rows_persisted = 0;
        let mut rows_skipped = 0;
        let mut alerts_fired = 0;

        for batch in records.chunks(self.options.batch_size) {
            let outcomes = futures::future::join_all(
                batch
                    .iter()
                    .map(|record| self.process_row(record, &conditions, &alert_config)),
            )
            .await;

            // All rows of the batch have completed; now surface the
            // first failure, if any. Completed siblings stay committed.
            let mut first_error = None;
            for outcome in outcomes {
                match outcome {
                    Ok(RowOutcome::Persisted { alerted }) => {
                        rows_persisted += 1;
                        if alerted {
                            alerts_fired += 1;
                        }
                    }
                    Ok(RowOutcome::Skipped) => rows_skipped += 1,
                    Err(e) => {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }
            if let Some(e) = first_error {
                return Err(e);
            }

            tracing::info!(
                %date,
                processed = rows_persisted + rows_skipped,
                total = rows_fetched,
                "Batch complete"
            );
        }

        let summary = DaySummary {
            date,
            rows_fetched,
            rows_persisted,
            rows_skipped,
            alerts_fired,
        };
        tracing::info!(
            %date,
            persisted = summary.rows_persisted,
            skipped = summary.rows_skipped,
            alerts = summary.alerts_fired,
            "Day complete"
        );
        Ok(summary)
    }

    /// Run the pipeline for every day from `start` to `end` inclusive.
    /// The range is validated before any day is touched; individual day
    /// failures are logged and the loop continues.
    pub async fn process_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RangeSummary, ProcessError> {
        if start > end {
            return Err(ProcessError::InvalidRange { start, end });
        }

        tracing::info!(%start, %end, "Processing day range");

        let mut summary = RangeSummary {
            start,
            end,
            days_processed: 0,
            days_failed: 0,
            rows_persisted: 0,
            alerts_fired: 0,
        };

        let mut date = start;
        loop {
            match self.process_day(date).await {
                Ok(day) => {
                    summary.days_processed += 1;
                    summary.rows_persisted += day.rows_persisted;
                    summary.alerts_fired += day.alerts_fired;
                }
                Err(e) => {
                    summary.days_failed += 1;
                    tracing::error!(%date, error = %e, "Day failed, continuing with the rest of the range");
                }
            }

            if date == end {
                break;
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        tracing::info!(
            processed = summary.days_processed,
            failed = summary.days_failed,
            "Range complete"
        );
        Ok(summary)
    }

    async fn process_row(
        &self,
        record: &SearchRecord,
        conditions: &HashMap<String, AlertCondition>,
        alert_config: &AlertConfiguration,
    ) -> Result<RowOutcome, ProcessError> {
        let metric = match transform(&record.map, &self.rewriter) {
            Ok(metric) => metric,
            Err(e) => {
                tracing::warn!(path = %record.map.path, error = %e, "Skipping malformed record");
                return Ok(RowOutcome::Skipped);
            }
        };

        let mut alerted = false;
        if let Some(event) = evaluate(&metric, conditions) {
            tracing::info!(
                endpoint = %event.endpoint,
                value = event.value,
                threshold = event.threshold,
                operator = event.operator.symbol(),
                "Alert condition triggered"
            );
            self.notifier.dispatch(&event, alert_config).await;
            alerted = true;
        }

        if self.store.register_endpoint(&metric.endpoint).await? {
            tracing::debug!(endpoint = %metric.endpoint, "Registered new endpoint");
        }
        self.store.upsert_metric(&metric).await?;

        Ok(RowOutcome::Persisted { alerted })
    }
}

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("Store write failed: {0}")]
    Store(#[from] StoreError),

    #[error("Alert configuration unavailable: {0}")]
    Config(#[from] AlertConfigError),
}
