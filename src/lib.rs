//! Periscope: Daily API Performance Ingestion & Alerting
//!
//! A scheduled batch pipeline over an external log-search service:
//! submit a day-scoped search job, poll it to completion, fetch the
//! aggregated rows, and turn them into per-(date, endpoint) metric
//! records with threshold alerting on top.
//!
//! # Features
//!
//! - **Asynchronous job coordination**: submit, bounded polling, fetch
//! - **Idempotent persistence**: atomic keyed upserts, no duplicates on
//!   re-ingestion
//! - **Endpoint canonicalization**: plural-aware segment rewriting
//! - **Threshold alerting**: per-endpoint conditions over request count
//!   or processing time
//! - **Multi-channel fan-out**: email and voice with partial-failure
//!   isolation
//! - **Range orchestration**: multi-day runs with per-day failure
//!   isolation
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use periscope::alerts::{
//!     AlertNotifier, DisabledEmail, DisabledVoice, StaticAlertSource, TemplateContentGenerator,
//! };
//! use periscope::pipeline::{EndpointRewriter, PipelineOptions, Processor};
//! use periscope::search::SearchClient;
//! use periscope::store::MemoryStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let search = Arc::new(SearchClient::new("https://api.example.com/api/v1", "id", "key"));
//! let notifier = AlertNotifier::new(
//!     Arc::new(TemplateContentGenerator),
//!     Arc::new(DisabledEmail),
//!     Arc::new(DisabledVoice),
//! );
//!
//! let processor = Processor::new(
//!     search,
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(StaticAlertSource::default()),
//!     notifier,
//!     EndpointRewriter::default(),
//!     PipelineOptions::default(),
//! );
//!
//! let summary = processor.process_day("2024-04-23".parse()?).await?;
//! println!("persisted {} rows", summary.rows_persisted);
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod config;
pub mod pipeline;
pub mod search;
pub mod store;

// Re-export commonly used types
pub use config::Settings;
pub use pipeline::{DaySummary, ProcessError, Processor, RangeSummary};
pub use store::{MetricRecord, MetricStore};
