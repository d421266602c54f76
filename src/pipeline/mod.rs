//! The ingestion pipeline: endpoint rewriting, record transformation,
//! and the day/range orchestration that ties search, store, and
//! alerting together.

pub mod processor;
pub mod rewrite;
pub mod transform;

pub use processor::{DaySummary, PipelineOptions, ProcessError, Processor, RangeSummary};
pub use rewrite::EndpointRewriter;
pub use transform::{transform, TransformError};
