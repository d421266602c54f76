//! Log-search service integration: query construction, job submission,
//! completion polling, and result fetching.

pub mod client;
pub mod query;

pub use client::{
    await_completion, collect_records, JobId, PollConfig, RecordFields, SearchApi, SearchClient,
    SearchError, SearchRecord, STATE_DONE,
};
pub use query::{unescape_template, SearchRequest, DEFAULT_QUERY_TEMPLATE};
