//! Log-search service client
//!
//! Wraps the service's asynchronous search-job API: submit a job, poll
//! its state until the terminal value, then fetch the aggregated
//! records. Only job-not-yet-done is retried; transport errors and
//! non-2xx responses surface immediately.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use super::query::SearchRequest;

/// Terminal job state reported by the service.
pub const STATE_DONE: &str = "DONE GATHERING RESULTS";

/// Fixed page semantics for the records fetch.
const FETCH_OFFSET: usize = 0;
const FETCH_LIMIT: usize = 100;

/// Identifier of a submitted search job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One aggregated result row as the service returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRecord {
    pub map: RecordFields,
}

/// The field map of a result row.
///
/// The service serializes numeric aggregates as strings in some
/// deployments and as numbers in others; both forms are accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordFields {
    pub period: String,
    pub path: String,
    #[serde(deserialize_with = "string_or_number")]
    pub total_process_time: String,
    #[serde(deserialize_with = "string_or_number")]
    pub count_value: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// Polling budget for [`await_completion`].
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_secs(10),
        }
    }
}

/// The search-job API surface the pipeline depends on.
#[async_trait::async_trait]
pub trait SearchApi: Send + Sync {
    /// Create a search job. Non-2xx responses fail with
    /// [`SearchError::Submission`].
    async fn submit(&self, request: &SearchRequest) -> Result<JobId, SearchError>;

    /// Fetch the current state string of a job.
    async fn job_state(&self, job: &JobId) -> Result<String, SearchError>;

    /// Fetch the records of a completed job (offset 0, fixed page size).
    async fn fetch_records(&self, job: &JobId) -> Result<Vec<SearchRecord>, SearchError>;
}

/// Poll a job until it reaches the terminal state, sleeping
/// `poll.interval` between attempts. Exhausting the attempt budget
/// fails with [`SearchError::JobTimeout`].
pub async fn await_completion(
    api: &dyn SearchApi,
    job: &JobId,
    poll: &PollConfig,
) -> Result<(), SearchError> {
    for attempt in 0..poll.max_attempts {
        let state = api.job_state(job).await?;
        if state == STATE_DONE {
            return Ok(());
        }
        tracing::debug!(job = %job, %state, attempt, "Search job not ready");
        tokio::time::sleep(poll.interval).await;
    }

    Err(SearchError::JobTimeout {
        attempts: poll.max_attempts,
    })
}

/// Submit a request, wait for completion, and fetch the result rows.
pub async fn collect_records(
    api: &dyn SearchApi,
    request: &SearchRequest,
    poll: &PollConfig,
) -> Result<Vec<SearchRecord>, SearchError> {
    let job = api.submit(request).await?;
    tracing::debug!(job = %job, "Search job created");

    await_completion(api, &job, poll).await?;
    api.fetch_records(&job).await
}

/// HTTP client for the log-search service.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
    access_id: String,
    access_key: String,
}

impl SearchClient {
    pub fn new(base_url: impl Into<String>, access_id: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            base_url: base_url.into(),
            access_id: access_id.into(),
            access_key: access_key.into(),
        }
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .basic_auth(&self.access_id, Some(&self.access_key))
            .header("Accept", "application/json")
    }
}

#[async_trait::async_trait]
impl SearchApi for SearchClient {
    async fn submit(&self, request: &SearchRequest) -> Result<JobId, SearchError> {
        let url = format!("{}/search/jobs", self.base_url);

        let response = self
            .authed(self.http.post(&url))
            .json(request)
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Submission(format!("status {status}: {body}")));
        }

        #[derive(Deserialize)]
        struct SubmitResponse {
            id: String,
        }

        let created: SubmitResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(JobId(created.id))
    }

    async fn job_state(&self, job: &JobId) -> Result<String, SearchError> {
        let url = format!("{}/search/jobs/{}", self.base_url, job);

        let response = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::Http {
                status: response.status().as_u16(),
            });
        }

        #[derive(Deserialize)]
        struct JobStatus {
            state: String,
        }

        let status: JobStatus = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(status.state)
    }

    async fn fetch_records(&self, job: &JobId) -> Result<Vec<SearchRecord>, SearchError> {
        let url = format!(
            "{}/search/jobs/{}/records?offset={}&limit={}",
            self.base_url, job, FETCH_OFFSET, FETCH_LIMIT
        );

        let response = self
            .authed(self.http.get(&url))
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::Http {
                status: response.status().as_u16(),
            });
        }

        #[derive(Deserialize)]
        struct RecordsResponse {
            records: Vec<SearchRecord>,
        }

        let results: RecordsResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(results.records)
    }
}

/// Search-service errors
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search job could not be created: {0}")]
    Submission(String),

    #[error("Search service returned status {status}")]
    Http { status: u16 },

    #[error("Search job did not complete within {attempts} attempts")]
    JobTimeout { attempts: u32 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Response decode error: {0}")]
    Decode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// SearchApi stub that replays a scripted sequence of job states.
    struct ScriptedApi {
        states: Mutex<VecDeque<&'static str>>,
    }

    impl ScriptedApi {
        fn new(states: Vec<&'static str>) -> Self {
            Self {
                states: Mutex::new(states.into()),
            }
        }
    }

    #[async_trait::async_trait]
    impl SearchApi for ScriptedApi {
        async fn submit(&self, _request: &SearchRequest) -> Result<JobId, SearchError> {
            Ok(JobId("job-1".to_string()))
        }

        async fn job_state(&self, _job: &JobId) -> Result<String, SearchError> {
            let mut states = self.states.lock();
            Ok(states.pop_front().unwrap_or("GATHERING RESULTS").to_string())
        }

        async fn fetch_records(&self, _job: &JobId) -> Result<Vec<SearchRecord>, SearchError> {
            Ok(vec![])
        }
    }

    fn quick_poll(max_attempts: u32) -> PollConfig {
        PollConfig {
            max_attempts,
            interval: Duration::from_secs(10),
        }
    }

    #[tokio::test]
    async fn test_await_completion_immediate() {
        let api = ScriptedApi::new(vec![STATE_DONE]);
        let result = await_completion(&api, &JobId("j".into()), &quick_poll(1)).await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_completion_after_retries() {
        let api = ScriptedApi::new(vec!["GATHERING RESULTS", "GATHERING RESULTS", STATE_DONE]);
        let result = await_completion(&api, &JobId("j".into()), &quick_poll(5)).await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_completion_timeout() {
        let api = ScriptedApi::new(vec![]);
        let result = await_completion(&api, &JobId("j".into()), &quick_poll(3)).await;

        match result {
            Err(SearchError::JobTimeout { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected JobTimeout, got {:?}", other),
        }
    }

    #[test]
    fn test_record_fields_accept_string_values() {
        let json = r#"{"map": {"period": "2024/04/23", "path": "api/users",
                       "total_process_time": "1234.5", "count_value": "42"}}"#;
        let record: SearchRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.map.period, "2024/04/23");
        assert_eq!(record.map.total_process_time, "1234.5");
        assert_eq!(record.map.count_value, "42");
    }

    #[test]
    fn test_record_fields_accept_numeric_values() {
        let json = r#"{"map": {"period": "2024/04/23", "path": "api/users",
                       "total_process_time": 1234.5, "count_value": 42}}"#;
        let record: SearchRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.map.total_process_time, "1234.5");
        assert_eq!(record.map.count_value, "42");
    }
}
