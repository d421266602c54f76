//! Search query construction
//!
//! Builds the day-scoped search request sent to the log-search service.
//! The query template lives in configuration with escaped control
//! characters; [`unescape_template`] restores the form the service
//! expects. Query syntax is not validated here -- a malformed template
//! fails at the service boundary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default aggregation template: per-day request count and summed
/// processing time grouped by path. Stored in escaped form, like a
/// configuration-supplied template.
pub const DEFAULT_QUERY_TEMPLATE: &str = r#"_sourceCategory=api_access_logs\n| parse \"* * * * * *\" as ts, client, method, path, status, process_time nodrop\n| timeslice 1d | formatDate(_timeslice, \"yyyy/MM/dd\") as period\n| sum(process_time) as total_process_time, count as count_value by period, path\n| fields path, total_process_time, period, count_value | sort by total_process_time"#;

/// A search job request as the service's `POST /search/jobs` expects it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "timeZone")]
    pub time_zone: String,
}

impl SearchRequest {
    /// Build a request covering one whole UTC calendar day.
    pub fn for_day(template: &str, date: NaiveDate) -> Self {
        let day = date.format("%Y-%m-%d");
        Self {
            query: unescape_template(template),
            from: format!("{day}T00:00:00"),
            to: format!("{day}T23:59:59"),
            time_zone: "UTC".to_string(),
        }
    }
}

/// Restore a template stored with escaped control characters: `\n`
/// escape sequences become single spaces and remaining backslashes are
/// stripped.
pub fn unescape_template(template: &str) -> String {
    template.replace("\\n", " ").replace('\\', "")
}
