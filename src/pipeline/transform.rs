//! Record transformation
//!
//! Maps one raw search-result row into a canonical [`MetricRecord`]:
//! endpoint rewriting, period/count parsing, and validation of the
//! processing-time aggregate. A row that fails to parse is reported as
//! a [`TransformError`] so the caller can warn and skip it without
//! aborting the batch.

use chrono::{NaiveDate, Utc};

use crate::search::RecordFields;
use crate::store::MetricRecord;

use super::rewrite::EndpointRewriter;

/// Period format used by the search service's day aggregation.
const PERIOD_FORMAT: &str = "%Y/%m/%d";

/// Transform a raw row into a metric record keyed by
/// `(date, rewritten endpoint)`.
pub fn transform(
    fields: &RecordFields,
    rewriter: &EndpointRewriter,
) -> Result<MetricRecord, TransformError> {
    let date = NaiveDate::parse_from_str(&fields.period, PERIOD_FORMAT).map_err(|_| {
        TransformError::BadPeriod {
            value: fields.period.clone(),
        }
    })?;

    let request_count: u64 =
        fields
            .count_value
            .trim()
            .parse()
            .map_err(|_| TransformError::BadCount {
                value: fields.count_value.clone(),
            })?;

    // Kept as text in the record, but it must at least be numeric for
    // the alert evaluator downstream.
    let processing_time = fields.total_process_time.trim();
    if processing_time.parse::<f64>().is_err() {
        return Err(TransformError::BadProcessingTime {
            value: fields.total_process_time.clone(),
        });
    }

    Ok(MetricRecord {
        date,
        endpoint: rewriter.rewrite(&fields.path),
        request_count,
        avg_processing_time: processing_time.to_string(),
        created: Utc::now(),
    })
}

/// Row-level parse failures. Recoverable: the row is skipped with a
/// warning, the batch continues.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Unparseable period {value:?} (expected yyyy/MM/dd)")]
    BadPeriod { value: String },

    #[error("Unparseable request count {value:?}")]
    BadCount { value: String },

    #[error("Unparseable processing time {value:?}")]
    BadProcessingTime { value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn fields(period: &str, path: &str, ptime: &str, count: &str) -> RecordFields {
        RecordFields {
            period: period.to_string(),
            path: path.to_string(),
            total_process_time: ptime.to_string(),
            count_value: count.to_string(),
        }
    }

    #[test]
    fn test_transform_basic_row() {
        let rewriter = EndpointRewriter::default();
        let record = transform(&fields("2024/04/23", "api/users", "812.75", "42"), &rewriter).unwrap();

        assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 4, 23).unwrap());
        assert_eq!(record.endpoint, "api/users");
        assert_eq!(record.request_count, 42);
        assert_eq!(record.avg_processing_time, "812.75");
    }

    #[test]
    fn test_transform_applies_rewrite() {
        let map: HashMap<String, String> = [("message".to_string(), "sms".to_string())].into();
        let rewriter = EndpointRewriter::new(map);

        let record = transform(&fields("2024/04/23", "api/messages/send", "1", "1"), &rewriter).unwrap();
        assert_eq!(record.endpoint, "api/smss/send");
    }

    #[test]
    fn test_transform_rejects_bad_count() {
        let rewriter = EndpointRewriter::default();
        let err = transform(&fields("2024/04/23", "api/users", "1.0", "not-a-number"), &rewriter)
            .unwrap_err();
        assert!(matches!(err, TransformError::BadCount { .. }));
    }

    #[test]
    fn test_transform_rejects_bad_processing_time() {
        let rewriter = EndpointRewriter::default();
        let err =
            transform(&fields("2024/04/23", "api/users", "n/a", "10"), &rewriter).unwrap_err();
        assert!(matches!(err, TransformError::BadProcessingTime { .. }));
    }

    #[test]
    fn test_transform_rejects_bad_period() {
        let rewriter = EndpointRewriter::default();
        let err = transform(&fields("04-23-2024", "api/users", "1.0", "10"), &rewriter).unwrap_err();
        assert!(matches!(err, TransformError::BadPeriod { .. }));
    }
}
