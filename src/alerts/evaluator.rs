//! Alert evaluation
//!
//! Matches transformed records against the day's per-endpoint condition
//! index. Evaluation is stateless and re-runs independently on every
//! ingestion pass; a metric that stays over threshold fires a fresh
//! alert each day.

use std::collections::HashMap;

use crate::store::MetricRecord;

use super::config::{AlertCondition, AlertType, MetricType, Operator};

/// A triggered threshold, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub endpoint: String,
    pub metric_type: MetricType,
    pub value: f64,
    pub threshold: f64,
    pub operator: Operator,
    pub alert_type: AlertType,
    pub priority: String,
}

/// Evaluate one record against the condition index. Returns the event
/// to dispatch when the condition holds, `None` otherwise (including
/// for endpoints without a condition, unknown operators, and
/// unparseable observed values).
pub fn evaluate(
    record: &MetricRecord,
    index: &HashMap<String, AlertCondition>,
) -> Option<AlertEvent> {
    let condition = index.get(&record.endpoint)?;

    let value = match condition.metric_type {
        MetricType::ProcessingTime => record.avg_processing_time.trim().parse().ok()?,
        MetricType::RequestCount => record.request_count as f64,
    };

    if !condition.operator.applies(value, condition.threshold_value) {
        return None;
    }

    Some(AlertEvent {
        endpoint: record.endpoint.clone(),
        metric_type: condition.metric_type,
        value,
        threshold: condition.threshold_value,
        operator: condition.operator,
        alert_type: condition.alert_type,
        priority: condition.alert_priority.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_record(endpoint: &str, count: u64, ptime: &str) -> MetricRecord {
        MetricRecord {
            date: "2024-04-23".parse().unwrap(),
            endpoint: endpoint.to_string(),
            request_count: count,
            avg_processing_time: ptime.to_string(),
            created: Utc::now(),
        }
    }

    fn count_condition(endpoint: &str, operator: Operator, threshold: f64) -> AlertCondition {
        AlertCondition {
            api: endpoint.to_string(),
            metric_type: MetricType::RequestCount,
            operator,
            threshold_value: threshold,
            alert_priority: "P2".to_string(),
            alert_type: AlertType::Email,
        }
    }

    fn index_of(condition: AlertCondition) -> HashMap<String, AlertCondition> {
        [(condition.api.clone(), condition)].into()
    }

    #[test]
    fn test_operator_table_at_equal_values() {
        // (value = 10, threshold = 10)
        let cases = [
            (Operator::GreaterThan, false),
            (Operator::GreaterOrEqual, true),
            (Operator::Equals, true),
            (Operator::NotEquals, false),
            (Operator::LessThan, false),
            (Operator::LessOrEqual, true),
            (Operator::Unknown, false),
        ];

        let record = make_record("api/users", 10, "0");
        for (operator, expected) in cases {
            let index = index_of(count_condition("api/users", operator, 10.0));
            assert_eq!(
                evaluate(&record, &index).is_some(),
                expected,
                "operator {operator:?}"
            );
        }
    }

    #[test]
    fn test_no_condition_no_event() {
        let record = make_record("api/users", 1000, "0");
        let index = index_of(count_condition("api/orders", Operator::GreaterThan, 1.0));
        assert!(evaluate(&record, &index).is_none());
    }

    #[test]
    fn test_processing_time_metric_selection() {
        let record = make_record("api/users", 1, "2500.5");
        let mut condition = count_condition("api/users", Operator::GreaterThan, 2000.0);
        condition.metric_type = MetricType::ProcessingTime;

        let event = evaluate(&record, &index_of(condition)).unwrap();
        assert_eq!(event.value, 2500.5);
        assert_eq!(event.metric_type, MetricType::ProcessingTime);
        assert_eq!(event.threshold, 2000.0);
    }

    #[test]
    fn test_unparseable_processing_time_never_fires() {
        let record = make_record("api/users", 1, "not-numeric");
        let mut condition = count_condition("api/users", Operator::GreaterThan, 0.0);
        condition.metric_type = MetricType::ProcessingTime;

        assert!(evaluate(&record, &index_of(condition)).is_none());
    }

    #[test]
    fn test_event_carries_condition_fields() {
        let record = make_record("api/users", 150, "0");
        let mut condition = count_condition("api/users", Operator::GreaterOrEqual, 100.0);
        condition.alert_type = AlertType::Both;
        condition.alert_priority = "P1".to_string();

        let event = evaluate(&record, &index_of(condition)).unwrap();
        assert_eq!(event.endpoint, "api/users");
        assert_eq!(event.value, 150.0);
        assert_eq!(event.alert_type, AlertType::Both);
        assert_eq!(event.priority, "P1");
    }
}
