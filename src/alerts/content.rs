//! Alert copy generation
//!
//! The real deployment generates alert bodies through an external
//! AI-backed collaborator; the pipeline only depends on the
//! [`ContentGenerator`] seam. [`fallback_content`] renders the static
//! template used both as the built-in generator and as the dispatcher's
//! fallback when the collaborator fails.

use super::evaluator::AlertEvent;

/// Rendered alert body in both delivery formats.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertContent {
    pub plain: String,
    pub html: String,
}

/// External content-generation collaborator.
#[async_trait::async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, event: &AlertEvent) -> Result<AlertContent, ContentError>;
}

/// Content generation errors
#[derive(Debug, thiserror::Error)]
#[error("Content generation failed: {0}")]
pub struct ContentError(pub String);

/// Render the static alert template for an event.
pub fn fallback_content(event: &AlertEvent) -> AlertContent {
    let metric = event.metric_type.description();
    let condition = event.operator.description();

    let plain = format!(
        "ALERT: API Endpoint {endpoint} has crossed its threshold.\n\
         Details:\n\
         - Metric Type: {metric}\n\
         - Current Value: {value}\n\
         - Threshold: {threshold}\n\
         - Condition: {condition}\n\
         \n\
         Please investigate this issue promptly.",
        endpoint = event.endpoint,
        value = event.value,
        threshold = event.threshold,
    );

    let html = format!(
        "<div style=\"font-family: Arial, sans-serif; line-height: 1.6;\">\n\
         <p>This is an automated alert from the API monitoring pipeline.</p>\n\
         <h3>ALERT: API Endpoint {endpoint} has crossed its threshold.</h3>\n\
         <ul>\n\
         <li><strong>Metric Type:</strong> {metric}</li>\n\
         <li><strong>Current Value:</strong> {value}</li>\n\
         <li><strong>Threshold:</strong> {threshold}</li>\n\
         <li><strong>Condition:</strong> {condition}</li>\n\
         </ul>\n\
         <p>Please investigate this issue promptly.</p>\n\
         </div>",
        endpoint = event.endpoint,
        value = event.value,
        threshold = event.threshold,
    );

    AlertContent { plain, html }
}

/// Built-in generator that renders the static template.
#[derive(Debug, Clone, Default)]
pub struct TemplateContentGenerator;

#[async_trait::async_trait]
impl ContentGenerator for TemplateContentGenerator {
    async fn generate(&self, event: &AlertEvent) -> Result<AlertContent, ContentError> {
        Ok(fallback_content(event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::config::{AlertType, MetricType, Operator};

    fn make_event() -> AlertEvent {
        AlertEvent {
            endpoint: "api/users".to_string(),
            metric_type: MetricType::ProcessingTime,
            value: 2500.0,
            threshold: 2000.0,
            operator: Operator::GreaterThan,
            alert_type: AlertType::Email,
            priority: "P1".to_string(),
        }
    }

    #[test]
    fn test_fallback_carries_event_fields() {
        let content = fallback_content(&make_event());

        for body in [&content.plain, &content.html] {
            assert!(body.contains("api/users"));
            assert!(body.contains("Processing Time"));
            assert!(body.contains("2500"));
            assert!(body.contains("2000"));
            assert!(body.contains("exceeds"));
        }
    }

    #[tokio::test]
    async fn test_template_generator_never_fails() {
        let content = TemplateContentGenerator
            .generate(&make_event())
            .await
            .unwrap();
        assert!(!content.plain.is_empty());
        assert!(content.html.starts_with("<div"));
    }
}
