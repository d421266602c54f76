//! Notification dispatch for triggered alerts
//!
//! Routes an [`AlertEvent`] to the email and/or voice channels selected
//! by its condition. Delivery is best effort per alert: a failing
//! channel is logged and never blocks the other channel or the rest of
//! the batch.

use std::sync::Arc;

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;

use crate::config::{SmtpSettings, VoiceSettings};

use super::config::AlertConfiguration;
use super::content::{fallback_content, ContentGenerator};
use super::evaluator::AlertEvent;

/// Email channel: one message to all recipients.
#[async_trait::async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotifyError>;
}

/// Voice channel: one call per number, speaking `message`. Returns the
/// ids of the calls that were created.
#[async_trait::async_trait]
pub trait VoiceCaller: Send + Sync {
    async fn call(&self, numbers: &[String], message: &str) -> Result<Vec<String>, NotifyError>;
}

/// Dispatcher for triggered alerts.
pub struct AlertNotifier {
    content: Arc<dyn ContentGenerator>,
    email: Arc<dyn EmailSender>,
    voice: Arc<dyn VoiceCaller>,
}

impl AlertNotifier {
    pub fn new(
        content: Arc<dyn ContentGenerator>,
        email: Arc<dyn EmailSender>,
        voice: Arc<dyn VoiceCaller>,
    ) -> Self {
        Self {
            content,
            email,
            voice,
        }
    }

    /// Route one triggered alert through its configured channels.
    /// Infallible from the pipeline's view: every failure is logged and
    /// contained here.
    pub async fn dispatch(&self, event: &AlertEvent, config: &AlertConfiguration) {
        let content = match self.content.generate(event).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    endpoint = %event.endpoint,
                    error = %e,
                    "Content generation failed, using fallback template"
                );
                fallback_content(event)
            }
        };

        if event.alert_type.includes_email() && !config.emails.is_empty() {
            let subject = format!(
                "API Insight Alert: {} {} Threshold Exceeded",
                event.endpoint,
                event.metric_type.description()
            );

            match self.email.send(&config.emails, &subject, &content.html).await {
                Ok(()) => tracing::info!(
                    endpoint = %event.endpoint,
                    recipients = config.emails.len(),
                    "Alert email sent"
                ),
                Err(e) => tracing::error!(
                    endpoint = %event.endpoint,
                    error = %e,
                    "Failed to send alert email"
                ),
            }
        }

        if event.alert_type.includes_phone() && !config.phone_numbers.is_empty() {
            match self.voice.call(&config.phone_numbers, &content.plain).await {
                Ok(calls) => tracing::info!(
                    endpoint = %event.endpoint,
                    calls = calls.len(),
                    "Alert voice calls placed"
                ),
                Err(e) => tracing::error!(
                    endpoint = %event.endpoint,
                    error = %e,
                    "Failed to place alert voice calls"
                ),
            }
        }
    }
}

/// SMTP email channel.
pub struct SmtpEmailSender {
    from: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailSender {
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        let creds = Credentials::new(settings.username.clone(), settings.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| NotifyError::Email(format!("invalid SMTP relay: {e}")))?
            .port(settings.port)
            .credentials(creds)
            .build();

        Ok(Self {
            from: settings.from.clone(),
            transport,
        })
    }
}

#[async_trait::async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(
        &self,
        recipients: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotifyError> {
        let mut builder = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| NotifyError::Email(format!("bad From address: {e}")))?,
            )
            .subject(subject)
            .header(ContentType::TEXT_HTML);

        for recipient in recipients {
            builder = builder.to(recipient
                .parse()
                .map_err(|e| NotifyError::Email(format!("bad recipient {recipient:?}: {e}")))?);
        }

        let email = builder
            .body(html_body.to_string())
            .map_err(|e| NotifyError::Email(e.to_string()))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| NotifyError::Email(e.to_string()))?;

        Ok(())
    }
}

/// Voice channel against a Twilio-style Calls endpoint.
pub struct HttpVoiceCaller {
    http: reqwest::Client,
    call_url: String,
    account: String,
    token: String,
    from: String,
}

impl HttpVoiceCaller {
    pub fn new(settings: &VoiceSettings) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to create HTTP client"),
            call_url: settings.call_url.clone(),
            account: settings.account.clone(),
            token: settings.token.clone(),
            from: settings.from.clone(),
        }
    }

    async fn place_call(&self, number: &str, twiml: &str) -> Result<String, NotifyError> {
        let params = [
            ("To", number),
            ("From", self.from.as_str()),
            ("Twiml", twiml),
        ];

        let response = self
            .http
            .post(&self.call_url)
            .basic_auth(&self.account, Some(&self.token))
            .form(&params)
            .send()
            .await
            .map_err(|e| NotifyError::Voice(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Voice(format!(
                "call to {number} returned status {}",
                response.status()
            )));
        }

        #[derive(Deserialize)]
        struct CallCreated {
            sid: String,
        }

        let created: CallCreated = response
            .json()
            .await
            .map_err(|e| NotifyError::Voice(e.to_string()))?;

        Ok(created.sid)
    }
}

#[async_trait::async_trait]
impl VoiceCaller for HttpVoiceCaller {
    async fn call(&self, numbers: &[String], message: &str) -> Result<Vec<String>, NotifyError> {
        let twiml = format!("<Response><Say>{}</Say><Hangup/></Response>", xml_escape(message));

        let results = futures::future::join_all(
            numbers.iter().map(|number| self.place_call(number, &twiml)),
        )
        .await;

        let mut sids = Vec::new();
        let mut failures = Vec::new();
        for (number, result) in numbers.iter().zip(results) {
            match result {
                Ok(sid) => sids.push(sid),
                Err(e) => {
                    // One bad number must not block the rest
                    tracing::warn!(number = %number, error = %e, "Voice call failed");
                    failures.push(e.to_string());
                }
            }
        }

        if sids.is_empty() && !failures.is_empty() {
            return Err(NotifyError::Voice(failures.join("; ")));
        }

        Ok(sids)
    }
}

fn xml_escape(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Stand-in for an unconfigured email channel.
#[derive(Debug, Clone, Default)]
pub struct DisabledEmail;

#[async_trait::async_trait]
impl EmailSender for DisabledEmail {
    async fn send(&self, recipients: &[String], subject: &str, _html_body: &str) -> Result<(), NotifyError> {
        tracing::warn!(
            recipients = recipients.len(),
            %subject,
            "Email channel not configured, dropping alert email"
        );
        Ok(())
    }
}

/// Stand-in for an unconfigured voice channel.
#[derive(Debug, Clone, Default)]
pub struct DisabledVoice;

#[async_trait::async_trait]
impl VoiceCaller for DisabledVoice {
    async fn call(&self, numbers: &[String], _message: &str) -> Result<Vec<String>, NotifyError> {
        tracing::warn!(
            numbers = numbers.len(),
            "Voice channel not configured, dropping alert calls"
        );
        Ok(vec![])
    }
}

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Email error: {0}")]
    Email(String),

    #[error("Voice call error: {0}")]
    Voice(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::config::{AlertType, MetricType, Operator};
    use crate::alerts::content::{AlertContent, ContentError, TemplateContentGenerator};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingEmail {
        sends: Mutex<Vec<(Vec<String>, String, String)>>,
    }

    #[async_trait::async_trait]
    impl EmailSender for RecordingEmail {
        async fn send(
            &self,
            recipients: &[String],
            subject: &str,
            html_body: &str,
        ) -> Result<(), NotifyError> {
            self.sends.lock().push((
                recipients.to_vec(),
                subject.to_string(),
                html_body.to_string(),
            ));
            Ok(())
        }
    }

    struct FailingEmail;

    #[async_trait::async_trait]
    impl EmailSender for FailingEmail {
        async fn send(&self, _: &[String], _: &str, _: &str) -> Result<(), NotifyError> {
            Err(NotifyError::Email("smtp down".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingVoice {
        calls: Mutex<Vec<(Vec<String>, String)>>,
    }

    #[async_trait::async_trait]
    impl VoiceCaller for RecordingVoice {
        async fn call(&self, numbers: &[String], message: &str) -> Result<Vec<String>, NotifyError> {
            self.calls.lock().push((numbers.to_vec(), message.to_string()));
            Ok(numbers.iter().map(|_| "CA123".to_string()).collect())
        }
    }

    struct FailingGenerator;

    #[async_trait::async_trait]
    impl ContentGenerator for FailingGenerator {
        async fn generate(&self, _: &AlertEvent) -> Result<AlertContent, ContentError> {
            Err(ContentError("model unavailable".to_string()))
        }
    }

    fn make_event(alert_type: AlertType) -> AlertEvent {
        AlertEvent {
            endpoint: "api/users".to_string(),
            metric_type: MetricType::RequestCount,
            value: 150.0,
            threshold: 100.0,
            operator: Operator::GreaterThan,
            alert_type,
            priority: "P1".to_string(),
        }
    }

    fn make_config() -> AlertConfiguration {
        AlertConfiguration {
            emails: vec!["ops@example.com".to_string(), "oncall@example.com".to_string()],
            phone_numbers: vec!["+15550100".to_string()],
            conditions: vec![],
        }
    }

    #[tokio::test]
    async fn test_both_fans_out_once_per_channel() {
        let email = Arc::new(RecordingEmail::default());
        let voice = Arc::new(RecordingVoice::default());
        let notifier = AlertNotifier::new(
            Arc::new(TemplateContentGenerator),
            Arc::clone(&email) as Arc<dyn EmailSender>,
            Arc::clone(&voice) as Arc<dyn VoiceCaller>,
        );

        notifier.dispatch(&make_event(AlertType::Both), &make_config()).await;

        let sends = email.sends.lock();
        assert_eq!(sends.len(), 1);
        let (recipients, subject, _) = &sends[0];
        assert_eq!(recipients.len(), 2);
        assert_eq!(subject, "API Insight Alert: api/users Request Count Threshold Exceeded");

        let calls = voice.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec!["+15550100"]);
    }

    #[tokio::test]
    async fn test_email_only_skips_voice() {
        let email = Arc::new(RecordingEmail::default());
        let voice = Arc::new(RecordingVoice::default());
        let notifier = AlertNotifier::new(
            Arc::new(TemplateContentGenerator),
            Arc::clone(&email) as Arc<dyn EmailSender>,
            Arc::clone(&voice) as Arc<dyn VoiceCaller>,
        );

        notifier.dispatch(&make_event(AlertType::Email), &make_config()).await;

        assert_eq!(email.sends.lock().len(), 1);
        assert!(voice.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_no_recipients_no_send() {
        let email = Arc::new(RecordingEmail::default());
        let voice = Arc::new(RecordingVoice::default());
        let notifier = AlertNotifier::new(
            Arc::new(TemplateContentGenerator),
            Arc::clone(&email) as Arc<dyn EmailSender>,
            Arc::clone(&voice) as Arc<dyn VoiceCaller>,
        );

        let empty = AlertConfiguration::default();
        notifier.dispatch(&make_event(AlertType::Both), &empty).await;

        assert!(email.sends.lock().is_empty());
        assert!(voice.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_generator_failure_falls_back_and_delivers() {
        let email = Arc::new(RecordingEmail::default());
        let voice = Arc::new(RecordingVoice::default());
        let notifier = AlertNotifier::new(
            Arc::new(FailingGenerator),
            Arc::clone(&email) as Arc<dyn EmailSender>,
            Arc::clone(&voice) as Arc<dyn VoiceCaller>,
        );

        notifier.dispatch(&make_event(AlertType::Both), &make_config()).await;

        let sends = email.sends.lock();
        assert_eq!(sends.len(), 1);
        assert!(sends[0].2.contains("has crossed its threshold"));

        let calls = voice.calls.lock();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1.contains("api/users"));
    }

    #[tokio::test]
    async fn test_email_failure_does_not_block_voice() {
        let voice = Arc::new(RecordingVoice::default());
        let notifier = AlertNotifier::new(
            Arc::new(TemplateContentGenerator),
            Arc::new(FailingEmail),
            Arc::clone(&voice) as Arc<dyn VoiceCaller>,
        );

        notifier.dispatch(&make_event(AlertType::Both), &make_config()).await;

        assert_eq!(voice.calls.lock().len(), 1);
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a < b & c"), "a &lt; b &amp; c");
    }
}
