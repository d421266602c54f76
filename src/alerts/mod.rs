//! Threshold alerting: configuration, evaluation, copy generation, and
//! multi-channel notification dispatch.

pub mod config;
pub mod content;
pub mod evaluator;
pub mod notifier;

pub use config::{
    AlertCondition, AlertConfigError, AlertConfigSource, AlertConfiguration, AlertType,
    FileAlertSource, MetricType, Operator, StaticAlertSource,
};
pub use content::{fallback_content, AlertContent, ContentError, ContentGenerator, TemplateContentGenerator};
pub use evaluator::{evaluate, AlertEvent};
pub use notifier::{
    AlertNotifier, DisabledEmail, DisabledVoice, EmailSender, HttpVoiceCaller, NotifyError,
    SmtpEmailSender, VoiceCaller,
};
