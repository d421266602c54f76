//! Alert configuration types
//!
//! The alert configuration is a JSON blob owned by the external
//! configuration subsystem; the pipeline loads it fresh at the start of
//! each day through [`AlertConfigSource`] and treats it as read-only.
//! Wire names ("PTime", ">", "email", ...) match what that subsystem
//! stores, and unrecognized values degrade to fail-safe variants
//! instead of failing the whole load.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Which aggregate a threshold condition targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    ProcessingTime,
    RequestCount,
}

impl MetricType {
    fn parse(raw: &str) -> Self {
        match raw {
            "PTime" | "ProcessingTime" => MetricType::ProcessingTime,
            _ => MetricType::RequestCount,
        }
    }

    fn wire_name(&self) -> &'static str {
        match self {
            MetricType::ProcessingTime => "PTime",
            MetricType::RequestCount => "Count",
        }
    }

    /// Human-readable name used in alert copy.
    pub fn description(&self) -> &'static str {
        match self {
            MetricType::ProcessingTime => "Processing Time",
            MetricType::RequestCount => "Request Count",
        }
    }
}

impl Serialize for MetricType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_name())
    }
}

impl<'de> Deserialize<'de> for MetricType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(MetricType::parse(&raw))
    }
}

/// Threshold comparison operator. Anything the configuration holds
/// that is not one of the six comparators becomes `Unknown`, which
/// never triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Equals,
    NotEquals,
    Unknown,
}

impl Operator {
    pub fn parse(raw: &str) -> Self {
        match raw {
            ">" => Operator::GreaterThan,
            ">=" => Operator::GreaterOrEqual,
            "<" => Operator::LessThan,
            "<=" => Operator::LessOrEqual,
            "==" => Operator::Equals,
            "!=" => Operator::NotEquals,
            _ => Operator::Unknown,
        }
    }

    /// Evaluate `value operator threshold`. `Unknown` is always false.
    pub fn applies(&self, value: f64, threshold: f64) -> bool {
        match self {
            Operator::GreaterThan => value > threshold,
            Operator::GreaterOrEqual => value >= threshold,
            Operator::LessThan => value < threshold,
            Operator::LessOrEqual => value <= threshold,
            Operator::Equals => value == threshold,
            Operator::NotEquals => value != threshold,
            Operator::Unknown => false,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::GreaterThan => ">",
            Operator::GreaterOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessOrEqual => "<=",
            Operator::Equals => "==",
            Operator::NotEquals => "!=",
            Operator::Unknown => "?",
        }
    }

    /// Human-readable phrasing used in alert copy.
    pub fn description(&self) -> &'static str {
        match self {
            Operator::GreaterThan => "exceeds",
            Operator::GreaterOrEqual => "exceeds or equals",
            Operator::LessThan => "is below",
            Operator::LessOrEqual => "is below or equals",
            Operator::Equals => "equals",
            Operator::NotEquals => "does not equal",
            Operator::Unknown => "?",
        }
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.symbol())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Operator::parse(&raw))
    }
}

/// Which channels a triggered condition notifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertType {
    Email,
    Phone,
    Both,
    /// Unrecognized value: notifies no channel.
    None,
}

impl AlertType {
    fn parse(raw: &str) -> Self {
        match raw {
            "email" => AlertType::Email,
            "phone" => AlertType::Phone,
            "both" => AlertType::Both,
            _ => AlertType::None,
        }
    }

    fn wire_name(&self) -> &'static str {
        match self {
            AlertType::Email => "email",
            AlertType::Phone => "phone",
            AlertType::Both => "both",
            AlertType::None => "none",
        }
    }

    pub fn includes_email(&self) -> bool {
        matches!(self, AlertType::Email | AlertType::Both)
    }

    pub fn includes_phone(&self) -> bool {
        matches!(self, AlertType::Phone | AlertType::Both)
    }
}

impl Serialize for AlertType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_name())
    }
}

impl<'de> Deserialize<'de> for AlertType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(AlertType::parse(&raw))
    }
}

/// One per-endpoint threshold rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertCondition {
    /// Canonical endpoint the rule applies to.
    pub api: String,
    pub metric_type: MetricType,
    pub operator: Operator,
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub threshold_value: f64,
    #[serde(default)]
    pub alert_priority: String,
    pub alert_type: AlertType,
}

/// The configuration stores thresholds as numeric strings; accept both.
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("non-numeric threshold {s:?}"))),
    }
}

/// The full alert configuration blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertConfiguration {
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<AlertCondition>,
}

impl AlertConfiguration {
    /// Index conditions by endpoint for the day's evaluation pass.
    /// Duplicate endpoints resolve last-one-wins.
    pub fn condition_index(&self) -> HashMap<String, AlertCondition> {
        self.conditions
            .iter()
            .map(|c| (c.api.clone(), c.clone()))
            .collect()
    }
}

/// Where the day's alert configuration comes from.
#[async_trait::async_trait]
pub trait AlertConfigSource: Send + Sync {
    async fn load(&self) -> Result<AlertConfiguration, AlertConfigError>;
}

/// JSON-file-backed configuration source.
#[derive(Debug, Clone)]
pub struct FileAlertSource {
    path: PathBuf,
}

impl FileAlertSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl AlertConfigSource for FileAlertSource {
    async fn load(&self) -> Result<AlertConfiguration, AlertConfigError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AlertConfigError::Io(format!("{}: {e}", self.path.display())))?;
        serde_json::from_str(&raw).map_err(|e| AlertConfigError::Parse(e.to_string()))
    }
}

/// Fixed in-memory configuration, used when no source is configured.
#[derive(Debug, Clone, Default)]
pub struct StaticAlertSource(pub AlertConfiguration);

#[async_trait::async_trait]
impl AlertConfigSource for StaticAlertSource {
    async fn load(&self) -> Result<AlertConfiguration, AlertConfigError> {
        Ok(self.0.clone())
    }
}

/// Alert configuration errors
#[derive(Debug, thiserror::Error)]
pub enum AlertConfigError {
    #[error("Failed to read alert configuration: {0}")]
    Io(String),

    #[error("Invalid alert configuration: {0}")]
    Parse(String),
}
