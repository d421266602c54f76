//! Process configuration
//!
//! Everything the pipeline needs is resolved here once, at startup, and
//! threaded into constructors. Nothing below `main` reads the environment.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::search::PollConfig;

/// Credentials and endpoint for the external log-search service.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Base URL of the search API, e.g. `https://api.example.com/api/v1`
    pub base_url: String,
    pub access_id: String,
    pub access_key: String,
}

/// SMTP relay settings for the email channel.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender address placed in the From header
    pub from: String,
}

/// Voice-gateway settings for the phone channel.
#[derive(Debug, Clone)]
pub struct VoiceSettings {
    /// Base URL of the call endpoint, e.g. `https://api.twilio.com/2010-04-01/Accounts/AC.../Calls.json`
    pub call_url: String,
    pub account: String,
    pub token: String,
    /// Caller ID the calls originate from
    pub from: String,
}

/// Full pipeline configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub search: SearchSettings,
    /// When false the pipeline still queries the search service but
    /// skips persistence and alerting.
    pub ingest_enabled: bool,
    /// Path-segment rewrite map applied to raw endpoints.
    pub rewrite_map: HashMap<String, String>,
    /// Override for the built-in search query template.
    pub query_template: Option<String>,
    /// Alert configuration file read fresh at the start of each day.
    pub alert_config_path: Option<PathBuf>,
    /// Rows per micro-batch within a day.
    pub batch_size: usize,
    pub poll: PollConfig,
    pub smtp: Option<SmtpSettings>,
    pub voice: Option<VoiceSettings>,
}

impl Settings {
    /// Build settings from `PERISCOPE_*` environment variables.
    ///
    /// Search credentials are required; both notification channels are
    /// optional and simply disabled when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let search = SearchSettings {
            base_url: require("PERISCOPE_BASE_URL")?,
            access_id: require("PERISCOPE_ACCESS_ID")?,
            access_key: require("PERISCOPE_ACCESS_KEY")?,
        };

        let ingest_enabled = std::env::var("PERISCOPE_INGEST_ENABLED")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(true);

        let rewrite_map = match std::env::var("PERISCOPE_REWRITE_MAP") {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|e| ConfigError::InvalidRewriteMap(e.to_string()))?,
            Err(_) => HashMap::new(),
        };

        let query_template = std::env::var("PERISCOPE_QUERY").ok();
        let alert_config_path = std::env::var("PERISCOPE_ALERT_CONFIG").ok().map(PathBuf::from);

        let batch_size = std::env::var("PERISCOPE_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(100);

        let mut poll = PollConfig::default();
        if let Some(n) = std::env::var("PERISCOPE_POLL_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            poll.max_attempts = n;
        }
        if let Some(secs) = std::env::var("PERISCOPE_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            poll.interval = std::time::Duration::from_secs(secs);
        }

        let smtp = match std::env::var("PERISCOPE_SMTP_HOST") {
            Ok(host) => Some(SmtpSettings {
                host,
                port: std::env::var("PERISCOPE_SMTP_PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(587),
                username: require("PERISCOPE_SMTP_USER")?,
                password: require("PERISCOPE_SMTP_PASS")?,
                from: require("PERISCOPE_SMTP_FROM")?,
            }),
            Err(_) => None,
        };

        let voice = match std::env::var("PERISCOPE_VOICE_URL") {
            Ok(call_url) => Some(VoiceSettings {
                call_url,
                account: require("PERISCOPE_VOICE_ACCOUNT")?,
                token: require("PERISCOPE_VOICE_TOKEN")?,
                from: require("PERISCOPE_VOICE_FROM")?,
            }),
            Err(_) => None,
        };

        Ok(Self {
            search,
            ingest_enabled,
            rewrite_map,
            query_template,
            alert_config_path,
            batch_size,
            poll,
            smtp,
            voice,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("PERISCOPE_REWRITE_MAP is not a valid JSON object: {0}")]
    InvalidRewriteMap(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_map_parses() {
        let map: HashMap<String, String> =
            serde_json::from_str(r#"{"message": "sms", "user": "account"}"#).unwrap();
        assert_eq!(map.get("message"), Some(&"sms".to_string()));
        assert_eq!(map.len(), 2);
    }
}
