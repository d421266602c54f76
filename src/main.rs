//! Periscope batch job
//!
//! Run with: cargo run -- [--date YYYY-MM-DD | --start-date YYYY-MM-DD --end-date YYYY-MM-DD]
//!
//! With no date flags the current UTC day is processed. Typical crontab
//! entry for a daily midnight run:
//!
//!   0 0 * * * /usr/local/bin/periscope
//!
//! Environment variables:
//! - PERISCOPE_BASE_URL / PERISCOPE_ACCESS_ID / PERISCOPE_ACCESS_KEY:
//!   search-service endpoint and credentials (required)
//! - PERISCOPE_INGEST_ENABLED: set to "false" to query without writing
//! - PERISCOPE_REWRITE_MAP: JSON object of path segment -> canonical segment
//! - PERISCOPE_QUERY: override for the built-in query template
//! - PERISCOPE_ALERT_CONFIG: path to the alert configuration JSON
//! - PERISCOPE_SMTP_HOST/_PORT/_USER/_PASS/_FROM: email channel (optional)
//! - PERISCOPE_VOICE_URL/_ACCOUNT/_TOKEN/_FROM: voice channel (optional)
//! - RUST_LOG: log level (default: info)

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use periscope::alerts::{
    AlertConfigSource, AlertNotifier, DisabledEmail, DisabledVoice, EmailSender, FileAlertSource,
    HttpVoiceCaller, SmtpEmailSender, StaticAlertSource, TemplateContentGenerator, VoiceCaller,
};
use periscope::config::Settings;
use periscope::pipeline::{EndpointRewriter, PipelineOptions, Processor};
use periscope::search::{SearchClient, DEFAULT_QUERY_TEMPLATE};
use periscope::store::MemoryStore;

#[derive(Parser)]
#[command(name = "periscope", version, about = "Daily API performance ingestion and alerting")]
struct Opts {
    /// Single date to process (YYYY-MM-DD); defaults to the current UTC day
    #[arg(short = 'd', long, conflicts_with_all = ["start_date", "end_date"])]
    date: Option<NaiveDate>,

    /// First day of an inclusive range
    #[arg(short = 's', long, requires = "end_date")]
    start_date: Option<NaiveDate>,

    /// Last day of an inclusive range
    #[arg(short = 'e', long, requires = "start_date")]
    end_date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "periscope=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let opts = Opts::parse();
    let settings = Settings::from_env()?;

    tracing::info!("Periscope configuration:");
    tracing::info!("  Search service: {}", settings.search.base_url);
    tracing::info!("  Ingestion enabled: {}", settings.ingest_enabled);
    tracing::info!("  Batch size: {}", settings.batch_size);
    tracing::info!(
        "  Poll budget: {} attempts x {:?}",
        settings.poll.max_attempts,
        settings.poll.interval
    );
    tracing::info!("  Rewrite map entries: {}", settings.rewrite_map.len());
    tracing::info!("  Email channel: {}", if settings.smtp.is_some() { "smtp" } else { "disabled" });
    tracing::info!("  Voice channel: {}", if settings.voice.is_some() { "http" } else { "disabled" });

    let search = Arc::new(SearchClient::new(
        &settings.search.base_url,
        &settings.search.access_id,
        &settings.search.access_key,
    ));

    let alert_source: Arc<dyn AlertConfigSource> = match &settings.alert_config_path {
        Some(path) => Arc::new(FileAlertSource::new(path)),
        None => Arc::new(StaticAlertSource::default()),
    };

    let email: Arc<dyn EmailSender> = match &settings.smtp {
        Some(smtp) => Arc::new(SmtpEmailSender::new(smtp)?),
        None => Arc::new(DisabledEmail),
    };
    let voice: Arc<dyn VoiceCaller> = match &settings.voice {
        Some(voice) => Arc::new(HttpVoiceCaller::new(voice)),
        None => Arc::new(DisabledVoice),
    };
    let notifier = AlertNotifier::new(Arc::new(TemplateContentGenerator), email, voice);

    let options = PipelineOptions {
        query_template: settings
            .query_template
            .clone()
            .unwrap_or_else(|| DEFAULT_QUERY_TEMPLATE.to_string()),
        batch_size: settings.batch_size,
        poll: settings.poll.clone(),
        ingest_enabled: settings.ingest_enabled,
    };

    let processor = Processor::new(
        search,
        Arc::new(MemoryStore::new()),
        alert_source,
        notifier,
        EndpointRewriter::new(settings.rewrite_map.clone()),
        options,
    );

    if let (Some(start), Some(end)) = (opts.start_date, opts.end_date) {
        // Per-day failures inside a valid range are logged, not fatal
        let summary = processor.process_range(start, end).await?;
        if summary.days_failed > 0 {
            tracing::warn!(
                failed = summary.days_failed,
                processed = summary.days_processed,
                "Range finished with failed days"
            );
        }
    } else {
        let date = opts.date.unwrap_or_else(|| Utc::now().date_naive());
        let summary = processor.process_day(date).await?;
        tracing::info!(
            persisted = summary.rows_persisted,
            alerts = summary.alerts_fired,
            "Log processing completed successfully"
        );
    }

    Ok(())
}
