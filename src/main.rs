//! HR News Digest, one-shot binary.
//! Runs a single pass over the watchlist and exits 0; meant to be triggered by cron or a CI schedule.

use hr_news_digest::{run_from_settings, Settings};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs by default; `LOG_FORMAT=json` for JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hr_news_digest=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .ok()
        .is_some_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Settings::from_env();
    tracing::info!(
        lookback_hours = settings.lookback_hours,
        seen_file = %settings.seen_file.display(),
        zone = %settings.zone.label,
        "HR news digest starting"
    );

    match run_from_settings(&settings).await {
        Ok(report) => {
            let failed = report.failures().count();
            tracing::info!(
                entities = report.entities.len(),
                failed,
                new = report.new_count(),
                seen_total = report.seen_total,
                notified = report.notified,
                "run finished"
            );
        }
        Err(e) => tracing::error!(error = %format!("{e:#}"), "run aborted"),
    }
}
