mod bootstrap;

use anyhow::{bail, Result};
use clap::Parser;
use metro_core::settings::Settings;
use metro_data::source::HttpStatusSource;
use metro_data::store::JsonStateStore;
use metro_runtime::publishers::build_publishers;
use metro_runtime::StatusChecker;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let settings = Settings::parse();
    bootstrap::setup_logging(settings.effective_log_level())?;

    let config = match settings.into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return Err(e.into());
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        lines = ?config.lines,
        channels = ?config.channels,
        pretend = config.pretend,
        "metrobot starting"
    );

    let client = bootstrap::http_client(config.http_timeout)?;
    let publishers = build_publishers(&config, &client)?;

    if !config.pretend {
        for publisher in &publishers {
            if let Err(e) = publisher.verify().await {
                tracing::error!(channel = publisher.name(), error = %e, "credential check failed");
                bail!("credential check failed for {}: {}", publisher.name(), e);
            }
        }
    }

    let checker = StatusChecker::new(
        Box::new(HttpStatusSource::new(client, config.status_url.clone())),
        Box::new(JsonStateStore::new(config.state_file.clone())),
        publishers,
        config.lines.clone(),
        config.policy,
    )
    .pretend(config.pretend);

    let report = match checker.check().await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "check failed");
            return Err(e.into());
        }
    };

    tracing::info!(
        changes = report.events.len(),
        delivered = report.delivered,
        failed = report.failures.len(),
        committed = report.committed,
        "check complete"
    );

    if !report.is_clean() {
        bail!(
            "{} of {} deliveries failed",
            report.failures.len(),
            report.failures.len() + report.delivered
        );
    }

    Ok(())
}
