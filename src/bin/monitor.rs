//! Standalone ingestion loop
//!
//! Samples, classifies and submits verdicts to a running gateway over HTTP.

use anyhow::Context;
use std::process::ExitCode;
use std::sync::Arc;

use intrusion_ledger::{
    config::MonitorConfig,
    monitor::{self, HttpSubmitter},
    shutdown_signal, telemetry,
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    telemetry::init("intrusion_ledger=info,monitor=info");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Monitor failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = MonitorConfig::from_env().context("invalid monitor configuration")?;

    let submitter = HttpSubmitter::new(&config.gateway_url, config.submit_timeout)
        .context("could not build HTTP client")?;
    tracing::info!("Submitting verdicts to {}", submitter.endpoint());

    let mut ingest = monitor::build_loop(&config, Arc::new(submitter))
        .context("could not start the ingestion loop")?;

    let report = ingest.run(shutdown_signal()).await;
    println!(
        "cycles={} submitted={} dropped={} unclassified={}",
        report.cycles, report.submitted, report.dropped, report.unclassified
    );

    Ok(())
}
