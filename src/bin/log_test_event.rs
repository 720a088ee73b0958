//! Append one test event and read the count back.

use anyhow::Context;
use std::process::ExitCode;

use intrusion_ledger::{config::GatewayConfig, telemetry, LedgerContext};

const TEST_DEVICE: &str = "Test_Device_From_Script";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    telemetry::init("intrusion_ledger=info");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Test event failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env().context("invalid gateway configuration")?;
    let context = LedgerContext::connect(&config)
        .await
        .context("could not connect to the ledger")?;

    let receipt = context
        .write_service()
        .submit(TEST_DEVICE, 1)
        .await
        .context("could not append test event")?;
    println!("Logged test event, transaction: {}", receipt.tx_hash);

    let count = context
        .query_service()
        .count()
        .await
        .context("could not read event count")?;
    println!("Total events on ledger: {}", count);

    Ok(())
}
