//! Intrusion Ledger gateway server

use anyhow::Context;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use intrusion_ledger::{
    config::{GatewayConfig, MonitorConfig},
    create_router, monitor, shutdown_signal, telemetry, AppState, LedgerContext,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize logging
    telemetry::init("intrusion_ledger=debug,tower_http=debug");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Gateway failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    tracing::info!("Intrusion Ledger gateway starting...");

    let config = GatewayConfig::from_env().context("invalid gateway configuration")?;
    tracing::info!("Ledger node: {}", config.rpc_url);

    let context = LedgerContext::connect(&config)
        .await
        .context("could not connect to the ledger")?;

    let shutdown = shutdown_signal();

    // Optional in-process ingestion loop
    let ingest_task = if config.monitor_enabled {
        let monitor_config = MonitorConfig::from_env().context("invalid monitor configuration")?;
        let mut ingest = monitor::build_loop(&monitor_config, Arc::new(context.write_service()))
            .context("could not start the ingestion loop")?;
        let rx = shutdown.clone();
        Some(tokio::spawn(async move { ingest.run(rx).await }))
    } else {
        None
    };

    // Build application state
    let state = AppState::new(&context);
    let app = create_router(state, config.frontend_dir.as_deref());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not bind {}", addr))?;
    tracing::info!("🚀 Server listening on http://{}", addr);

    let mut server_shutdown = shutdown;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*server_shutdown.borrow() {
                if server_shutdown.changed().await.is_err() {
                    break;
                }
            }
            tracing::info!("Shutting down gracefully");
        })
        .await
        .context("server error")?;

    if let Some(task) = ingest_task {
        let report = task.await.context("ingestion loop panicked")?;
        tracing::info!("Ingestion loop finished: {:?}", report);
    }

    Ok(())
}
