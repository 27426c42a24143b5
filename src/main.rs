use std::sync::Arc;
use std::time::Instant;

use sucker_monitor::backend::HttpClaimsBackend;
use sucker_monitor::chain::EvmChainQuery;
use sucker_monitor::classifier::BridgeClassifier;
use sucker_monitor::config::Config;
use sucker_monitor::ledger::TransactionLedger;
use sucker_monitor::reconciler::StateReconciler;
use sucker_monitor::server::{self, AppState};

fn main() -> eyre::Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    // Run the async main
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main())
}

async fn async_main() -> eyre::Result<()> {
    // Initialize logging
    init_logging();

    tracing::info!("Starting Sucker Monitor");

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        chains = config.chains.len(),
        backend = %config.backend.base_url,
        "Configuration loaded"
    );

    // Open the transfer ledger
    let ledger = TransactionLedger::open(&config.database.url).await?;
    tracing::info!("Ledger opened and migrated");

    // Build collaborators
    let chain = Arc::new(EvmChainQuery::new(&config.chains)?);
    let backend = Arc::new(HttpClaimsBackend::new(&config.backend.base_url));
    let classifier = Arc::new(BridgeClassifier::new(
        chain.clone(),
        config.deployers.clone(),
        config.unknown_bridge,
    ));

    let reconciler = StateReconciler::new(
        config.reconciler.clone(),
        ledger.clone(),
        chain,
        backend,
        classifier,
    );

    // Create shutdown channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);

    // Setup signal handlers
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(()).await;
    });

    // Start the status server
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let state = AppState {
        ledger: ledger.clone(),
        started: Instant::now(),
    };
    tokio::spawn(async move {
        if let Err(e) = server::serve(addr, state).await {
            tracing::error!(error = %e, "Status server error");
        }
    });

    // Run the reconciler until shutdown
    if let Err(e) = reconciler.run(shutdown_rx).await {
        tracing::error!(error = %e, "Reconciler error");
    }

    tracing::info!("Sucker Monitor stopped");
    Ok(())
}

/// Initialize tracing/logging with structured output
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sucker_monitor=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Wait for shutdown signals (SIGINT/SIGTERM)
async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }
}
