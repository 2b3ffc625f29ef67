//! Procure Sync - Binary Entry Point
//!
//! Connects to the realtime service, keeps the four entity collections in
//! sync and serves the status API until Ctrl+C.

use std::error::Error;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use procure_sync::api::{create_router, AppState};
use procure_sync::types::{Budget, BudgetRequest, Invoice, Transaction};
use procure_sync::{
    JsonlCache, PusherTransport, RealtimeClient, RealtimeConfig, ReconcilerOptions, ServerConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("procure_sync=info")),
        )
        .init();

    let server = ServerConfig::from_env()?;
    let realtime = RealtimeConfig::from_env();

    let cache = JsonlCache::open(&server.cache_dir)?;
    info!(dir = %cache.dir().display(), "fallback cache opened");

    let client =
        RealtimeClient::new(Arc::new(PusherTransport::new())).with_cache(Arc::new(cache));

    let budgets = client.reconciler_with::<Budget>(
        Vec::new(),
        ReconcilerOptions::default().cache_on_change(true),
    );
    let budget_requests = client.reconciler_with::<BudgetRequest>(
        Vec::new(),
        ReconcilerOptions::default().cache_on_change(true),
    );
    let invoices = client.reconciler_with::<Invoice>(
        Vec::new(),
        ReconcilerOptions::default().cache_on_change(true),
    );
    let transactions = client.reconciler_with::<Transaction>(
        Vec::new(),
        ReconcilerOptions::default().cache_on_change(true),
    );

    tokio::spawn(budgets.clone().follow_connection());
    tokio::spawn(budget_requests.clone().follow_connection());
    tokio::spawn(invoices.clone().follow_connection());
    tokio::spawn(transactions.clone().follow_connection());

    client.bus().on(|toast| info!(severity = ?toast.severity, "{}", toast.message));

    // A failed connect is state, not fatal: the API still serves cached data
    // and exposes the reconnect action.
    if let Err(e) = client.connect(&realtime) {
        warn!(error = %e, "realtime connection unavailable");
    }

    let state = AppState::new(client.clone())
        .with_collection(Arc::new(budgets.clone()))
        .with_collection(Arc::new(budget_requests.clone()))
        .with_collection(Arc::new(invoices.clone()))
        .with_collection(Arc::new(transactions.clone()));
    let app = create_router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(server.addr).await?;
    info!(addr = %server.addr, version = procure_sync::VERSION, "status API listening");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl+C");
            }
            info!("shutting down");
        })
        .await;

    budgets.teardown();
    budget_requests.teardown();
    invoices.teardown();
    transactions.teardown();
    client.disconnect();

    served?;
    Ok(())
}
