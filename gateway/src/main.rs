//! Durian Gateway Binary
//!
//! Serves the exchange rate API and the admin offramp review workflow.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use durian_common::{Clock, SystemClock};
use durian_fx::RateService;
use durian_gateway::{create_router, AdminAllowlist, AppState, GatewayConfig};
use durian_ledger::{
    InMemoryOfframpRepository, OfframpRepository, OfframpService, PgOfframpRepository,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting Durian Gateway");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let rates = Arc::new(RateService::with_default_providers(config.rate.service_config())?);

    let repository: Arc<dyn OfframpRepository> = match &config.database_url {
        Some(url) => {
            let repository =
                PgOfframpRepository::connect(url, config.database_max_connections).await?;
            Arc::new(repository)
        }
        None => {
            warn!("DATABASE_URL not set, offramp requests are kept in memory");
            Arc::new(InMemoryOfframpRepository::new())
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let offramps = Arc::new(OfframpService::new(repository, clock));

    let admins = AdminAllowlist::new(&config.admin_emails);
    if admins.is_empty() {
        warn!("ADMIN_EMAILS is empty, admin routes will reject every request");
    }

    let state = AppState::new(rates, offramps, admins);
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(
        listen_addr = %config.listen_addr,
        listen_port = %config.listen_port,
        cache_ttl_secs = config.rate.cache_ttl.num_seconds(),
        "Gateway running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
