#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;
use users_api::api::MgmtState;
use users_api::config::Config;
use users_api::services::health_service::HealthService;
use users_api::services::user_service::UserService;
use users_api::storage::{self, MongoUserRepository, UserRepository};
use users_api::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    let telemetry_guard = telemetry::init_telemetry(&config.telemetry)?;

    users_api::setup_panic_hook();

    let boot_span = tracing::info_span!("boot_server");
    let (api_listener, mgmt_listener, app_router, mgmt_app, client, shutdown_tx, shutdown_rx) = async {
        // Phase 1: Infrastructure Setup
        let client = storage::init_client(&config.database).await?;
        let database = config.database.database_name();
        tracing::info!(database = %database, collection = %config.database.collection, "database client ready");

        let repo: Arc<dyn UserRepository> =
            Arc::new(MongoUserRepository::new(&client, &database, &config.database.collection));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        users_api::spawn_signal_handler(shutdown_tx.clone());

        // Phase 2: Component Wiring
        let user_service = UserService::new(Arc::clone(&repo));
        let health_service = HealthService::new(repo, config.health.clone());

        // Phase 3: Listeners and Routers
        let app_router = users_api::api::app_router(&config, user_service);
        let mgmt_app = users_api::api::mgmt_router(MgmtState { health_service });

        let api_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        let mgmt_addr: SocketAddr = format!("{}:{}", config.server.host, config.server.mgmt_port).parse()?;

        tracing::info!(address = %api_addr, "listening");
        tracing::info!(address = %mgmt_addr, "management server listening");

        let api_listener = tokio::net::TcpListener::bind(api_addr).await?;
        let mgmt_listener = tokio::net::TcpListener::bind(mgmt_addr).await?;

        Ok::<_, anyhow::Error>((api_listener, mgmt_listener, app_router, mgmt_app, client, shutdown_tx, shutdown_rx))
    }
    .instrument(boot_span)
    .await?;

    // Phase 4: Serve until a shutdown signal
    let mut api_rx = shutdown_rx.clone();
    let api_server = axum::serve(api_listener, app_router).with_graceful_shutdown(async move {
        let _ = api_rx.wait_for(|&s| s).await;
    });

    let mut mgmt_rx = shutdown_rx.clone();
    let mgmt_server = axum::serve(mgmt_listener, mgmt_app).with_graceful_shutdown(async move {
        let _ = mgmt_rx.wait_for(|&s| s).await;
    });

    if let Err(e) = tokio::try_join!(api_server, mgmt_server) {
        tracing::error!(error = %e, "Server error");
    }

    // Phase 5: Close the database client
    let _ = shutdown_tx.send(true);
    tokio::select! {
        () = async { client.shutdown().await } => {
            tracing::info!("Database client closed.");
        }
        () = tokio::time::sleep(std::time::Duration::from_secs(config.server.shutdown_timeout_secs)) => {
            tracing::warn!("Timeout waiting for the database client to close.");
        }
    }

    telemetry_guard.shutdown();
    Ok(())
}
