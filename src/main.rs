use backoffice_auth::app::{AppConfig, AppContext, Backends};
use backoffice_auth::config::{logging, parameter};
use backoffice_auth::handler::health_handler;
use backoffice_auth::routes;
use backoffice_auth::service::cleanup_service::start_cleanup_task;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize configuration
    parameter::init();

    // Structured logging, then the environment-aware logging policy
    logging::init_subscriber();
    logging::init();
    info!(
        "Starting {} with {} configuration parameters",
        parameter::get_optional("APP_NAME").unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string()),
        parameter::get_all().len()
    );

    health_handler::init_start_time();

    let backends = match Backends::from_parameters().await {
        Ok(backends) => backends,
        Err(e) => {
            error!("Failed to initialize storage backend: {}", e);
            return Err(e.into());
        }
    };
    info!("Storage backend: {}", backends.name);

    // Fails fast on a missing or short JWT secret
    let context = match AppContext::build(backends, AppConfig::from_parameters()) {
        Ok(context) => context,
        Err(e) => {
            error!("Failed to initialize services: {}", e);
            return Err(e.into());
        }
    };

    let host = format!("{}:{}", parameter::get("SERVER_ADDRESS"), parameter::get("SERVER_PORT"));
    info!("Server will bind to: {}", host);

    let cleanup_interval_minutes = parameter::get_u64("TOKEN_CLEANUP_INTERVAL_MINUTES");
    info!("Token cleanup interval: {} minutes", cleanup_interval_minutes);

    let cleanup_shutdown_token = CancellationToken::new();
    let cleanup_task_handle = start_cleanup_task(
        context.cleanup_service.clone(),
        cleanup_interval_minutes,
        cleanup_shutdown_token.clone(),
    );

    let listener = match tokio::net::TcpListener::bind(&host).await {
        Ok(listener) => {
            info!("Server successfully bound to {}", host);
            listener
        }
        Err(e) => {
            error!("Failed to bind to {}: {}", host, e);
            return Err(e.into());
        }
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal, initiating graceful shutdown...");
                cleanup_shutdown_token.cancel();
                let _ = shutdown_tx.send(());
            }
            Err(err) => {
                error!("Unable to listen for shutdown signal: {}", err);
            }
        }
    });

    let app = routes::root::routes(&context);

    info!("Server starting...");
    // Peer addresses feed login throttling when no trusted proxy header is present
    match axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            if let Err(e) = cleanup_task_handle.await {
                error!("Error waiting for cleanup task to finish: {}", e);
            }
        })
        .await
    {
        Ok(_) => {
            info!("Server shutdown gracefully");
            Ok(())
        }
        Err(e) => {
            error!("Server error: {}", e);
            Err(e.into())
        }
    }
}
