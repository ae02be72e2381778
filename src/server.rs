use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::cli::ServerConfig;
use crate::error::panic_response;
use crate::routes::{
    circuits_handler, drivers_handler, health_handler, standings_handler, telemetry_handler,
};
use crate::state::AppState;

/// Builds the router serving every dashboard endpoint
pub fn build_router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/api/ergast/circuits", get(circuits_handler))
        .route("/api/ergast/drivers", get(drivers_handler))
        .route("/api/ergast/standings", get(standings_handler))
        .route("/api/fastf1/session", get(telemetry_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    with_middleware(routes)
}

/// Wraps `router` in the panic, trace and CORS layers
fn with_middleware(router: Router) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Binds `config.bind_addr` and serves until Ctrl+C or SIGTERM
pub async fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Initializing state...");
    let state = AppState::new(&config)?;

    info!(
        ergast = %config.ergast_url,
        fastf1 = %config.fastf1_url,
        telemetry_ttl = ?config.telemetry_ttl,
        upstream_timeout = ?config.upstream_timeout,
        "Upstreams configured"
    );

    let app = build_router(state);

    info!("Binding to {}", config.bind_addr);
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Server running on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => wait_forever("Ctrl+C", e).await,
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => wait_forever("SIGTERM", e).await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// A handler that failed to install never fires; the other one still can
async fn wait_forever(signal_name: &str, error: io::Error) {
    warn!(signal = signal_name, error = %error, "Failed to install signal handler");
    std::future::pending::<()>().await
}
