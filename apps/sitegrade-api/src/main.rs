use std::sync::Arc;

use axum::{
    Router, ServiceExt,
    extract::Request,
    routing::{MethodRouter, get},
};
use sitegrade_db::SiteStore;
use sitegrade_db::db::init_db;
use sitegrade_db::repositories::SiteRepository;
use tower::Layer;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    normalize_path::{NormalizePath, NormalizePathLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod handlers;
mod notifier;

use config::Config;
use notifier::Notifier;

/// One entry per served route; the router is built from this table and
/// the same table is logged at startup.
pub struct RouteSpec {
    pub method: &'static str,
    pub path: &'static str,
    pub handler: MethodRouter<AppState>,
}

pub fn route_table() -> Vec<RouteSpec> {
    let mut table = vec![RouteSpec {
        method: "GET",
        path: "/health",
        handler: get(handlers::health::health_check),
    }];
    table.extend(handlers::sites::routes());
    table
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SiteStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(store: Arc<dyn SiteStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }
}

pub fn router(state: AppState) -> Router {
    route_table()
        .into_iter()
        .fold(Router::new(), |router, spec| router.route(spec.path, spec.handler))
        .layer(CatchPanicLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The router with trailing slashes stripped before routing.
pub fn app(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(state))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitegrade_api=debug,sitegrade_db=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load();
    info!("Site grade API v{} starting...", env!("CARGO_PKG_VERSION"));

    let pool = init_db(&config.database_url, config.max_connections).await?;
    info!("Connected to PostgreSQL (max {} connections)", config.max_connections);

    let state = AppState::new(
        Arc::new(SiteRepository::new(pool.clone())),
        notifier::from_config(config.notify_url.as_deref()),
    );

    for spec in route_table() {
        info!("{} {}", spec.method, spec.path);
    }

    let addr = config.listen_addr();
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("Database pool closed, bye");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
