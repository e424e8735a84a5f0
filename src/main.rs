//! Movie Night Back binary entrypoint wiring REST, SSE, the cycle
//! engine and the storage layer.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod catalog;
mod config;
mod dao;
mod dto;
mod error;
mod routes;
mod services;
mod state;

use config::AppConfig;
use dao::night_store::{NightStore, memory::MemoryNightStore};
use services::{cycle_engine, sse_service, storage_supervisor};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let app_state = AppState::new(config);

    install_catalog(&app_state).await;
    tokio::spawn(run_storage_supervisor(app_state.clone()));
    tokio::spawn(cycle_engine::run(app_state.clone()));
    tokio::spawn(sse_service::watch_degraded(app_state.clone()));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the storage backend for this deployment: MongoDB when a
/// `MONGO_URI` is configured (and the feature is compiled in),
/// otherwise the in-memory store for single-process setups.
async fn run_storage_supervisor(state: SharedState) {
    #[cfg(feature = "mongo-store")]
    if let Ok(uri) = env::var("MONGO_URI") {
        use crate::dao::night_store::mongodb::{MongoConfig, MongoNightStore};

        let db_name = env::var("MONGO_DB").ok();
        storage_supervisor::run(state, move || {
            let uri = uri.clone();
            let db_name = db_name.clone();
            async move {
                let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
                let store = MongoNightStore::connect(config).await?;
                Ok(Arc::new(store) as Arc<dyn NightStore>)
            }
        })
        .await;
        return;
    }

    let store: Arc<dyn NightStore> = Arc::new(MemoryNightStore::new());
    state.install_night_store(store).await;
    info!("in-memory store installed; state will not survive a restart");
}

/// Install the TMDB catalog client when an API key is configured.
async fn install_catalog(state: &SharedState) {
    #[cfg(feature = "tmdb-catalog")]
    if let Ok(api_key) = env::var("TMDB_API_KEY") {
        let region = env::var("TMDB_REGION").unwrap_or_else(|_| "US".into());
        state
            .install_catalog(Arc::new(catalog::tmdb::TmdbCatalog::new(api_key, region)))
            .await;
        info!("TMDB catalog client installed");
        return;
    }

    if state.catalog().await.is_none() {
        info!("no movie catalog configured; catalog search is disabled");
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
