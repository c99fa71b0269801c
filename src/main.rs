// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::user_service::UserService;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::json_credential_store::JsonCredentialStore;
use crate::infrastructure::json_reading_repository::JsonReadingStorage;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    append_reading, classify_values, create_reading, delete_reading, delete_readings,
    health_check, list_profiles, list_readings, login, logout, reading_warnings, refresh,
    register, summary, update_reading,
};
use crate::presentation::session::SessionRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create stores (infrastructure layer)
    let credentials = Arc::new(JsonCredentialStore::open(&config.storage.credentials_file)?);
    tracing::info!("Using credential store {}", credentials.path().display());
    let storage = Arc::new(JsonReadingStorage::new(&config.storage.data_dir));

    // Create services (application layer)
    let user_service = UserService::new(credentials, storage);

    // Create application state
    let state = Arc::new(AppState {
        user_service,
        sessions: SessionRegistry::new(Duration::from_secs(config.server.session_ttl_secs)),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route(
            "/readings",
            get(list_readings).post(create_reading).delete(delete_readings),
        )
        .route("/readings/:id", put(update_reading).delete(delete_reading))
        .route("/readings/:id/warnings", get(reading_warnings))
        .route("/profiles", get(list_profiles))
        .route("/profiles/:name/readings", post(append_reading))
        .route("/warnings", get(classify_values))
        .route("/summary", get(summary))
        .route("/refresh", post(refresh))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.server.bind;
    tracing::info!(
        "Starting traquarium on {} (data in {})",
        addr,
        config.storage.data_dir.display()
    );

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
