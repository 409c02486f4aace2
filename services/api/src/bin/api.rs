//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{CloudinaryAdapter, DbAdapter, InMemoryStore},
    config::{Config, StoreBackend},
    error::ApiError,
    web::{router, rest::ApiDoc, state::AppState},
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use huella_core::ports::{AccountStore, MediaHost, ReportStore};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Choose the Store & Run Migrations ---
    let (reports, accounts): (Arc<dyn ReportStore>, Arc<dyn AccountStore>) =
        match config.store_backend {
            StoreBackend::Postgres => {
                let database_url = config.database_url.as_deref().ok_or_else(|| {
                    ApiError::Internal("DATABASE_URL is required for postgres".to_string())
                })?;
                info!("Connecting to database...");
                let db_pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(database_url)
                    .await?;
                let db_adapter = Arc::new(DbAdapter::new(db_pool));
                info!("Running database migrations...");
                db_adapter.run_migrations().await?;
                info!("Database migrations complete.");
                (db_adapter.clone(), db_adapter)
            }
            StoreBackend::Memory => {
                warn!("Using the in-memory store; nothing survives a restart.");
                let store = Arc::new(InMemoryStore::new());
                (store.clone(), store)
            }
        };

    // --- 3. Initialize the Media Host ---
    let media: Arc<dyn MediaHost> = Arc::new(CloudinaryAdapter::new(
        reqwest::Client::new(),
        &config.cloudinary_cloud_name,
        &config.cloudinary_upload_preset,
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(reports, accounts, media, config.clone()));

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
