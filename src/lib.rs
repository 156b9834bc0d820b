//! Portico - A small profile-directory web server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - OAuth/session endpoints                                  │
//! │  - Account JSON endpoints                                   │
//! │  - Rendered pages (home, directory, profiles)               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Account provisioning on login                            │
//! │  - Account reads                                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx): accounts, sessions                        │
//! │  - Identity provider (OAuth + directory API over HTTP)      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: JSON endpoints over the account store
//! - `pages`: server-rendered views
//! - `service`: business logic layer
//! - `auth`: OAuth flow, sessions, directory client
//! - `data`: database layer
//! - `config`: configuration management
//! - `error`: error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod pages;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool, services, and HTTP client.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Account read operations
    pub accounts: Arc<service::AccountService>,

    /// Login-time account provisioning
    pub provisioning: Arc<service::ProvisioningService>,

    /// HTTP client for the identity provider
    pub http_client: Arc<reqwest::Client>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Initialize HTTP client
    /// 3. Initialize the identity provider directory client
    /// 4. Wire up services
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = Arc::new(data::Database::connect(&config.database.path).await?);
        tracing::info!("Database connected");

        // 2. Initialize HTTP client
        let http_client = Arc::new(
            reqwest::Client::builder()
                .user_agent("Portico/0.1.0")
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .map_err(|e| error::AppError::Internal(e.into()))?,
        );

        // 3. Directory client for the identity provider
        let directory = Arc::new(auth::directory::DirectoryClient::new(
            &config.auth.provider,
            http_client.clone(),
        ));

        // 4. Services
        let accounts = Arc::new(service::AccountService::new(db.clone()));
        let provisioning = Arc::new(service::ProvisioningService::new(db.clone(), directory));

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            accounts,
            provisioning,
            http_client,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::services::ServeDir;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let resources_dir = state.config.server.resources_dir.clone();

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router(state.clone()))
        .merge(api::users_router(state.clone()))
        .merge(pages::pages_router())
        .nest_service("/resources", ServeDir::new(resources_dir))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
