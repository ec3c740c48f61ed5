//! Warden Web Server
//!
//! HTTP boundary for the Warden auth engine: token-based authentication
//! endpoints plus the administrative user/role/permission API, all backed by
//! `warden-auth` services held in [`AppState`].

pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use server::WardenServer;
pub use state::AppState;

use axum::{
    extract::DefaultBodyLimit,
    http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    http::Method,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the main application router
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE]);

    Router::new()
        .nest("/api", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB max body size
        .with_state(state)
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Auth engine error: {0}")]
    Auth(#[from] warden_auth::AuthError),
}

pub type WebResult<T> = Result<T, WebError>;
