//! Warden Web Server
//!
//! Server lifecycle wrapper around the Axum application.

use crate::{create_app, AppState, WebError, WebResult};
use axum::serve;
use tokio::net::TcpListener;
use tracing::{error, info};
use warden_core::Settings;

/// Main Warden web server
pub struct WardenServer {
    settings: Settings,
    state: AppState,
}

impl WardenServer {
    /// Create a new server from validated settings
    pub async fn new(settings: Settings) -> WebResult<Self> {
        let state = AppState::new(settings.clone()).await?;
        Ok(Self { settings, state })
    }

    /// Start the web server; blocks until shutdown
    pub async fn start(self) -> WebResult<()> {
        let address = self.settings.address();

        info!("🚀 Starting Warden Web Server");
        info!("📍 Server address: http://{}", address);
        info!("🗄️  Database: {}", self.settings.database.url);

        let app = create_app(self.state.clone());

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("✅ Server listening on http://{}", address);

        if let Err(e) = serve(listener, app).await {
            error!("❌ Server error: {}", e);
            return Err(WebError::Server(e));
        }

        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}
