//! Warden Web Server
//!
//! Standalone authentication and RBAC service.

use clap::Parser;
use warden_core::{init_logging, Settings};
use warden_web::WardenServer;

/// Warden - authentication and role-based access control service
#[derive(Parser)]
#[command(name = "warden-web")]
#[command(about = "Authentication and RBAC service")]
#[command(version)]
struct Args {
    /// Path to a TOML configuration file; environment variables are used
    /// when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Override the server host
    #[arg(long)]
    host: Option<String>,

    /// Override the server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the database URL
    #[arg(long)]
    database_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    let settings = match &args.config {
        Some(path) => Settings::from_file(path),
        None => Settings::from_env(),
    };
    let mut settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(host) = args.host {
        settings.server.host = host;
    }
    if let Some(port) = args.port {
        settings.server.port = port;
    }
    if let Some(url) = args.database_url {
        settings.database.url = url;
    }
    settings.logging.level = args.log_level;

    if let Err(e) = init_logging(&settings.logging) {
        eprintln!("❌ Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let server = match WardenServer::new(settings).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("❌ Failed to build server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        eprintln!("❌ Server failed: {}", e);
        std::process::exit(1);
    }
}
