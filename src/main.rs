use std::sync::Arc;

use tracing::info;

use slotbook::web::{AppState, WebServer};
use slotbook::{Config, Database, LicenseService};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = slotbook::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        slotbook::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    info!("slotbook - scheduling server auth core");

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };

    let license = match LicenseService::instance(&config.license) {
        Ok(license) => license,
        Err(e) => {
            eprintln!("Failed to initialize license service: {e}");
            std::process::exit(1);
        }
    };

    let app_state = match AppState::new(&config, db.pool().clone(), license) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            eprintln!("Failed to initialize application state: {e}");
            std::process::exit(1);
        }
    };

    let server = WebServer::new(&config.server.host, config.server.port, app_state);
    if let Err(e) = server.run().await {
        eprintln!("Web server error: {e}");
        std::process::exit(1);
    }
}
