mod config;
mod db;
mod models;
mod service;
mod tally;
mod tasks;

use config::{AuthMode, Config};
use db::Database;
use log::{error, info};
use service::Service;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {e}");
            return;
        }
    };

    match &config.auth_mode {
        AuthMode::Integrated => info!("Auth mode: integrated identity provider"),
        AuthMode::DevBypass { user_id } => {
            info!("Auth mode: dev bypass as user {user_id}");
        }
    }

    // Initialize database
    let database = match Database::connect(&config.database_url).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to initialize database: {e}");
            return;
        }
    };

    let service = Service::new(database);

    // Background task recomputing live standings for active events
    tokio::spawn(tasks::standings::standings_refresh_task(
        service.clone(),
        config.refresh_interval_secs,
    ));

    info!("soy-el-mejor service running, Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutting down");
}
