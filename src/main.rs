//! Climate API - Service Binary
//!
//! Serves the historical climate dataset over HTTP:
//! 1. Loads configuration (climate.toml)
//! 2. Validates the SQLite dataset and its tables
//! 3. Serves the read-only JSON routes until stopped
//!
//! Usage:
//!   cargo run --release                          # climate.toml in the working directory
//!   cargo run --release -- --config other.toml   # explicit config file
//!   cargo run --release -- --port 8080           # override the configured port
//!
//! Environment:
//!   CLIMATE_CONFIG - config file path (also read from .env)
//!   RUST_LOG       - log filter, defaults to `info`

use climate_api::config::{load_config, resolve_config_path};
use climate_api::db::{DataSource, SqliteSource};
use climate_api::endpoint;
use log::{error, info};
use std::env;
use std::process;
use std::sync::Arc;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut config_arg: Option<String> = None;
    let mut port_override: Option<u16> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                config_arg = Some(args[i + 1].clone());
                i += 2;
            }
            "--port" if i + 1 < args.len() => match args[i + 1].parse() {
                Ok(port) => {
                    port_override = Some(port);
                    i += 2;
                }
                Err(_) => {
                    error!("Invalid port: {}", args[i + 1]);
                    process::exit(2);
                }
            },
            other => {
                error!("Unknown or incomplete argument: {}", other);
                eprintln!("Usage: {} [--config PATH] [--port PORT]", args[0]);
                process::exit(2);
            }
        }
    }

    let config_path = resolve_config_path(config_arg.as_deref());
    let mut config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };
    if let Some(port) = port_override {
        config.port = port;
    }

    info!("Opening dataset {}", config.database_path.display());
    let source = match SqliteSource::open(&config.database_path) {
        Ok(source) => source,
        Err(e) => {
            error!("Dataset validation failed: {}", e);
            process::exit(1);
        }
    };

    match source.list_stations() {
        Ok(stations) => info!(
            "Dataset ready: {} stations in {}",
            stations.len(),
            source.path().display()
        ),
        Err(e) => {
            error!("Failed to read stations: {}", e);
            process::exit(1);
        }
    }
    info!(
        "Precipitation window starts {}, tobs window starts {} for station {}",
        config.reference.precipitation_start(),
        config.reference.tobs_start(),
        config.reference.most_active_station
    );

    let source: Arc<dyn DataSource> = Arc::new(source);
    if let Err(e) = endpoint::start_endpoint_server(
        &config.listen_addr(),
        config.workers,
        source,
        config.reference.clone(),
    ) {
        error!("{}", e);
        process::exit(1);
    }
}
