#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for heat map point sampling.
//!
//! Serves `GET /dev/heat-points`, which samples a `GeoJSON` file from the
//! data directory for the browser heat layer, plus a health check. Each
//! request runs its own sampling pass on the blocking thread pool; requests
//! share nothing but the read-only data directory.

mod handlers;

use std::path::PathBuf;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};

/// Default data directory, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "static/data";

/// Server settings, normally read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind to (`BIND_ADDR`).
    pub bind_addr: String,
    /// Port to listen on (`PORT`).
    pub port: u16,
    /// Directory requested files are resolved against (`HEAT_MAP_DATA_DIR`).
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `PORT` and `HEAT_MAP_DATA_DIR`, falling back to
    /// the defaults for unset or unparseable values.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let data_dir = std::env::var_os("HEAT_MAP_DATA_DIR")
            .map_or(defaults.data_dir, PathBuf::from);

        Self {
            bind_addr,
            port,
            data_dir,
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// Directory requested files are resolved against.
    pub data_dir: PathBuf,
}

/// Registers the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api").route("/health", web::get().to(handlers::health)))
        .route("/dev/heat-points", web::get().to(handlers::heat_points));
}

/// Starts the heat map API server.
///
/// This is a regular async function; the caller provides the runtime
/// (e.g. via `#[actix_web::main]`) and initializes logging.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    if !config.data_dir.is_dir() {
        log::warn!(
            "Data directory {} does not exist; every request will return 404",
            config.data_dir.display()
        );
    }

    let state = web::Data::new(AppState {
        data_dir: config.data_dir.clone(),
    });

    log::info!(
        "Starting server on {}:{} serving {}",
        config.bind_addr,
        config.port,
        config.data_dir.display()
    );

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
