#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the heat map toolchain.
//!
//! `serve` starts the HTTP server; `sample` runs a single sampling pass
//! over a local file and prints the response JSON, which is handy for
//! checking a new data file before dropping it into the data directory.
//!
//! Uses `indicatif-log-bridge` (via [`heat_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and the progress spinner never fight for the terminal.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use heat_map_cli_utils::IndicatifProgress;
use heat_map_sampling::{HeatPointsRequest, SamplingOptions, sample_file};
use heat_map_sampling_models::{DEFAULT_MAX_POINTS, DEFAULT_SEED, SamplingMethod};
use heat_map_server::{ServerConfig, run_server};

#[derive(Parser)]
#[command(name = "heat_map_cli", about = "Heat map point sampling toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind to (overrides `BIND_ADDR`)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides `PORT`)
        #[arg(long)]
        port: Option<u16>,
        /// Directory requested files are resolved against (overrides
        /// `HEAT_MAP_DATA_DIR`)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Sample a local `GeoJSON` file and print the response as JSON
    Sample {
        /// Path to the `GeoJSON` file
        path: PathBuf,
        /// Maximum number of points to keep
        #[arg(long, default_value_t = DEFAULT_MAX_POINTS)]
        max: usize,
        /// Sampling method: `reservoir` or `first`
        #[arg(long)]
        method: Option<String>,
        /// Preferred weight property
        #[arg(long)]
        weight: Option<String>,
        /// Drop features weighted below this
        #[arg(long)]
        min_weight: Option<f64>,
        /// Clamp weights above this
        #[arg(long)]
        max_weight: Option<f64>,
        /// Seed for the sampler's generator
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = heat_map_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            bind,
            port,
            data_dir,
        } => {
            let env = ServerConfig::from_env();
            let config = ServerConfig {
                bind_addr: bind.unwrap_or(env.bind_addr),
                port: port.unwrap_or(env.port),
                data_dir: data_dir.unwrap_or(env.data_dir),
            };

            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(run_server(config))
            })
            .await??;
        }
        Commands::Sample {
            path,
            max,
            method,
            weight,
            min_weight,
            max_weight,
            seed,
            pretty,
        } => {
            if max == 0 {
                return Err("--max must be a positive integer".into());
            }

            let request = HeatPointsRequest {
                file: path.display().to_string(),
                options: SamplingOptions {
                    max_points: max,
                    method: SamplingMethod::from_param(method.as_deref()),
                    preferred_weight: weight.filter(|w| !w.is_empty()),
                    min_weight,
                    max_weight,
                    seed,
                },
            };
            log::debug!("Sampling with {:?}", request.options);

            let progress = IndicatifProgress::features_spinner(&multi, "Sampling");
            let response = tokio::task::spawn_blocking(move || {
                sample_file(&path, &request, &progress)
            })
            .await??;

            let json = if pretty {
                serde_json::to_string_pretty(&response)?
            } else {
                serde_json::to_string(&response)?
            };
            println!("{json}");
        }
    }

    Ok(())
}
