//! telebridge: MQTT telemetry to InfluxDB.
//!
//! Exits 0 after a clean shutdown on SIGINT/SIGTERM and 1 on any fatal
//! error (bad configuration, refused subscription, shutdown timeout).

use std::process::ExitCode;

use clap::Parser;
use telebridge::config::{DEFAULT_CONFIG_PATH, load_config_from};
use telebridge::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "telebridge", about = "Bridge device telemetry from MQTT to InfluxDB")]
struct Cli {
    /// Configuration file, without extension
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Log level (error, warn, info, debug, trace); overrides the config file
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let settings = match load_config_from(&cli.config) {
        Ok(settings) => settings,
        Err(e) => {
            logging::init(cli.log_level.as_deref().unwrap_or("info"));
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    logging::init(
        cli.log_level
            .as_deref()
            .unwrap_or(&settings.bridge.log_level),
    );

    info!("telebridge v{} starting", env!("CARGO_PKG_VERSION"));

    match telebridge::bridge::run(settings).await {
        Ok(_) => {
            info!("Goodbye");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Bridge stopped: {}", e);
            ExitCode::FAILURE
        }
    }
}
