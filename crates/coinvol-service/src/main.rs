//! coinvol - rolling 24h price volatility service

use anyhow::Result;
use clap::Parser;
use coinvol_service::ConfigSource;
use tracing::{info, warn};

/// Rolling 24h price volatility service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via COINVOL_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // CLI arg > COINVOL_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("COINVOL_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let (config, source) = coinvol_service::AppConfig::load(&config_path)?;
    coinvol_telemetry::init_logging(&config.telemetry.log_level)?;

    info!("Starting coinvol v{}", env!("CARGO_PKG_VERSION"));
    if let ConfigSource::Defaults(path) = &source {
        warn!(path = %path.display(), "Config file not found, using defaults");
    }
    info!(
        config_path = %config_path,
        ingest = config.ingest.enabled,
        api_port = config.api.port,
        persistence = config.persistence.enabled,
        "Configuration loaded"
    );

    let app = coinvol_service::Application::new(config)?;
    app.run().await?;

    Ok(())
}
