use std::path::PathBuf;

use clap::Parser;

use retarget_proxy::config::{load_config, validation::validate_config, ConfigError, ProxyConfig};
use retarget_proxy::lifecycle::startup;
use retarget_proxy::observability::init_logging;

#[derive(Parser)]
#[command(name = "retarget-proxy")]
#[command(about = "HTTP reverse proxy with a runtime-switchable target", long_about = None)]
struct Args {
    /// TOML configuration file, watched for routing changes
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,

    /// Override target.default
    #[arg(short, long)]
    target: Option<String>,
}

fn load(args: &Args) -> Result<ProxyConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = &args.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(target) = &args.target {
        config.target.default = Some(target.clone());
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load(&args) {
        Ok(config) => config,
        Err(e) => {
            init_logging("info");
            tracing::error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "retarget-proxy starting");

    startup::run(config, args.config).await?;
    Ok(())
}
