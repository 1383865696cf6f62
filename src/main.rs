use std::path::PathBuf;

use clap::Parser;

use mini_gateway::config::{load_config, GatewayConfig};
use mini_gateway::lifecycle::Gateway;
use mini_gateway::observability::{init_logging, init_metrics};

#[derive(Parser)]
#[command(name = "mini-gateway")]
#[command(about = "HTTP/gRPC reverse-proxy gateway", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability.log_level);

    if cli.check {
        tracing::info!(routes = config.routes.len(), "Configuration is valid");
        return Ok(());
    }

    tracing::info!(
        pid = std::process::id(),
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "mini-gateway v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    Gateway::run(config).await?;

    tracing::info!(pid = std::process::id(), "Shutdown complete");
    Ok(())
}
