//! PLM Gateway - JSON-RPC and REST tool surface over a legacy OData backend

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use plm_gateway::{cli::Cli, config::Config, server::Gateway, setup_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(ref host) = cli.host {
                config.server.host = host.clone();
            }
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        profiles = config.backend.profiles.len(),
        "Starting PLM Gateway"
    );

    // Domain agents plug in here; the gateway always carries its built-in
    // diagnostic agent, so an empty list still serves a working registry.
    let gateway = match Gateway::new(config, Vec::new()) {
        Ok(g) => g,
        Err(e) => {
            error!("Failed to create gateway: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = gateway.run().await {
        error!("Gateway error: {e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
