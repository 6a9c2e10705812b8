use clap::Parser;
use fleetgen_node::config::{HostConfig, ServerArgs};
use fleetgen_node::shutdown::shutdown_signal;
use fleetgen_node::telemetry::init_telemetry;
use fleetgen_stream::StreamServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = ServerArgs::parse();
    let config = HostConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let servers = start_instances(&config).await;
    if servers.is_empty() {
        anyhow::bail!(
            "No instance could bind on {} (ports {:?})",
            config.bind_addr,
            config.ports
        );
    }
    tracing::info!(
        "{} of {} instances listening",
        servers.len(),
        config.ports.len()
    );

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping instances...");

    for server in &servers {
        server.stop().await;
    }

    tracing::info!("All instances stopped");
    Ok(())
}

/// Starts one server per configured port. Ports that fail to bind are logged
/// and skipped.
async fn start_instances(config: &HostConfig) -> Vec<StreamServer> {
    let mut servers = Vec::with_capacity(config.ports.len());
    for &port in &config.ports {
        let server = StreamServer::new(config.server.clone());
        match server.start(&config.bind_addr, port).await {
            Ok(_) => servers.push(server),
            Err(e) => tracing::warn!("Skipping port {port}: {e}"),
        }
    }
    servers
}

fn log_startup_info(config: &HostConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting record servers with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting {} record servers on {}",
            config.ports.len(),
            config.bind_addr
        );
    }
}
