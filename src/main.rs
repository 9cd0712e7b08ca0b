use roomcast::config::{Settings, load_config};
use roomcast::hub::HubManager;
use roomcast::transport::start_websocket_server;
use roomcast::utils::error::Result;
use roomcast::utils::logging;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    logging::init(&config.log.level);

    if let Err(e) = run_server(config).await {
        error!("Server failed: {e}");
        std::process::exit(1);
    }
}

async fn run_server(config: Settings) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let manager = HubManager::new();

    tokio::select! {
        res = start_websocket_server(&addr, manager, config.hub) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
            Ok(())
        }
    }
}
