//! Process entrypoint: load configuration and the agent catalog, build the
//! `Runtime`, and serve the HTTP/WebSocket surface (spec §6).

use std::net::SocketAddr;
use std::sync::Arc;

use cloudguild::{AgentCatalog, Runtime, RuntimeConfig};
use log::{error, info};

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match RuntimeConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let catalog = match AgentCatalog::load(None) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load agent catalog: {}", e);
            std::process::exit(1);
        }
    };
    for warning in &catalog.warnings {
        log::warn!("{}", warning.0);
    }

    let port = config.listen_port;
    let runtime = match Runtime::new(config, catalog).await {
        Ok(r) => Arc::new(r),
        Err(e) => {
            error!("failed to initialize runtime: {}", e);
            std::process::exit(1);
        }
    };

    let app = cloudguild::server::build_router(runtime);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("listening on {}", addr);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        error!("server error: {}", e);
        std::process::exit(1);
    }
}
