// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use vision_edge_gateway::config::{load_config_with_env, LoggingConfig};
use vision_edge_gateway::{
    serve, Category, CloudEgressPublisher, GatewayError, GatewayState, Registry, TransportFactory,
};

/// Vision Edge Gateway - relay camera and vision streams to subscribers and cloud brokers
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    /// Listen address (overrides config file)
    #[arg(short, long)]
    listen: Option<String>,
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    // RUST_LOG wins over the configured level when set
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(logging.level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format.as_str() {
        "json" => tracing::subscriber::set_global_default(builder.json().finish())?,
        _ => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration from file
    let mut config = load_config_with_env(&args.config)?;

    // Apply CLI overrides
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }

    init_tracing(&config.logging)?;

    info!("Starting Vision Edge Gateway");
    info!("Loaded configuration from: {:?}", args.config);

    let addr: SocketAddr = config
        .server
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.server.listen_addr))?;

    let registry = Arc::new(Registry::new());
    let mut egress = CloudEgressPublisher::new(registry.clone(), config.clouds.publish_timeout());

    // Every configured backend must come up before we accept traffic
    for backend in &config.clouds.backends {
        info!(
            "Connecting cloud backend '{}' ({})",
            backend.name,
            backend.transport.kind()
        );
        let transport = TransportFactory::create(backend)?;
        if let Err(e) = transport.initialize().await {
            error!("Cloud backend '{}' unreachable: {:#}", backend.name, e);
            return Err(GatewayError::StartupFatal(format!(
                "initial connection to '{}' failed: {:#}",
                backend.name, e
            ))
            .into());
        }
        egress.attach(transport).await;
    }

    info!(
        "Connected to {} cloud backend(s): {:?}",
        config.clouds.backends.len(),
        registry.list(Category::Cloud).await
    );

    let state = Arc::new(GatewayState::new(
        registry,
        egress,
        config.bus.subscriber_buffer,
        config.server.stream_queue,
    ));

    serve(state, addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received");
    })
    .await
    .context("gRPC server failed")?;

    info!("Vision Edge Gateway stopped");
    Ok(())
}
