use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use solaredge_bridge::api::{self, AppState};
use solaredge_bridge::config::load_config;
use solaredge_bridge::mqtt::MqttPublisher;
use solaredge_bridge::{hub, ModbusClient};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("solaredge_bridge=info")),
        )
        .init();

    let config = load_config()?;
    info!(
        "Starting {} v{} for hub {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        config.hub.name
    );

    let metrics = if config.server.enabled && config.server.metrics_enabled {
        Some(
            PrometheusBuilder::new()
                .install_recorder()
                .with_context(|| "Failed to install metrics recorder")?,
        )
    } else {
        None
    };

    let source = Arc::new(ModbusClient::new(&config.hub));
    let hub = Arc::new(hub::with_new_store(
        config.hub.name.clone(),
        config.hub.scan_interval(),
        source,
    ));

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut tasks = Vec::new();

    let mqtt = if config.mqtt.enabled {
        let publisher = Arc::new(MqttPublisher::new(&config.mqtt, hub.name()));
        let updates = hub.subscribe().await;
        tasks.push(tokio::spawn(
            publisher
                .clone()
                .start_publishing(updates, shutdown_tx.subscribe()),
        ));
        Some(publisher)
    } else {
        None
    };

    if config.server.enabled {
        let state = AppState {
            hub: hub.name().to_string(),
            store: hub.store(),
            metrics,
            mqtt,
        };
        let server = config.server.clone();
        let api_hub = hub.clone();
        let shutdown = shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = api::serve(&server, state, api_hub, shutdown).await {
                error!("HTTP API stopped: {:#}", e);
            }
        }));
    }

    if !config.mqtt.enabled && !config.server.enabled {
        info!("Neither MQTT nor the HTTP API is enabled; the hub will stay idle");
    }

    tasks.push(tokio::spawn(hub.clone().run(shutdown_tx.subscribe())));

    tokio::signal::ctrl_c()
        .await
        .with_context(|| "Failed to listen for Ctrl+C")?;
    info!("Shutting down");
    let _ = shutdown_tx.send(());

    for task in tasks {
        if let Err(e) = task.await {
            error!("Task failed: {}", e);
        }
    }

    Ok(())
}
