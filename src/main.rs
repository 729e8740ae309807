// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, path::Path, sync::Arc};
use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::{broadcast, mpsc, Mutex};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::device_manager::DeviceManager;
use crate::application::event_dispatch::dispatch_events;
use crate::application::sensor_service::SensorService;
use crate::infrastructure::config::load_config;
use crate::infrastructure::preloaded_series::load_preloaded_series;
use crate::infrastructure::simulated_device::SimulatedDeviceManager;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    clear_recordings, export_recordings, get_device, health_check, list_slots, merged_slot_series, record_single,
    recording_by_column, start_collection, stop_collection, stream_live, zero_slot,
};

const DEVICE_EVENT_CAPACITY: usize = 100;
const LIVE_UPDATE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_config()?;

    let preloaded = match config.preloaded_path.as_deref() {
        Some(path) => load_preloaded_series(Path::new(path)).unwrap_or_else(|e| {
            tracing::warn!("Continuing without preloaded series: {:#}", e);
            Vec::new()
        }),
        None => Vec::new(),
    };

    // Device events flow through a single consumer (application layer)
    let (events_tx, events_rx) = mpsc::channel(DEVICE_EVENT_CAPACITY);
    let (updates_tx, _) = broadcast::channel(LIVE_UPDATE_CAPACITY);

    let sensor_service = Arc::new(Mutex::new(SensorService::new(config.pipeline.clone())));
    let device: Arc<dyn DeviceManager> = Arc::new(SimulatedDeviceManager::new(&config.simulator, events_tx));

    tokio::spawn(dispatch_events(
        sensor_service.clone(),
        events_rx,
        device.clone(),
        updates_tx.clone(),
    ));
    device.connect().await?;

    // Create application state
    let state = Arc::new(AppState {
        sensor_service,
        device: device.clone(),
        updates: updates_tx,
        preloaded,
    });

    // Build router (presentation layer)
    // Note: responses are compressed by our own builders, so no CompressionLayer
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/device", get(get_device))
        .route("/slots", get(list_slots))
        .route("/slots/:index/zero", post(zero_slot))
        .route("/slots/:index/merged", get(merged_slot_series))
        .route("/collection/start", post(start_collection))
        .route("/collection/stop", post(stop_collection))
        .route("/recordings/single", post(record_single))
        .route("/recordings/export", get(export_recordings))
        .route("/recordings/clear", post(clear_recordings))
        .route("/recordings/column/:column_id", get(recording_by_column))
        .route("/stream", get(stream_live))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .addr
        .parse()
        .with_context(|| format!("Invalid server address {}", config.server.addr))?;
    tracing::info!("Starting sensor-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    device.disconnect().await?;
    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
