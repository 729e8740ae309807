// Application state for HTTP handlers
use crate::application::device_manager::DeviceManager;
use crate::application::event_dispatch::{LiveUpdate, SharedSensorService};
use crate::domain::telemetry::SeriesData;
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AppState {
    pub sensor_service: SharedSensorService,
    pub device: Arc<dyn DeviceManager>,
    pub updates: broadcast::Sender<LiveUpdate>,
    /// Preloaded and predicted series merged alongside live data
    pub preloaded: Vec<SeriesData>,
}
