// HTTP request handlers
use crate::application::device_manager::DeviceError;
use crate::application::sensor_service::CaptureMode;
use crate::domain::slot::SLOT_COUNT;
use crate::infrastructure::chunked_stream::stream_from_broadcast;
use crate::infrastructure::export_mapper::{
    device_view, export_document, merged_series, recording_for_export, single_read_status, slot_views, PlotExtent,
    SingleReadStatus,
};
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_PLOT_WIDTH: f64 = 640.0;
const DEFAULT_PLOT_HEIGHT: f64 = 400.0;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no sensor slot {0}")]
    UnknownSlot(usize),
    #[error("slot {0} has no tareable sensor attached")]
    NotTareable(usize),
    #[error("no recording for column {0}")]
    UnknownColumn(String),
    #[error("count must be at least 1")]
    InvalidCount,
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::UnknownSlot(_) | ApiError::UnknownColumn(_) => StatusCode::NOT_FOUND,
            ApiError::NotTareable(_) => StatusCode::CONFLICT,
            ApiError::InvalidCount => StatusCode::BAD_REQUEST,
            ApiError::Device(DeviceError::AlreadyCollecting(_)) => StatusCode::CONFLICT,
            ApiError::Device(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        tracing::warn!("Request failed: {}", self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[derive(Deserialize)]
pub struct SingleReadQuery {
    pub count: Option<usize>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartQuery {
    pub run_length: Option<f64>,
}

#[derive(Deserialize)]
pub struct PlotQuery {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZeroResponse {
    pub slot: usize,
    pub tare_value: f64,
}

fn check_slot(index: usize) -> Result<(), ApiError> {
    if index < SLOT_COUNT {
        Ok(())
    } else {
        Err(ApiError::UnknownSlot(index))
    }
}

fn into_response(result: Result<Response, StatusCode>) -> Response {
    match result {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current binding, live value and status of every slot
pub async fn list_slots(headers: HeaderMap, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let views = slot_views(&*state.sensor_service.lock().await);
    into_response(json_response(&views, accepts_brotli(&headers)).await)
}

/// Tare a slot against its current reading
pub async fn zero_slot(
    Path(index): Path<usize>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ZeroResponse>, ApiError> {
    check_slot(index)?;
    let tare_value = state
        .sensor_service
        .lock()
        .await
        .zero_sensor(index)
        .ok_or(ApiError::NotTareable(index))?;
    Ok(Json(ZeroResponse { slot: index, tare_value }))
}

/// Device name, connection state and enumerated columns
pub async fn get_device(headers: HeaderMap, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let view = device_view(state.device.name(), &*state.sensor_service.lock().await);
    into_response(json_response(&view, accepts_brotli(&headers)).await)
}

/// Start a continuous run, optionally with a new run length in seconds
pub async fn start_collection(
    Query(query): Query<StartQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    {
        let mut service = state.sensor_service.lock().await;
        if let Some(seconds) = query.run_length {
            service.set_run_length(seconds);
        }
        service.start_new_run(CaptureMode::Continuous);
    }

    // The lock is released first: the device reports through the dispatcher.
    if let Err(e) = state.device.start_collecting().await {
        state.sensor_service.lock().await.on_collection_stopped();
        return Err(e.into());
    }
    Ok(StatusCode::ACCEPTED)
}

pub async fn stop_collection(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.device.stop_collecting().await?;
    Ok(StatusCode::ACCEPTED)
}

/// Request `count` single-shot captures, resuming the single-read session if there is one
pub async fn record_single(
    Query(query): Query<SingleReadQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<SingleReadStatus>), ApiError> {
    let count = query.count.unwrap_or(1);
    if count == 0 {
        return Err(ApiError::InvalidCount);
    }

    let (needs_start, status) = {
        let mut service = state.sensor_service.lock().await;
        let needs_start = service.request_single_reads(count);
        (needs_start, single_read_status(service.store()))
    };

    if needs_start {
        if let Err(e) = state.device.start_collecting().await {
            state.sensor_service.lock().await.on_collection_stopped();
            return Err(e.into());
        }
    }
    Ok((StatusCode::ACCEPTED, Json(status)))
}

/// Drop recorded data while keeping bindings and tares
pub async fn clear_recordings(State(state): State<Arc<AppState>>) -> StatusCode {
    state.sensor_service.lock().await.clear_recordings();
    StatusCode::NO_CONTENT
}

/// Export every recording, down-sampled for transfer
pub async fn export_recordings(headers: HeaderMap, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let document = export_document(&*state.sensor_service.lock().await);
    into_response(json_response(&document, accepts_brotli(&headers)).await)
}

/// One recording by column id, down-sampled for transfer
pub async fn recording_by_column(
    Path(column_id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let recording = {
        let service = state.sensor_service.lock().await;
        let recording = service
            .store()
            .recording(&column_id)
            .ok_or_else(|| ApiError::UnknownColumn(column_id.clone()))?;
        recording_for_export(recording, service.pipeline().down_sample_budget)
    };
    Ok(into_response(json_response(&recording, accepts_brotli(&headers)).await))
}

/// A slot's live run merged with the preloaded and predicted series
pub async fn merged_slot_series(
    Path(index): Path<usize>,
    Query(plot): Query<PlotQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    check_slot(index)?;
    let extent = PlotExtent {
        width: plot.width.unwrap_or(DEFAULT_PLOT_WIDTH),
        height: plot.height.unwrap_or(DEFAULT_PLOT_HEIGHT),
    };
    let view = {
        let service = state.sensor_service.lock().await;
        let slot = service.slot(index).ok_or(ApiError::UnknownSlot(index))?;
        merged_series(slot, &state.preloaded, service.pipeline().down_sample_budget, extent)
    };
    Ok(into_response(json_response(&view, accepts_brotli(&headers)).await))
}

/// Stream live updates as they are recorded (progressive)
pub async fn stream_live(headers: HeaderMap, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    stream_from_broadcast(state.updates.subscribe(), accepts_brotli(&headers)).await
}
