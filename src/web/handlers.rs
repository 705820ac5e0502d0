use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;

use crate::{
    app_state::AppState,
    camera::traits::CameraBackend,
    core::{
        errors::AppError,
        state::{CameraStatus, CaptureConfig, ConfigPatch},
    },
};

const STREAM_BOUNDARY: &str = "frame";

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct RecordingStartedResponse {
    filename: String,
    settings: CaptureConfig,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    settings: CaptureConfig,
}

pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

pub async fn status<B: CameraBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> Json<CameraStatus> {
    let session = state.session.lock().await;
    Json(session.status())
}

pub async fn start_recording<B: CameraBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> Result<Json<RecordingStartedResponse>, AppError> {
    let started = {
        let mut session = state.session.lock().await;
        session.begin_recording().await?
    };
    info!("recording started via web: {}", started.path.display());
    Ok(Json(RecordingStartedResponse {
        filename: started.path.display().to_string(),
        settings: started.config,
    }))
}

pub async fn stop_recording<B: CameraBackend>(
    State(state): State<Arc<AppState<B>>>,
) -> Result<Json<StatusResponse>, AppError> {
    {
        let mut session = state.session.lock().await;
        session.end_recording().await?;
    }
    info!("recording stopped via web");
    Ok(Json(StatusResponse { status: "success" }))
}

/// One frame per call; concurrent callers each get their own copy. Never
/// fails: with no live frame the fixed placeholder is served instead.
pub async fn snapshot<B: CameraBackend>(State(state): State<Arc<AppState<B>>>) -> Response {
    let frame = state.frame_or_placeholder().await;
    (StatusCode::OK, image_headers(), frame).into_response()
}

/// MJPEG viewer stream fed from the shared latest-frame slot.
///
/// Each viewer gets its own task ticking at the preview rate, so a slow or
/// disconnecting viewer never affects the relay or the other viewers.
pub async fn stream<B: CameraBackend>(State(state): State<Arc<AppState<B>>>) -> Response {
    let frame_interval = {
        let session = state.session.lock().await;
        session.status().stream_config.frame_interval()
    };

    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(8);
    tokio::spawn(async move {
        let mut ticker = interval(frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let frame = state.frame_or_placeholder().await;
            if tx.send(Ok(multipart_part(&frame))).await.is_err() {
                // viewer went away
                break;
            }
        }
        info!("viewer stream closed");
    });

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("multipart/x-mixed-replace; boundary=frame"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    (
        StatusCode::OK,
        headers,
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response()
}

pub async fn update_stream_settings<B: CameraBackend>(
    State(state): State<Arc<AppState<B>>>,
    Json(patch): Json<ConfigPatch>,
) -> Result<Json<SettingsResponse>, AppError> {
    patch.validate().map_err(AppError::bad_request)?;
    let settings = {
        let mut session = state.session.lock().await;
        session.update_stream_config(patch).await?
    };
    Ok(Json(SettingsResponse { settings }))
}

pub async fn update_record_settings<B: CameraBackend>(
    State(state): State<Arc<AppState<B>>>,
    Json(patch): Json<ConfigPatch>,
) -> Result<Json<SettingsResponse>, AppError> {
    patch.validate().map_err(AppError::bad_request)?;
    let settings = {
        let mut session = state.session.lock().await;
        session.update_record_config(patch)
    };
    Ok(Json(SettingsResponse { settings }))
}

fn image_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers
}

fn multipart_part(frame: &Bytes) -> Bytes {
    let header = format!(
        "--{STREAM_BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        frame.len()
    );
    let mut part = Vec::with_capacity(header.len() + frame.len() + 2);
    part.extend_from_slice(header.as_bytes());
    part.extend_from_slice(frame);
    part.extend_from_slice(b"\r\n");
    Bytes::from(part)
}
