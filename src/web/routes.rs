use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::{app_state::AppState, camera::traits::CameraBackend};

use super::handlers;

pub fn build_router<B: CameraBackend>(state: Arc<AppState<B>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status::<B>))
        .route("/start_recording", post(handlers::start_recording::<B>))
        .route("/stop_recording", post(handlers::stop_recording::<B>))
        .route("/snapshot", get(handlers::snapshot::<B>))
        .route("/stream", get(handlers::stream::<B>))
        .route(
            "/update_stream_settings",
            post(handlers::update_stream_settings::<B>),
        )
        .route(
            "/update_record_settings",
            post(handlers::update_record_settings::<B>),
        )
        .with_state(state)
}
