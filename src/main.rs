mod app_state;
mod camera;
mod config;
mod core;
mod web;

use std::sync::Arc;

use app_state::AppState;
use camera::{ffmpeg_backend::FfmpegBackend, relay, session::CameraSession};
use config::AppConfig;
use tracing::info;
use tracing_appender::rolling;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    if std::env::args().any(|arg| arg == "--probe-cameras") {
        let cameras = camera::discovery::probe_cameras().await?;
        println!("{}", serde_json::to_string_pretty(&cameras)?);
        return Ok(());
    }

    tokio::fs::create_dir_all("logs").await?;
    let file_appender = rolling::daily("logs", "robocam.log");
    let (non_blocking, _log_guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = AppConfig::from_env()?;
    tokio::fs::create_dir_all(&config.video_dir).await?;

    let backend = FfmpegBackend::new(
        config.camera_device.clone(),
        config.camera_input_format.clone(),
    );
    let session = CameraSession::new(
        backend,
        config.stream_config,
        config.record_config,
        config.video_dir.clone(),
    );
    let state = Arc::new(AppState::new(config.clone(), session));

    // drives capture, auto-initializes the camera and keeps retrying if the
    // hardware is absent
    tokio::spawn(relay::run(state.clone()));

    let app = web::routes::build_router(state.clone());
    info!(
        "{} listening on {} (device: {})",
        config.app_name, config.bind_addr, config.camera_device
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // release the device through the normal teardown path
    state.session.lock().await.shutdown().await;
    info!("{} stopped", config.app_name);

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
    }
}
