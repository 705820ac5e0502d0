use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::core::state::{CameraMode, CameraStatus, CaptureConfig, ConfigPatch};

use super::error::CameraError;
use super::traits::{CameraBackend, CaptureSink};

/// Pause after releasing the device before reacquiring it. The sensor needs
/// this long to actually let go of its previous configuration.
pub const HARDWARE_RESET_DELAY: Duration = Duration::from_secs(1);

/// Pause after starting capture so auto-exposure and white balance converge
/// before frames are considered valid.
pub const EXPOSURE_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Pause after stopping a recording so the encoder flushes its last buffers.
pub const WRITER_DRAIN_DELAY: Duration = Duration::from_millis(500);

/// Output bit rate tiered by recording width.
pub fn bitrate_for(config: &CaptureConfig) -> u32 {
    if config.width >= 1920 {
        20_000_000
    } else if config.width >= 1280 {
        15_000_000
    } else {
        10_000_000
    }
}

#[derive(Debug, Clone)]
pub struct RecordingStarted {
    pub path: PathBuf,
    pub config: CaptureConfig,
}

/// Exclusive owner of the camera device.
///
/// At most one of Preview/Recording is active at a time, and every
/// transition between them passes through a full close and reopen of the
/// backend handle. Callers serialize operations through the mutex in
/// `AppState`; mode changes are published on a watch channel for the relay.
pub struct CameraSession<B: CameraBackend> {
    backend: B,
    mode: CameraMode,
    handle: Option<B::Handle>,
    stream_config: CaptureConfig,
    record_config: CaptureConfig,
    video_dir: PathBuf,
    mode_tx: watch::Sender<CameraMode>,
}

impl<B: CameraBackend> CameraSession<B> {
    pub fn new(
        backend: B,
        stream_config: CaptureConfig,
        record_config: CaptureConfig,
        video_dir: PathBuf,
    ) -> Self {
        let (mode_tx, _) = watch::channel(CameraMode::Uninitialized);
        Self {
            backend,
            mode: CameraMode::Uninitialized,
            handle: None,
            stream_config,
            record_config,
            video_dir,
            mode_tx,
        }
    }

    pub fn mode_watch(&self) -> watch::Receiver<CameraMode> {
        self.mode_tx.subscribe()
    }

    pub fn status(&self) -> CameraStatus {
        CameraStatus {
            mode: self.mode,
            camera_ready: self.handle.is_some(),
            stream_config: self.stream_config,
            record_config: self.record_config,
        }
    }

    fn set_mode(&mut self, mode: CameraMode) {
        self.mode = mode;
        let _ = self.mode_tx.send(mode);
    }

    async fn release_handle(&mut self) -> Result<(), CameraError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        if let Err(err) = self.backend.close(handle).await {
            warn!("camera close failed: {err}");
            return Err(err);
        }
        Ok(())
    }

    /// Acquire the device configured for preview and enter Preview mode.
    ///
    /// Any existing handle is released first, with the full reset pause, so
    /// this doubles as the uniform recovery path from every other mode.
    pub async fn initialize(&mut self) -> Result<(), CameraError> {
        if self.handle.is_some() {
            let _ = self.release_handle().await;
            self.set_mode(CameraMode::Uninitialized);
            sleep(HARDWARE_RESET_DELAY).await;
        }

        let config = self.stream_config;
        info!(
            "initializing camera: {}x{} @ {}fps",
            config.width, config.height, config.fps
        );
        match self.backend.open(&config, &CaptureSink::Preview).await {
            Ok(handle) => {
                self.handle = Some(handle);
                sleep(EXPOSURE_SETTLE_DELAY).await;
                self.set_mode(CameraMode::Preview);
                info!("camera initialized");
                Ok(())
            }
            Err(err) => {
                error!("camera initialize failed: {err}");
                self.set_mode(CameraMode::Uninitialized);
                Err(err)
            }
        }
    }

    /// Switch to the record configuration and start writing to a new file.
    pub async fn begin_recording(&mut self) -> Result<RecordingStarted, CameraError> {
        if self.mode == CameraMode::Recording {
            return Err(CameraError::AlreadyRecording);
        }
        if self.handle.is_none() {
            return Err(CameraError::NotReady);
        }

        tokio::fs::create_dir_all(&self.video_dir)
            .await
            .map_err(|err| CameraError::hardware(format!("create video dir: {err}")))?;

        let config = self.record_config;
        let path = self.recording_path();
        let bitrate = bitrate_for(&config);
        info!(
            "starting recording to {}: {}x{} @ {}fps, {} bps",
            path.display(),
            config.width,
            config.height,
            config.fps,
            bitrate
        );

        let _ = self.release_handle().await;
        self.set_mode(CameraMode::Uninitialized);
        sleep(HARDWARE_RESET_DELAY).await;

        let sink = CaptureSink::File {
            path: path.clone(),
            bitrate,
        };
        match self.backend.open(&config, &sink).await {
            Ok(handle) => {
                self.handle = Some(handle);
                sleep(EXPOSURE_SETTLE_DELAY).await;
                self.set_mode(CameraMode::Recording);
                info!("recording started");
                Ok(RecordingStarted { path, config })
            }
            Err(err) => {
                error!("recording start failed: {err}");
                self.recover_preview().await;
                Err(err)
            }
        }
    }

    /// Stop writing, release the device and return to Preview.
    ///
    /// The device gets a full release/reacquire rather than a soft stop; it
    /// needs the cooldown before preview capture works again.
    pub async fn end_recording(&mut self) -> Result<(), CameraError> {
        if self.mode != CameraMode::Recording {
            return Err(CameraError::NotRecording);
        }

        info!("stopping recording");
        let close_result = self.release_handle().await;
        self.set_mode(CameraMode::Uninitialized);
        sleep(WRITER_DRAIN_DELAY).await;
        sleep(HARDWARE_RESET_DELAY).await;

        let init_result = self.initialize().await;
        if let Err(err) = init_result {
            warn!("preview restart after recording failed: {err}");
            return close_result.and(Err(err));
        }
        info!("recording stopped");
        close_result
    }

    /// One encoded frame from the preview pipeline. Preview mode only.
    pub async fn capture_frame(&mut self) -> Result<Bytes, CameraError> {
        if self.mode != CameraMode::Preview {
            return Err(CameraError::NotReady);
        }
        let handle = self.handle.as_mut().ok_or(CameraError::NotReady)?;
        self.backend.capture_frame(handle).await
    }

    /// Merge a partial stream-config update and re-initialize with it.
    pub async fn update_stream_config(
        &mut self,
        patch: ConfigPatch,
    ) -> Result<CaptureConfig, CameraError> {
        if self.mode == CameraMode::Recording {
            return Err(CameraError::AlreadyRecording);
        }
        patch.apply(&mut self.stream_config);
        info!(
            "stream settings updated: {}x{} @ {}fps",
            self.stream_config.width, self.stream_config.height, self.stream_config.fps
        );
        self.initialize().await?;
        Ok(self.stream_config)
    }

    /// Merge a partial record-config update; applies on the next recording.
    pub fn update_record_config(&mut self, patch: ConfigPatch) -> CaptureConfig {
        patch.apply(&mut self.record_config);
        info!(
            "record settings updated: {}x{} @ {}fps",
            self.record_config.width, self.record_config.height, self.record_config.fps
        );
        self.record_config
    }

    /// Drop to Uninitialized after repeated hardware failures. The relay
    /// retries `initialize` from there.
    pub async fn reset_after_failure(&mut self) {
        error!("resetting camera session after hardware failure");
        let _ = self.release_handle().await;
        self.set_mode(CameraMode::Uninitialized);
    }

    /// Release the device on process exit, through the same teardown path
    /// as a mode transition.
    pub async fn shutdown(&mut self) {
        info!("releasing camera");
        let _ = self.release_handle().await;
        self.set_mode(CameraMode::Uninitialized);
    }

    async fn recover_preview(&mut self) {
        let _ = self.release_handle().await;
        self.set_mode(CameraMode::Uninitialized);
        sleep(HARDWARE_RESET_DELAY).await;
        if let Err(err) = self.initialize().await {
            warn!("preview recovery failed, will retry in background: {err}");
        }
    }

    fn recording_path(&self) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        self.video_dir.join(format!("video_{timestamp}.h264"))
    }
}
