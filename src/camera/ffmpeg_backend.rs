use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tracing::warn;

use crate::core::state::CaptureConfig;

use super::error::CameraError;
use super::jpeg::JpegFrameAccumulator;
use super::traits::{CameraBackend, CaptureSink};

const READ_CHUNK_BYTES: usize = 16 * 1024;

/// Camera driver built on ffmpeg subprocess pipelines against a v4l2 device.
///
/// Preview spawns an MJPEG-to-stdout child and pulls frames off its pipe;
/// recording spawns an H.264-to-file child. Either way the child owns the
/// device for its lifetime, which gives the full release/reacquire semantics
/// the session's mode transitions rely on.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    device: String,
    input_format: String,
}

impl FfmpegBackend {
    pub fn new(device: String, input_format: String) -> Self {
        Self {
            device,
            input_format,
        }
    }

    fn input_args(&self, config: &CaptureConfig) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "v4l2".into(),
            "-input_format".into(),
            self.input_format.clone(),
            "-video_size".into(),
            format!("{}x{}", config.width, config.height),
            "-framerate".into(),
            config.fps.to_string(),
            "-i".into(),
            self.device.clone(),
        ]
    }
}

pub struct FfmpegHandle {
    child: Child,
    stdout: Option<ChildStdout>,
    frames: JpegFrameAccumulator,
    read_buffer: Vec<u8>,
}

#[async_trait]
impl CameraBackend for FfmpegBackend {
    type Handle = FfmpegHandle;

    async fn open(
        &self,
        config: &CaptureConfig,
        sink: &CaptureSink,
    ) -> Result<Self::Handle, CameraError> {
        let mut command = Command::new("ffmpeg");
        command.args(self.input_args(config));

        match sink {
            CaptureSink::Preview => {
                command
                    .args(["-c:v", "mjpeg", "-q:v", "7", "-f", "mjpeg", "pipe:1"])
                    .stdout(Stdio::piped());
            }
            CaptureSink::File { path, bitrate } => {
                command
                    .args(["-c:v", "h264", "-b:v", &bitrate.to_string()])
                    .args(["-f", "h264", "-y"])
                    .arg(path.as_os_str())
                    .stdout(Stdio::null());
            }
        }

        let mut child = command
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| CameraError::hardware(format!("spawn ffmpeg: {err}")))?;

        let stdout = match sink {
            CaptureSink::Preview => Some(child.stdout.take().ok_or_else(|| {
                CameraError::hardware("missing ffmpeg stdout pipe for preview")
            })?),
            CaptureSink::File { .. } => None,
        };

        Ok(FfmpegHandle {
            child,
            stdout,
            frames: JpegFrameAccumulator::new(),
            read_buffer: vec![0_u8; READ_CHUNK_BYTES],
        })
    }

    async fn capture_frame(&self, handle: &mut Self::Handle) -> Result<Bytes, CameraError> {
        let Some(stdout) = handle.stdout.as_mut() else {
            return Err(CameraError::hardware("capture on a file-sink pipeline"));
        };

        loop {
            let read = stdout
                .read(&mut handle.read_buffer)
                .await
                .map_err(|err| CameraError::hardware(format!("read preview pipe: {err}")))?;
            if read == 0 {
                return Err(CameraError::hardware("preview pipeline ended"));
            }
            if let Some(frame) = handle.frames.push_chunk(&handle.read_buffer[..read]) {
                return Ok(frame);
            }
        }
    }

    async fn close(&self, mut handle: Self::Handle) -> Result<(), CameraError> {
        if let Err(err) = handle.child.kill().await {
            warn!("failed to kill ffmpeg child: {err}");
        }
        handle
            .child
            .wait()
            .await
            .map_err(|err| CameraError::hardware(format!("wait for ffmpeg child: {err}")))?;
        Ok(())
    }
}
