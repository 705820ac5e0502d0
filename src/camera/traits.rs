use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

use crate::core::state::CaptureConfig;

use super::error::CameraError;

/// Where an acquired pipeline delivers its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSink {
    /// Live frames, pulled one at a time with `capture_frame`.
    Preview,
    /// Encoded video written straight to a file.
    File { path: PathBuf, bitrate: u32 },
}

impl CaptureSink {
    pub fn is_preview(&self) -> bool {
        matches!(self, CaptureSink::Preview)
    }
}

/// Driver for the camera device.
///
/// A `Handle` represents exclusive ownership of the device under one
/// configuration. Reconfiguring always means closing the handle and opening
/// a new one; the hardware cannot switch modes in place.
#[async_trait]
pub trait CameraBackend: Send + Sync + 'static {
    type Handle: Send + 'static;

    async fn open(
        &self,
        config: &CaptureConfig,
        sink: &CaptureSink,
    ) -> Result<Self::Handle, CameraError>;

    /// One encoded frame from a preview handle. Fails on file-sink handles.
    async fn capture_frame(&self, handle: &mut Self::Handle) -> Result<Bytes, CameraError>;

    /// Stop the pipeline and release the device.
    async fn close(&self, handle: Self::Handle) -> Result<(), CameraError>;
}
