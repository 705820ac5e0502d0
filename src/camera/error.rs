use std::fmt::Display;

/// Failure kinds for camera session operations.
///
/// Everything here is recoverable at the process level: a `Hardware` error
/// drops the session back to `Uninitialized` and the relay keeps retrying
/// initialization while viewers are served the placeholder frame.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("camera hardware error: {0}")]
    Hardware(String),

    #[error("already recording")]
    AlreadyRecording,

    #[error("not recording")]
    NotRecording,

    #[error("camera not initialized")]
    NotReady,
}

impl CameraError {
    pub fn hardware(err: impl Display) -> Self {
        Self::Hardware(err.to_string())
    }
}
