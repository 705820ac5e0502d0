use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    Uninitialized,
    Preview,
    Recording,
}

/// Capture geometry and rate shared by the preview and record pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl CaptureConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

/// Partial configuration update; unset fields keep their previous values.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ConfigPatch {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
}

impl ConfigPatch {
    pub fn apply(self, config: &mut CaptureConfig) {
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
    }

    /// A zero in any field would produce an unusable pipeline.
    pub fn validate(&self) -> Result<(), &'static str> {
        for value in [self.width, self.height, self.fps] {
            if value == Some(0) {
                return Err("width, height and fps must be positive");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraStatus {
    pub mode: CameraMode,
    pub camera_ready: bool,
    pub stream_config: CaptureConfig,
    pub record_config: CaptureConfig,
}

#[cfg(test)]
mod tests {
    use super::{CaptureConfig, ConfigPatch};

    #[test]
    fn patch_keeps_unset_fields() {
        let mut config = CaptureConfig {
            width: 640,
            height: 480,
            fps: 30,
        };
        let patch = ConfigPatch {
            width: Some(1280),
            height: None,
            fps: Some(15),
        };
        patch.apply(&mut config);
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 480);
        assert_eq!(config.fps, 15);
    }

    #[test]
    fn zero_fields_are_rejected() {
        let patch = ConfigPatch {
            width: None,
            height: Some(0),
            fps: None,
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn frame_interval_matches_fps() {
        let config = CaptureConfig {
            width: 640,
            height: 480,
            fps: 20,
        };
        assert_eq!(config.frame_interval().as_millis(), 50);
    }
}
