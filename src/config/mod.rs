use std::{env, net::SocketAddr, path::PathBuf};

use crate::core::state::CaptureConfig;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub bind_addr: SocketAddr,
    pub camera_device: String,
    pub camera_input_format: String,
    pub video_dir: PathBuf,
    pub stream_config: CaptureConfig,
    pub record_config: CaptureConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "RoboCam".to_owned());
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_owned())
            .parse()?;
        let camera_device = env::var("CAMERA_DEVICE").unwrap_or_else(|_| "/dev/video0".to_owned());
        let camera_input_format =
            env::var("CAMERA_INPUT_FORMAT").unwrap_or_else(|_| "mjpeg".to_owned());
        let video_dir = PathBuf::from(env::var("VIDEO_DIR").unwrap_or_else(|_| "videos".to_owned()));

        let stream_config = CaptureConfig {
            width: env_u32("STREAM_WIDTH", 640),
            height: env_u32("STREAM_HEIGHT", 480),
            fps: env_u32("STREAM_FPS", 30),
        };
        let record_config = CaptureConfig {
            width: env_u32("RECORD_WIDTH", 1920),
            height: env_u32("RECORD_HEIGHT", 1080),
            fps: env_u32("RECORD_FPS", 30),
        };

        Ok(Self {
            app_name,
            bind_addr,
            camera_device,
            camera_input_format,
            video_dir,
            stream_config,
            record_config,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            app_name: "RoboCam".to_owned(),
            bind_addr: "127.0.0.1:8080".parse().expect("socket addr should parse"),
            camera_device: "/dev/video0".to_owned(),
            camera_input_format: "mjpeg".to_owned(),
            video_dir: std::env::temp_dir().join("robocam-test-videos"),
            stream_config: CaptureConfig {
                width: 640,
                height: 480,
                fps: 30,
            },
            record_config: CaptureConfig {
                width: 1920,
                height: 1080,
                fps: 30,
            },
        }
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}
