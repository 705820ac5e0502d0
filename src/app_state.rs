use std::time::Instant;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::camera::PLACEHOLDER_JPEG;
use crate::camera::session::CameraSession;
use crate::camera::traits::CameraBackend;
use crate::config::AppConfig;

/// The most recent encoded preview frame.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub data: Bytes,
    pub captured_at: Instant,
}

pub struct AppState<B: CameraBackend> {
    pub config: AppConfig,
    pub session: Mutex<CameraSession<B>>,
    latest_frame: Mutex<Option<PreviewFrame>>,
}

impl<B: CameraBackend> AppState<B> {
    pub fn new(config: AppConfig, session: CameraSession<B>) -> Self {
        Self {
            config,
            session: Mutex::new(session),
            latest_frame: Mutex::new(None),
        }
    }

    /// Replace the latest-frame slot. Single writer (the relay); the slot is
    /// swapped wholesale so readers never observe a partial frame.
    pub async fn publish_frame(&self, data: Bytes) {
        let mut latest = self.latest_frame.lock().await;
        *latest = Some(PreviewFrame {
            data,
            captured_at: Instant::now(),
        });
    }

    pub async fn latest_frame(&self) -> Option<PreviewFrame> {
        let latest = self.latest_frame.lock().await;
        latest.clone()
    }

    pub async fn clear_latest_frame(&self) {
        let mut latest = self.latest_frame.lock().await;
        *latest = None;
    }

    /// The latest frame, or the fixed placeholder when none has been
    /// captured yet. Never fails; viewers always get a well-formed image.
    pub async fn frame_or_placeholder(&self) -> Bytes {
        match self.latest_frame().await {
            Some(frame) => frame.data,
            None => Bytes::from_static(PLACEHOLDER_JPEG),
        }
    }
}


#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use crate::camera::PLACEHOLDER_JPEG;

    use super::testing::mock_state;

    #[tokio::test]
    async fn empty_slot_yields_placeholder() {
        let (state, _backend) = mock_state();
        let frame = state.frame_or_placeholder().await;
        assert_eq!(frame.as_ref(), PLACEHOLDER_JPEG);
    }

    #[tokio::test]
    async fn published_frame_replaces_placeholder() {
        let (state, _backend) = mock_state();
        state.publish_frame(Bytes::from_static(b"jpeg-bytes")).await;
        let frame = state.frame_or_placeholder().await;
        assert_eq!(frame.as_ref(), b"jpeg-bytes");

        state.clear_latest_frame().await;
        assert_eq!(state.frame_or_placeholder().await.as_ref(), PLACEHOLDER_JPEG);
    }

    #[tokio::test]
    async fn concurrent_readers_all_get_the_placeholder() {
        let (state, _backend) = mock_state();

        let readers = (0..10).map(|_| {
            let state = state.clone();
            tokio::spawn(async move { state.frame_or_placeholder().await })
        });

        for reader in readers {
            let frame = reader.await.expect("reader should not panic");
            assert!(!frame.is_empty());
            assert_eq!(frame.as_ref(), PLACEHOLDER_JPEG);
        }
    }

    #[tokio::test]
    async fn readers_never_see_a_partial_frame_under_overwrites() {
        let (state, _backend) = mock_state();

        let writer = {
            let state = state.clone();
            tokio::spawn(async move {
                for n in 0..200u32 {
                    let payload = vec![n as u8; 1024];
                    state.publish_frame(Bytes::from(payload)).await;
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let state = state.clone();
                tokio::spawn(async move {
                    for _ in 0..200 {
                        let frame = state.frame_or_placeholder().await;
                        assert!(!frame.is_empty());
                        if frame.as_ref() != crate::camera::PLACEHOLDER_JPEG {
                            assert_eq!(frame.len(), 1024);
                            let first = frame[0];
                            assert!(frame.iter().all(|byte| *byte == first));
                        }
                    }
                })
            })
            .collect();

        writer.await.expect("writer should not panic");
        for reader in readers {
            reader.await.expect("reader should not panic");
        }
    }
}
