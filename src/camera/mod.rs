pub mod discovery;
pub mod error;
pub mod ffmpeg_backend;
pub mod jpeg;
pub mod relay;
pub mod session;
pub mod traits;

/// Fixed frame served whenever no live frame is available.
pub const PLACEHOLDER_JPEG: &[u8] = include_bytes!("../../assets/placeholder.jpg");

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use bytes::Bytes;

    use crate::core::state::CaptureConfig;

    use super::error::CameraError;
    use super::traits::{CameraBackend, CaptureSink};

    #[derive(Default)]
    struct MockInner {
        opens: Mutex<Vec<(CaptureConfig, CaptureSink)>>,
        open_failures: AtomicU32,
        capture_failures: AtomicU32,
        live_handles: AtomicUsize,
        frames: AtomicUsize,
    }

    /// In-memory camera backend. Counts opens and live handles so tests can
    /// check that every transition releases the device before reacquiring it.
    #[derive(Clone, Default)]
    pub struct MockBackend {
        inner: Arc<MockInner>,
    }

    pub struct MockHandle {
        sink: CaptureSink,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next `count` open calls fail.
        pub fn fail_next_opens(&self, count: u32) {
            self.inner.open_failures.store(count, Ordering::SeqCst);
        }

        /// Make the next `count` capture calls fail.
        pub fn fail_next_captures(&self, count: u32) {
            self.inner.capture_failures.store(count, Ordering::SeqCst);
        }

        pub fn opens(&self) -> Vec<(CaptureConfig, CaptureSink)> {
            self.inner.opens.lock().expect("opens lock poisoned").clone()
        }

        pub fn live_handles(&self) -> usize {
            self.inner.live_handles.load(Ordering::SeqCst)
        }

        pub fn frames_captured(&self) -> usize {
            self.inner.frames.load(Ordering::SeqCst)
        }
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                remaining.checked_sub(1)
            })
            .is_ok()
    }

    #[async_trait]
    impl CameraBackend for MockBackend {
        type Handle = MockHandle;

        async fn open(
            &self,
            config: &CaptureConfig,
            sink: &CaptureSink,
        ) -> Result<Self::Handle, CameraError> {
            if take_failure(&self.inner.open_failures) {
                return Err(CameraError::hardware("mock open failure"));
            }
            self.inner
                .opens
                .lock()
                .expect("opens lock poisoned")
                .push((*config, sink.clone()));
            self.inner.live_handles.fetch_add(1, Ordering::SeqCst);
            Ok(MockHandle { sink: sink.clone() })
        }

        async fn capture_frame(&self, handle: &mut Self::Handle) -> Result<Bytes, CameraError> {
            if !handle.sink.is_preview() {
                return Err(CameraError::hardware("file-sink handle has no frames"));
            }
            if take_failure(&self.inner.capture_failures) {
                return Err(CameraError::hardware("mock capture failure"));
            }
            let n = self.inner.frames.fetch_add(1, Ordering::SeqCst);
            Ok(Bytes::from(format!("frame-{n}")))
        }

        async fn close(&self, _handle: Self::Handle) -> Result<(), CameraError> {
            self.inner.live_handles.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
