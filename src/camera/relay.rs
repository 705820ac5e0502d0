use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tracing::{error, info, warn};

use crate::app_state::AppState;
use crate::core::state::CameraMode;

use super::error::CameraError;
use super::traits::CameraBackend;

/// Consecutive capture failures before the pipeline is declared dead.
const CAPTURE_FAILURE_LIMIT: u32 = 10;

/// Backoff between retried initializations while the hardware is down.
const REINIT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Short pause after a single failed capture before trying the next one.
const CAPTURE_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Drive the camera for the life of the process.
///
/// In Preview mode this is the single producer for the latest-frame slot,
/// capturing at the configured stream rate. While Uninitialized it retries
/// `initialize` indefinitely (viewers get the placeholder meanwhile). During
/// Recording it idles; the relay never touches the hardware then.
pub async fn run<B: CameraBackend>(state: Arc<AppState<B>>) {
    let mut mode_rx = {
        let session = state.session.lock().await;
        session.mode_watch()
    };

    loop {
        let mode = *mode_rx.borrow_and_update();
        match mode {
            CameraMode::Preview => preview_loop(&state, &mut mode_rx).await,
            CameraMode::Uninitialized => {
                let result = {
                    let mut session = state.session.lock().await;
                    // a handler may have re-initialized while we waited
                    if session.status().mode == CameraMode::Uninitialized {
                        session.initialize().await
                    } else {
                        Ok(())
                    }
                };
                if let Err(err) = result {
                    warn!(
                        "camera initialize failed, retrying in {}s: {err}",
                        REINIT_RETRY_DELAY.as_secs()
                    );
                    sleep(REINIT_RETRY_DELAY).await;
                }
            }
            CameraMode::Recording => {
                if mode_rx.changed().await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Capture frames into the slot until the session leaves Preview.
async fn preview_loop<B: CameraBackend>(
    state: &Arc<AppState<B>>,
    mode_rx: &mut watch::Receiver<CameraMode>,
) {
    let frame_interval = {
        let session = state.session.lock().await;
        session.status().stream_config.frame_interval()
    };
    let mut ticker = interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut failures: u32 = 0;

    info!(
        "frame relay running at {:.1} fps",
        1.0 / frame_interval.as_secs_f64()
    );

    loop {
        tokio::select! {
            changed = mode_rx.changed() => {
                if changed.is_err() || *mode_rx.borrow_and_update() != CameraMode::Preview {
                    state.clear_latest_frame().await;
                    return;
                }
            }
            _ = ticker.tick() => {
                let result = {
                    let mut session = state.session.lock().await;
                    if session.status().mode != CameraMode::Preview {
                        continue;
                    }
                    session.capture_frame().await
                };
                match result {
                    Ok(frame) => {
                        failures = 0;
                        state.publish_frame(frame).await;
                    }
                    // the mode changed between our check and the capture
                    Err(CameraError::NotReady) => continue,
                    Err(err) => {
                        failures += 1;
                        warn!("frame capture failed ({failures}/{CAPTURE_FAILURE_LIMIT}): {err}");
                        if failures >= CAPTURE_FAILURE_LIMIT {
                            error!("preview pipeline dead, resetting session");
                            state.session.lock().await.reset_after_failure().await;
                            state.clear_latest_frame().await;
                            return;
                        }
                        sleep(CAPTURE_ERROR_BACKOFF).await;
                    }
                }
            }
        }
    }
}
