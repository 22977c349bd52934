//! Playback: step through the snapshots of the data directory at a fixed
//! frame rate.
//!
//! The controller is a two-state machine. While playing, a scheduler task
//! ticks once per period, advances to the next snapshot in registration
//! order (wrapping), activates it and renders the configured view as its own
//! task. A tick that finds the previous frame still rendering is skipped.
//! Stopping aborts the scheduler; a frame already dispatched finishes on its
//! own and may still fill the cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use viz_protocol::RawRenderRequest;

use crate::pipeline::RenderPipeline;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    #[error("Invalid playback rate {fps}: must be greater than 0 and at most {max}")]
    InvalidFps { fps: f64, max: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// Reported by [`PlaybackController::status`].
#[derive(Debug, Clone, Serialize)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub fps: Option<f64>,
    /// Position of the last frame's snapshot in the dataset list.
    pub index: Option<usize>,
    pub dataset: Option<String>,
    pub frames_rendered: u64,
}

#[derive(Debug, Default)]
struct Position {
    index: Option<usize>,
    dataset: Option<String>,
}

#[derive(Debug, Default)]
struct Progress {
    position: Mutex<Position>,
    frames_rendered: AtomicU64,
}

struct Control {
    state: PlaybackState,
    fps: Option<f64>,
    scheduler: Option<JoinHandle<()>>,
}

pub struct PlaybackController {
    pipeline: Arc<RenderPipeline>,
    max_fps: f64,
    control: Mutex<Control>,
    progress: Arc<Progress>,
}

impl PlaybackController {
    pub fn new(pipeline: Arc<RenderPipeline>, max_fps: f64) -> Self {
        Self {
            pipeline,
            max_fps,
            control: Mutex::new(Control {
                state: PlaybackState::Stopped,
                fps: None,
                scheduler: None,
            }),
            progress: Arc::new(Progress::default()),
        }
    }

    /// Start, restart or stop playback.
    ///
    /// `fps` is only checked when starting. Starting while already playing
    /// restarts the schedule with the new rate and view.
    pub async fn set_playback(
        &self,
        playing: bool,
        fps: f64,
        params: RawRenderRequest,
    ) -> Result<PlaybackStatus, PlaybackError> {
        if playing && !(fps.is_finite() && fps > 0.0 && fps <= self.max_fps) {
            return Err(PlaybackError::InvalidFps {
                fps,
                max: self.max_fps,
            });
        }

        {
            let mut control = self.control.lock().await;
            if let Some(scheduler) = control.scheduler.take() {
                scheduler.abort();
            }

            if playing {
                let period = Duration::from_secs_f64(1.0 / fps);
                {
                    let mut position = self.progress.position.lock().await;
                    position.index = None;
                }
                control.scheduler = Some(tokio::spawn(run_scheduler(
                    Arc::clone(&self.pipeline),
                    Arc::clone(&self.progress),
                    period,
                    params,
                )));
                control.state = PlaybackState::Playing;
                control.fps = Some(fps);
                info!(fps, period_ms = period.as_millis() as u64, "Playback started");
            } else {
                if control.state == PlaybackState::Playing {
                    info!("Playback stopped");
                }
                control.state = PlaybackState::Stopped;
                control.fps = None;
            }
        }

        Ok(self.status().await)
    }

    pub async fn status(&self) -> PlaybackStatus {
        let (state, fps) = {
            let control = self.control.lock().await;
            (control.state, control.fps)
        };
        let position = self.progress.position.lock().await;
        PlaybackStatus {
            state,
            fps,
            index: position.index,
            dataset: position.dataset.clone(),
            frames_rendered: self.progress.frames_rendered.load(Ordering::Relaxed),
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Ok(mut control) = self.control.try_lock() {
            if let Some(scheduler) = control.scheduler.take() {
                scheduler.abort();
            }
        }
    }
}

async fn run_scheduler(
    pipeline: Arc<RenderPipeline>,
    progress: Arc<Progress>,
    period: Duration,
    params: RawRenderRequest,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let params = Arc::new(params);
    let mut frame: Option<JoinHandle<()>> = None;

    loop {
        ticker.tick().await;

        if frame.as_ref().is_some_and(|f| !f.is_finished()) {
            debug!("Previous frame still rendering; skipping tick");
            continue;
        }

        let names = match pipeline.registry().scan(None).await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Playback could not list datasets");
                continue;
            }
        };
        if names.is_empty() {
            continue;
        }

        let name = {
            let mut position = progress.position.lock().await;
            let next = match position.index {
                Some(last) => (last + 1) % names.len(),
                None => {
                    // Start after the dataset on screen, or at the top.
                    let current = pipeline.registry().current().await;
                    current
                        .and_then(|h| names.iter().position(|n| n == h.name()))
                        .map(|i| (i + 1) % names.len())
                        .unwrap_or(0)
                }
            };
            position.index = Some(next);
            position.dataset = Some(names[next].clone());
            names[next].clone()
        };

        frame = Some(tokio::spawn(render_frame(
            Arc::clone(&pipeline),
            Arc::clone(&progress),
            name,
            Arc::clone(&params),
        )));
    }
}

async fn render_frame(
    pipeline: Arc<RenderPipeline>,
    progress: Arc<Progress>,
    name: String,
    params: Arc<RawRenderRequest>,
) {
    let handle = match pipeline.activate(&name).await {
        Ok(handle) => handle,
        Err(e) => {
            warn!(dataset = %name, error = %e, "Playback could not load dataset");
            return;
        }
    };
    match pipeline.render_for(handle, &params).await {
        Ok(outcome) => {
            progress.frames_rendered.fetch_add(1, Ordering::Relaxed);
            pipeline.metrics().record_playback_frame();
            debug!(dataset = %name, cache = outcome.cache.as_str(), "Playback frame rendered");
        }
        Err(e) => warn!(dataset = %name, error = %e, "Playback frame failed"),
    }
}
