//! The tracking loop: sample a frame, fetch its landmarks, draw the mesh and
//! feed the liveness gate, then wait one interval and repeat.
//!
//! Ticks are strictly sequential. The next capture is not taken until the
//! previous detection has resolved, so at most one landmark request is ever
//! in flight and responses cannot arrive out of order.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use facegate_core::{render_mesh, CapturePolicy, Challenge, Frame, LandmarkSet, LivenessGate, MeshStyle};
use facegate_hw::{CameraError, FrameSource, Readiness};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::api::LandmarkClient;
use crate::notify::{Notice, Notifier};
use crate::overlay::OverlaySink;

/// Blocking alert for a camera that cannot be opened.
pub const CAMERA_ALERT: &str = "Cannot access camera. Check permissions!";
/// Popup for a camera that opened but whose first frame could not be read.
pub const FEED_UNREADABLE: &str = "Camera feed could not be read";

#[derive(Debug, Clone)]
pub struct TrackingConfig {
    pub interval: Duration,
    pub policy: CapturePolicy,
    /// Gesture the liveness gate waits for (blink-gated policy only).
    pub challenge: Challenge,
    pub ear_threshold: f32,
    pub mesh: MeshStyle,
    /// How long the "liveness passed" popup stays up.
    pub notice_for: Duration,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            policy: CapturePolicy::default(),
            challenge: Challenge::Blink,
            ear_threshold: facegate_core::liveness::DEFAULT_EAR_THRESHOLD,
            mesh: MeshStyle::default(),
            notice_for: Duration::from_secs(3),
        }
    }
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackingStats {
    pub ticks: u64,
    /// Ticks skipped because the feed had no geometry yet.
    pub not_ready: u64,
    pub detections: u64,
    pub no_face: u64,
    pub errors: u64,
    pub liveness_passed: u64,
}

/// Slot holding the most recent frame on which the liveness gate passed.
/// Each pass overwrites it; the login flow takes it out.
#[derive(Debug, Clone, Default)]
pub struct GatedFrame {
    inner: Arc<Mutex<Option<Frame>>>,
}

impl GatedFrame {
    pub async fn store(&self, frame: Frame) {
        *self.inner.lock().await = Some(frame);
    }

    /// Remove and return the stored frame.
    pub async fn take(&self) -> Option<Frame> {
        self.inner.lock().await.take()
    }

    pub async fn is_set(&self) -> bool {
        self.inner.lock().await.is_some()
    }
}

pub struct TrackingLoop<S, C, O, N> {
    source: Arc<S>,
    client: Arc<C>,
    sink: O,
    notifier: Arc<N>,
    gate: Option<LivenessGate>,
    gated: GatedFrame,
    config: TrackingConfig,
    stats: TrackingStats,
}

impl<S, C, O, N> TrackingLoop<S, C, O, N>
where
    S: FrameSource,
    C: LandmarkClient,
    O: OverlaySink,
    N: Notifier,
{
    pub fn new(
        source: Arc<S>,
        client: Arc<C>,
        sink: O,
        notifier: Arc<N>,
        gated: GatedFrame,
        config: TrackingConfig,
    ) -> Self {
        let gate = config
            .policy
            .runs_liveness()
            .then(|| LivenessGate::for_challenge(config.challenge, config.ear_threshold));
        Self {
            source,
            client,
            sink,
            notifier,
            gate,
            gated,
            config,
            stats: TrackingStats::default(),
        }
    }

    /// Run on the Tokio runtime until the handle is stopped or dropped.
    pub fn spawn(self, readiness: Readiness) -> TrackingHandle {
        self.spawn_in(readiness, tracing::Span::current())
    }

    /// Like [`TrackingLoop::spawn`], with every event of the loop recorded
    /// inside `span`.
    pub fn spawn_in(self, readiness: Readiness, span: tracing::Span) -> TrackingHandle {
        let (cancel, cancelled) = watch::channel(false);
        let task = tokio::spawn(self.run(readiness, cancelled).instrument(span));
        TrackingHandle { cancel, task }
    }

    /// Wait for the feed, then tick until cancelled.
    pub async fn run(
        mut self,
        readiness: Readiness,
        mut cancelled: watch::Receiver<bool>,
    ) -> TrackingStats {
        let geometry = tokio::select! {
            biased;
            _ = cancelled.changed() => return self.stats,
            ready = readiness.wait() => ready,
        };
        match geometry {
            Ok(g) => tracing::info!(
                width = g.width,
                height = g.height,
                policy = %self.config.policy,
                "tracking started"
            ),
            Err(e) if e.is_fatal() => {
                tracing::error!(error = %e, "camera never became ready");
                self.notifier.alert(CAMERA_ALERT);
                return self.stats;
            }
            Err(e) => {
                tracing::error!(error = %e, "camera feed unreadable");
                self.notifier
                    .notify(Notice::error(FEED_UNREADABLE, self.config.notice_for));
                return self.stats;
            }
        }

        loop {
            if *cancelled.borrow() {
                break;
            }
            if self.tick(&cancelled).await.is_break() {
                break;
            }
            tokio::select! {
                biased;
                _ = cancelled.changed() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        tracing::info!(
            ticks = self.stats.ticks,
            detections = self.stats.detections,
            no_face = self.stats.no_face,
            errors = self.stats.errors,
            liveness_passed = self.stats.liveness_passed,
            "tracking stopped"
        );
        self.stats
    }

    async fn tick(&mut self, cancelled: &watch::Receiver<bool>) -> ControlFlow<()> {
        self.stats.ticks += 1;

        let frame = match self.source.capture_still().await {
            Ok(frame) => frame,
            Err(CameraError::Stopped) => return ControlFlow::Break(()),
            Err(e) => {
                tracing::warn!(error = %e, "frame capture failed; skipping tick");
                self.stats.errors += 1;
                return ControlFlow::Continue(());
            }
        };
        if frame.is_degenerate() {
            self.stats.not_ready += 1;
            return ControlFlow::Continue(());
        }

        let detected = self.client.detect(&frame).await;
        if *cancelled.borrow() {
            tracing::debug!("session ended during detection; dropping result");
            return ControlFlow::Break(());
        }

        match detected {
            Ok(Some(landmarks)) => {
                self.stats.detections += 1;
                let overlay = render_mesh(&landmarks, frame.geometry(), &self.config.mesh);
                self.sink.draw(&overlay, &frame);
                self.check_liveness(&landmarks, frame).await;
            }
            Ok(None) => {
                self.stats.no_face += 1;
                self.sink.clear(&frame);
            }
            Err(e) => {
                tracing::warn!(error = %e, "landmark detection failed; skipping tick");
                self.stats.errors += 1;
            }
        }
        ControlFlow::Continue(())
    }

    async fn check_liveness(&mut self, landmarks: &LandmarkSet, frame: Frame) {
        let Some(gate) = self.gate.as_mut() else {
            return;
        };
        match gate.observe(landmarks) {
            Ok(true) => {
                let challenge = gate.challenge();
                self.stats.liveness_passed += 1;
                self.gated.store(frame).await;
                tracing::info!(%challenge, "liveness gate passed; frame captured");
                let text = match challenge {
                    Challenge::Blink => "Blink detected ✔ Now click Login",
                    _ => "Movement detected ✔ Now click Login",
                };
                self.notifier
                    .notify(Notice::success(text, self.config.notice_for));
            }
            Ok(false) => {}
            Err(e) => tracing::debug!(error = %e, "liveness not evaluated for this frame"),
        }
    }
}

/// Owner of a running loop. Dropping it also stops the loop.
pub struct TrackingHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<TrackingStats>,
}

impl TrackingHandle {
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait for the loop to wind down. An in-flight detection is
    /// allowed to complete first.
    pub async fn stop(self) -> TrackingStats {
        self.cancel();
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "tracking task failed");
                TrackingStats::default()
            }
        }
    }
}
