use std::sync::Arc;

use facegate_hw::{FrameSource, Readiness};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::LandmarkClient;
use crate::notify::Notifier;
use crate::overlay::OverlaySink;
use crate::tracking::{GatedFrame, TrackingConfig, TrackingHandle, TrackingLoop, TrackingStats};

/// Everything one page session owns: the camera, the tracking loop and the
/// liveness-gated frame slot. Created when the session starts and torn down
/// once, on success.
pub struct Session<S> {
    id: Uuid,
    source: Arc<S>,
    gated: GatedFrame,
    tracking: Mutex<Option<TrackingHandle>>,
}

impl<S: FrameSource> Session<S> {
    pub fn new(source: Arc<S>) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(session = %id, "session created");
        Self {
            id,
            source,
            gated: GatedFrame::default(),
            tracking: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn gated_frame(&self) -> &GatedFrame {
        &self.gated
    }

    /// Spawn the tracking loop for this session. A loop that is already
    /// running is stopped first.
    pub async fn start_tracking<C, O, N>(
        &self,
        readiness: Readiness,
        client: Arc<C>,
        sink: O,
        notifier: Arc<N>,
        config: TrackingConfig,
    ) where
        C: LandmarkClient,
        O: OverlaySink,
        N: Notifier,
    {
        let tracking = TrackingLoop::new(
            Arc::clone(&self.source),
            client,
            sink,
            notifier,
            self.gated.clone(),
            config,
        );
        let span = tracing::info_span!("tracking", session = %self.id);
        let handle = tracking.spawn_in(readiness, span);

        if let Some(previous) = self.tracking.lock().await.replace(handle) {
            previous.stop().await;
        }
    }

    pub async fn is_tracking(&self) -> bool {
        self.tracking
            .lock()
            .await
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    /// Stop the camera and the loop. Safe to call more than once; only the
    /// first call does anything.
    pub async fn teardown(&self) -> Option<TrackingStats> {
        if self.source.stop() {
            tracing::info!(session = %self.id, "camera released");
        }
        let handle = self.tracking.lock().await.take()?;
        Some(handle.stop().await)
    }
}
