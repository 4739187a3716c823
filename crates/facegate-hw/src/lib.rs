//! facegate-hw — camera frame sources.
//!
//! A [`FrameSource`] hands out the current frame of a running feed as an
//! encoded still. Starting a source yields a [`Readiness`] signal that
//! resolves once, when the feed's geometry becomes known. Until then,
//! [`FrameSource::capture_still`] returns a zero-size frame.

mod replay;

pub use replay::{ReplayCamera, DEFAULT_REPLAY_FPS};

use std::future::Future;
use std::path::PathBuf;

use facegate_core::{Frame, FrameError, Geometry};
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("no camera found at {0}")]
    NoDevice(PathBuf),
    #[error("camera unavailable: {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode frame {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("frame encode failed: {0}")]
    Encode(#[from] FrameError),
    #[error("capture task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("camera stopped")]
    Stopped,
    #[error("camera closed before producing a frame")]
    NeverReady,
}

impl CameraError {
    /// Errors the user has to resolve outside the app (grant access, plug in
    /// a device). Everything else is a per-frame failure.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CameraError::PermissionDenied(_)
                | CameraError::NoDevice(_)
                | CameraError::Unavailable { .. }
                | CameraError::NeverReady
        )
    }
}

/// A live feed that can be sampled on demand.
pub trait FrameSource: Send + Sync + 'static {
    /// Geometry of the feed; zero until the first frame has arrived.
    fn geometry(&self) -> Geometry;

    /// The current frame re-encoded as a lossy still. Zero-size before the
    /// feed is ready. Decoding and encoding happen off the async executor.
    fn capture_still(&self) -> impl Future<Output = Result<Frame, CameraError>> + Send;

    /// Stop the feed. Returns true only for the call that stopped it.
    fn stop(&self) -> bool;

    fn is_stopped(&self) -> bool;
}

/// One-shot "first frame geometry known" signal.
#[derive(Debug)]
pub struct Readiness {
    rx: oneshot::Receiver<Result<Geometry, CameraError>>,
}

impl Readiness {
    /// Pair a sender for the source side with the receiving signal.
    pub fn channel() -> (oneshot::Sender<Result<Geometry, CameraError>>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// A signal that has already fired.
    pub fn ready(geometry: Geometry) -> Self {
        let (tx, readiness) = Self::channel();
        let _ = tx.send(Ok(geometry));
        readiness
    }

    /// Wait for the feed's first frame.
    pub async fn wait(self) -> Result<Geometry, CameraError> {
        self.rx.await.map_err(|_| CameraError::NeverReady)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_signal_resolves() {
        let geometry = Readiness::ready(Geometry::new(4, 3)).wait().await.unwrap();
        assert_eq!(geometry, Geometry::new(4, 3));
    }

    #[tokio::test]
    async fn test_dropped_sender_never_ready() {
        let (tx, readiness) = Readiness::channel();
        drop(tx);
        assert!(matches!(readiness.wait().await, Err(CameraError::NeverReady)));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(CameraError::PermissionDenied(PathBuf::from("/dev/video0")).is_fatal());
        assert!(CameraError::NeverReady.is_fatal());
        assert!(!CameraError::Stopped.is_fatal());
    }
}
