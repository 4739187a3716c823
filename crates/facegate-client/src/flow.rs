use std::time::Duration;

use facegate_core::CaptureError;
use facegate_hw::CameraError;
use thiserror::Error;

pub(crate) const USERNAME_REQUIRED: &str = "Username is required!";
pub(crate) const GENERIC_FAILURE: &str = "Something went wrong";

/// Reasons a user action was refused locally, before any request was sent.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("username is required")]
    UsernameRequired,
    #[error("no liveness-gated frame captured yet")]
    LivenessRequired,
    #[error("camera has not produced a frame yet")]
    CameraNotReady,
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("capture refused: {0}")]
    Capture(#[from] CaptureError),
}

/// Where to go after a successful flow, and how long to wait first so the
/// success message can be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub path: String,
    pub after: Duration,
}

pub(crate) fn trimmed_username(username: &str) -> Option<&str> {
    let trimmed = username.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
