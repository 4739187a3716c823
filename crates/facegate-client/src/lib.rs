//! facegate-client — the client side of liveness-gated face login.
//!
//! A [`Session`] owns the camera and a [`TrackingLoop`] that streams frames
//! to the landmark service, draws the returned mesh and, for blink-gated
//! logins, keeps the frame on which the liveness gesture completed.
//! [`LoginFlow`] and [`EnrollmentFlow`] turn button presses into login and
//! registration requests against that session.

pub mod api;
pub mod config;
pub mod enroll;
pub mod flow;
pub mod login;
pub mod notify;
pub mod overlay;
pub mod session;
pub mod tracking;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{ApiError, AuthClient, AuthResponse, HttpApi, LandmarkClient};
pub use config::{ClientConfig, ConfigError};
pub use enroll::{EnrollOutcome, EnrollSettings, EnrollmentFlow};
pub use flow::{FlowError, Navigation};
pub use login::{LoginFlow, LoginOutcome, LoginSettings};
pub use notify::{LogNotifier, Notice, NoticeKind, Notifier};
pub use overlay::{LogSink, OverlaySink, SnapshotSink};
pub use session::Session;
pub use tracking::{
    GatedFrame, TrackingConfig, TrackingHandle, TrackingLoop, TrackingStats, CAMERA_ALERT,
    FEED_UNREADABLE,
};
