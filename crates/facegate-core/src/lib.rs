//! facegate-core — pure client-side logic for liveness-gated face login.
//!
//! Nothing in this crate touches the network or a camera. Frames come in,
//! landmark sets come in, and the modules here turn them into overlay
//! primitives, liveness events and enrollment batches.

pub mod capture;
pub mod challenge;
pub mod frame;
pub mod landmarks;
pub mod liveness;
pub mod mesh;
pub mod policy;

pub use capture::{CaptureBatch, CaptureError, CaptureProgress, CaptureSession, CaptureState};
pub use challenge::{Challenge, HeadTurnDetector, LivenessGate};
pub use frame::{Frame, FrameError, Geometry};
pub use landmarks::{LandmarkSet, Point};
pub use liveness::{BlinkEvent, BlinkState, LivenessDetector, LivenessError};
pub use mesh::{render_mesh, Edge, Marker, MeshStyle, Overlay};
pub use policy::CapturePolicy;
