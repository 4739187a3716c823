//! Active liveness detection via eye blinks.
//!
//! The Eye Aspect Ratio (EAR) of an eye contour drops sharply when the lid
//! closes and recovers when it opens. A blink is an EAR dip below the
//! threshold followed by a rise back above it. The detector below tracks that
//! dip across successive frames and reports the tick on which the eye reopens,
//! which is the frame the login flow keeps as proof of a live subject.
//!
//! # Threat Coverage
//!
//! - **Blocks:** Printed photographs and still images held up to the camera.
//! - **Does not block:** Video replay of a blinking face, or masks with cut-out
//!   eyes.
//!
//! There is no hysteresis band around the threshold: EAR noise that hovers
//! around it can report several blinks in quick succession.

use thiserror::Error;

use crate::landmarks::{distance, LandmarkSet, Point, LEFT_EYE, RIGHT_EYE};

/// Default EAR below which an eye is considered closed.
pub const DEFAULT_EAR_THRESHOLD: f32 = 0.20;

/// Points per eye contour (dlib 68-point convention).
const EYE_POINTS: usize = 6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LivenessError {
    #[error("landmark region missing: {0}")]
    MissingRegion(&'static str),
    #[error("eye contour needs 6 points, got {0}")]
    EyePointCount(usize),
    #[error("degenerate eye contour: corner points coincide")]
    DegenerateEye,
}

/// Compute the Eye Aspect Ratio of a six-point eye contour.
///
/// Points are ordered `p0..p5`: `p0` and `p3` are the corners, `p1`/`p2` the
/// upper lid and `p5`/`p4` the lower lid.
///
/// `EAR = (|p1 - p5| + |p2 - p4|) / (2 * |p0 - p3|)`
pub fn eye_aspect_ratio(eye: &[Point]) -> Result<f32, LivenessError> {
    if eye.len() != EYE_POINTS {
        return Err(LivenessError::EyePointCount(eye.len()));
    }

    let vertical = distance(eye[1], eye[5]) + distance(eye[2], eye[4]);
    let horizontal = distance(eye[0], eye[3]);
    if horizontal <= f32::EPSILON {
        return Err(LivenessError::DegenerateEye);
    }

    Ok(vertical / (2.0 * horizontal))
}

/// Mean EAR of both eyes in a landmark set.
pub fn average_ear(landmarks: &LandmarkSet) -> Result<f32, LivenessError> {
    let left = landmarks
        .region(LEFT_EYE)
        .ok_or(LivenessError::MissingRegion(LEFT_EYE))?;
    let right = landmarks
        .region(RIGHT_EYE)
        .ok_or(LivenessError::MissingRegion(RIGHT_EYE))?;

    Ok((eye_aspect_ratio(left)? + eye_aspect_ratio(right)?) / 2.0)
}

/// Whether the detector currently believes the eyes are shut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlinkState {
    #[default]
    Open,
    Closed,
}

/// Transition reported by [`LivenessDetector::observe_ear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkEvent {
    /// EAR fell below the threshold while open.
    EyeClosed,
    /// EAR rose above the threshold while closed: a full blink.
    BlinkCompleted,
}

/// Two-state blink machine driven by one averaged EAR value per frame.
#[derive(Debug, Clone)]
pub struct LivenessDetector {
    threshold: f32,
    state: BlinkState,
    blinks: u64,
}

impl Default for LivenessDetector {
    fn default() -> Self {
        Self::new(DEFAULT_EAR_THRESHOLD)
    }
}

impl LivenessDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            state: BlinkState::Open,
            blinks: 0,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn state(&self) -> BlinkState {
        self.state
    }

    pub fn eye_closed(&self) -> bool {
        self.state == BlinkState::Closed
    }

    /// Completed blinks seen so far.
    pub fn blinks(&self) -> u64 {
        self.blinks
    }

    /// Feed one averaged EAR value. An EAR exactly at the threshold changes
    /// nothing.
    pub fn observe_ear(&mut self, ear: f32) -> Option<BlinkEvent> {
        match self.state {
            BlinkState::Open if ear < self.threshold => {
                self.state = BlinkState::Closed;
                Some(BlinkEvent::EyeClosed)
            }
            BlinkState::Closed if ear > self.threshold => {
                self.state = BlinkState::Open;
                self.blinks += 1;
                tracing::debug!(ear, blinks = self.blinks, "blink completed");
                Some(BlinkEvent::BlinkCompleted)
            }
            _ => None,
        }
    }

    /// Compute the averaged EAR of `landmarks` and feed it to the machine.
    pub fn observe(
        &mut self,
        landmarks: &LandmarkSet,
    ) -> Result<(f32, Option<BlinkEvent>), LivenessError> {
        let ear = average_ear(landmarks)?;
        Ok((ear, self.observe_ear(ear)))
    }
}
