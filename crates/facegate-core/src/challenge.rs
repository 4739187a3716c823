//! Server-issued liveness challenges and the gate that satisfies them.
//!
//! The login service may ask for one of three gestures. A blink is checked by
//! [`LivenessDetector`]; head turns are checked by comparing the nose tip to
//! the midpoint between the eyes, scaled by the distance between the eyes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::landmarks::{centroid, distance, LandmarkSet, LEFT_EYE, NOSE_TIP, RIGHT_EYE};
use crate::liveness::{BlinkEvent, LivenessDetector, LivenessError};

/// Minimum |yaw ratio| that counts as a deliberate head turn.
pub const DEFAULT_TURN_RATIO: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Challenge {
    Blink,
    TurnLeft,
    TurnRight,
}

impl Challenge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Challenge::Blink => "blink",
            Challenge::TurnLeft => "turn_left",
            Challenge::TurnRight => "turn_right",
        }
    }

    /// Instruction shown to the user.
    pub fn prompt(&self) -> &'static str {
        match self {
            Challenge::Blink => "Please blink",
            Challenge::TurnLeft => "Please turn your head left",
            Challenge::TurnRight => "Please turn your head right",
        }
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Challenge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blink" => Ok(Challenge::Blink),
            "turn_left" => Ok(Challenge::TurnLeft),
            "turn_right" => Ok(Challenge::TurnRight),
            other => Err(format!("unknown challenge: {other}")),
        }
    }
}

/// Horizontal offset of the nose tip from the eye midpoint, in units of
/// inter-eye distance. Positive when the nose sits to the image right.
pub fn yaw_ratio(landmarks: &LandmarkSet) -> Result<f32, LivenessError> {
    let left = landmarks
        .region(LEFT_EYE)
        .and_then(centroid)
        .ok_or(LivenessError::MissingRegion(LEFT_EYE))?;
    let right = landmarks
        .region(RIGHT_EYE)
        .and_then(centroid)
        .ok_or(LivenessError::MissingRegion(RIGHT_EYE))?;
    let nose = landmarks
        .region(NOSE_TIP)
        .and_then(centroid)
        .ok_or(LivenessError::MissingRegion(NOSE_TIP))?;

    let span = distance(left, right);
    if span <= f32::EPSILON {
        return Err(LivenessError::DegenerateEye);
    }
    let mid_x = (left.0 + right.0) / 2.0;
    Ok((nose.0 - mid_x) / span)
}

/// Detects a head turn in one direction.
///
/// Directions are from the subject's point of view on an unmirrored feed:
/// turning left moves the nose toward the image right (positive ratio).
#[derive(Debug, Clone)]
pub struct HeadTurnDetector {
    challenge: Challenge,
    min_ratio: f32,
    turned: bool,
}

impl HeadTurnDetector {
    /// `challenge` must be a turn; a blink challenge never fires.
    pub fn new(challenge: Challenge, min_ratio: f32) -> Self {
        Self {
            challenge,
            min_ratio,
            turned: false,
        }
    }

    fn is_turned(&self, ratio: f32) -> bool {
        match self.challenge {
            Challenge::TurnLeft => ratio >= self.min_ratio,
            Challenge::TurnRight => ratio <= -self.min_ratio,
            Challenge::Blink => false,
        }
    }

    /// Returns true on the frame where the head first enters the turned pose.
    /// The detector re-arms once the head comes back toward centre.
    pub fn observe(&mut self, landmarks: &LandmarkSet) -> Result<bool, LivenessError> {
        let ratio = yaw_ratio(landmarks)?;
        let turned = self.is_turned(ratio);
        let fired = turned && !self.turned;
        self.turned = turned;
        if fired {
            tracing::debug!(ratio, challenge = %self.challenge, "head turn observed");
        }
        Ok(fired)
    }
}

/// Liveness gate for one tracking session: passes on the frame where the
/// requested gesture completes.
#[derive(Debug, Clone)]
pub enum LivenessGate {
    Blink(LivenessDetector),
    HeadTurn(HeadTurnDetector),
}

impl LivenessGate {
    pub fn for_challenge(challenge: Challenge, ear_threshold: f32) -> Self {
        match challenge {
            Challenge::Blink => LivenessGate::Blink(LivenessDetector::new(ear_threshold)),
            turn => LivenessGate::HeadTurn(HeadTurnDetector::new(turn, DEFAULT_TURN_RATIO)),
        }
    }

    pub fn challenge(&self) -> Challenge {
        match self {
            LivenessGate::Blink(_) => Challenge::Blink,
            LivenessGate::HeadTurn(d) => d.challenge,
        }
    }

    /// Feed one landmark set; true when the gesture completed on this frame.
    pub fn observe(&mut self, landmarks: &LandmarkSet) -> Result<bool, LivenessError> {
        match self {
            LivenessGate::Blink(detector) => {
                let (_, event) = detector.observe(landmarks)?;
                Ok(event == Some(BlinkEvent::BlinkCompleted))
            }
            LivenessGate::HeadTurn(detector) => detector.observe(landmarks),
        }
    }
}
