//! Enrollment capture batching.
//!
//! Registration needs exactly [`BATCH_SIZE`] stills. Captures accumulate until
//! the batch is full; the full batch is handed out once for submission and
//! the session refuses further captures until the submission is resolved.
//! A rejected submission discards the whole batch: there is no per-slot
//! retry.

use thiserror::Error;

use crate::frame::Frame;

/// Stills per registration request.
pub const BATCH_SIZE: usize = 5;

const IDLE_LABEL: &str = "Capture & Register";
const SUBMITTING_LABEL: &str = "Registering...";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("registration already in progress")]
    Submitting,
    #[error("registration already completed")]
    Completed,
    #[error("cannot capture before the camera has produced a frame")]
    EmptyFrame,
    #[error("no registration is in progress")]
    NotSubmitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Collecting,
    Submitting,
    Completed,
}

/// A full batch, ready for one registration request.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureBatch {
    frames: Vec<Frame>,
}

impl CaptureBatch {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn data_urls(&self) -> Vec<String> {
        self.frames.iter().map(Frame::to_data_url).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureProgress {
    /// Capture stored; `count` of [`BATCH_SIZE`] collected.
    Collected { count: usize },
    /// This capture filled the batch. The session is now submitting.
    BatchReady(CaptureBatch),
}

#[derive(Debug)]
pub struct CaptureSession {
    frames: Vec<Frame>,
    state: CaptureState,
    submissions: u64,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSession {
    pub fn new() -> Self {
        Self {
            frames: Vec::with_capacity(BATCH_SIZE),
            state: CaptureState::Collecting,
            submissions: 0,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Stills currently held (0 while submitting).
    pub fn count(&self) -> usize {
        self.frames.len()
    }

    /// Batches handed out for submission so far.
    pub fn submissions(&self) -> u64 {
        self.submissions
    }

    pub fn is_accepting(&self) -> bool {
        self.state == CaptureState::Collecting
    }

    /// Text for the capture button.
    pub fn button_label(&self) -> String {
        match self.state {
            CaptureState::Submitting => SUBMITTING_LABEL.to_string(),
            _ if self.frames.is_empty() => IDLE_LABEL.to_string(),
            _ => format!("Capture ({}/{BATCH_SIZE})", self.frames.len()),
        }
    }

    pub fn add_capture(&mut self, frame: Frame) -> Result<CaptureProgress, CaptureError> {
        match self.state {
            CaptureState::Submitting => return Err(CaptureError::Submitting),
            CaptureState::Completed => return Err(CaptureError::Completed),
            CaptureState::Collecting => {}
        }
        if frame.is_degenerate() {
            return Err(CaptureError::EmptyFrame);
        }

        self.frames.push(frame);
        let count = self.frames.len();
        tracing::debug!(count, of = BATCH_SIZE, "capture stored");

        if count < BATCH_SIZE {
            return Ok(CaptureProgress::Collected { count });
        }

        self.state = CaptureState::Submitting;
        self.submissions += 1;
        let frames = std::mem::replace(&mut self.frames, Vec::with_capacity(BATCH_SIZE));
        Ok(CaptureProgress::BatchReady(CaptureBatch { frames }))
    }

    /// Resolve the in-flight submission. Accepted completes the session;
    /// anything else starts over from zero.
    pub fn finish_submission(&mut self, accepted: bool) -> Result<CaptureState, CaptureError> {
        if self.state != CaptureState::Submitting {
            return Err(CaptureError::NotSubmitting);
        }
        self.frames.clear();
        self.state = if accepted {
            CaptureState::Completed
        } else {
            CaptureState::Collecting
        };
        Ok(self.state)
    }
}
